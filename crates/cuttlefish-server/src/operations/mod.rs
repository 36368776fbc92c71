//! Batch maintenance operations.
//!
//! Each operation walks a slice of the stored data and rewrites derived
//! state. Operations run sequentially on the calling task and report
//! failures through their own error type.

pub mod recreate_url_cache;

pub use recreate_url_cache::{ImageUrlReconciler, ReconcileError};
