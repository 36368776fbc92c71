pub mod admin;
pub mod cache;
pub mod config;
pub mod drive;
pub mod handlers;
pub mod observability;
pub mod operations;
pub mod server;

pub use admin::{AdminAuth, AdminState, admin_routes};
pub use cache::{CacheBackend, CachedEntry, ProfileCache};
pub use config::{
    AppConfig, CacheConfig, MaintenanceConfig, MediaConfig, PostgresStorageConfig, ServerConfig,
    StorageBackend,
};
pub use drive::{DriveFileUrls, PublicUrlResolver, UrlMode};
pub use observability::init_tracing;
pub use operations::{ImageUrlReconciler, ReconcileError};
pub use server::{AppState, CuttlefishServer, ServerBuilder, build_app, open_stores};
