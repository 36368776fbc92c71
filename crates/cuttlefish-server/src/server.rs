use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, extract::FromRef, routing::get};
use cuttlefish_storage::{DynProfileStore, DynUserStore};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::admin::{AdminState, admin_routes};
use crate::cache::{CacheBackend, ProfileCache};
use crate::config::{AppConfig, StorageBackend};
use crate::drive::DriveFileUrls;
use crate::handlers;
use crate::operations::ImageUrlReconciler;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profile_cache: ProfileCache,
    pub admin: AdminState,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}

impl AppState {
    /// Wires the stores, URL resolver and profile cache together.
    pub fn new(cfg: AppConfig, users: DynUserStore, profiles: DynProfileStore) -> Self {
        let profile_cache = ProfileCache::new(CacheBackend::new(), cfg.profile_ttl());
        let urls = Arc::new(DriveFileUrls::new(&cfg.base_url(), &cfg.media));
        let url_cache = ImageUrlReconciler::new(
            users.clone(),
            profiles,
            urls,
            profile_cache.clone(),
            cfg.maintenance.batch_size,
        );

        Self {
            config: Arc::new(cfg),
            profile_cache,
            admin: AdminState::new(users, url_cache),
        }
    }
}

/// Opens the storage backend selected by `storage.backend`.
pub async fn open_stores(cfg: &AppConfig) -> anyhow::Result<(DynUserStore, DynProfileStore)> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let (_, users, profiles) = cuttlefish_db_memory::create_stores();
            Ok((users, profiles))
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres config is required")?;
            let storage = cuttlefish_db_postgres::create_storage(pg.to_postgres_config())
                .await
                .context("failed to initialize PostgreSQL storage")?;
            tracing::info!("PostgreSQL storage initialized");
            let users: DynUserStore = storage.clone();
            let profiles: DynProfileStore = storage;
            Ok((users, profiles))
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api/admin", admin_routes::<AppState>())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct CuttlefishServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    stores: Option<(DynUserStore, DynProfileStore)>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            stores: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses the given stores instead of opening the configured backend.
    pub fn with_stores(mut self, users: DynUserStore, profiles: DynProfileStore) -> Self {
        self.stores = Some((users, profiles));
        self
    }

    pub async fn build(self) -> anyhow::Result<CuttlefishServer> {
        let (users, profiles) = match self.stores {
            Some(stores) => stores,
            None => open_stores(&self.config).await?,
        };
        let app = build_app(AppState::new(self.config, users, profiles));

        Ok(CuttlefishServer {
            addr: self.addr,
            app,
        })
    }
}

impl CuttlefishServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
