use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use log::{error, info};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::server::handlers;
use crate::storage::Root;

/// State shared by every request handler
#[derive(Debug)]
pub struct AppState {
    pub root: Root,
    pub config: ServerConfig,
}

impl AppState {
    /// Opens the configured root and staging directories, creating them if needed.
    pub fn new(config: ServerConfig) -> io::Result<Self> {
        let root = Root::open(config.server_root_path())?;
        std::fs::create_dir_all(config.staging_path())?;
        Ok(Self { root, config })
    }
}

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> io::Result<Self> {
        let state = AppState::new(config).map_err(|e| {
            error!("Failed to open server root: {}", e);
            e
        })?;
        info!("Server root directory: {}", state.root.path().display());

        let addr = state
            .config
            .socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub async fn start(self) -> io::Result<()> {
        info!(
            "Starting RAX file manager (max upload {} MB, CORS {})",
            self.state.config.max_file_size_mb,
            if self.state.config.allow_any_origin { "open" } else { "off" }
        );
        axum::serve(self.listener, router(self.state)).await
    }
}

/// Builds the HTTP routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let allow_any_origin = state.config.allow_any_origin;
    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/files", get(handlers::list_files))
        .route("/api/folders", post(handlers::create_folder))
        .route("/api/rename", post(handlers::rename))
        .route("/api/delete", post(handlers::delete))
        .route("/api/upload", post(handlers::upload))
        .route("/api/download", get(handlers::download))
        // Per-file size is enforced while spooling.
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    if allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
