//! HTTP server exposing the cached TMDB endpoints

mod error;
mod handlers;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{DetailsRequest, HealthResponse, SearchRequest};

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::cache::{LoadPolicy, Namespace, NamespaceCache, PersistLock, StoreError};
use crate::config::Config;
use crate::upstream::{BaseUrlError, UpstreamClient};

/// Errors that prevent the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load cache: {0}")]
    Cache(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] BaseUrlError),
}

/// Server state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub search: Arc<NamespaceCache>,
    pub details: Arc<NamespaceCache>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(search: NamespaceCache, details: NamespaceCache, upstream: UpstreamClient) -> Self {
        Self {
            search: Arc::new(search),
            details: Arc::new(details),
            upstream,
        }
    }

    /// Loads both namespaces from `cache_dir` and builds the upstream client
    pub async fn open(config: &Config) -> Result<Self, StartupError> {
        let upstream = UpstreamClient::new(&config.base_url, config.bearer_token.clone())?
            .with_language(config.language.clone());
        Self::open_with(&config.cache_dir, config.load_policy, upstream).await
    }

    pub async fn open_with(
        cache_dir: &std::path::Path,
        policy: LoadPolicy,
        upstream: UpstreamClient,
    ) -> Result<Self, StartupError> {
        let lock = PersistLock::new();
        let search = NamespaceCache::open(Namespace::Search, cache_dir, lock.clone(), policy).await?;
        let details = NamespaceCache::open(Namespace::Details, cache_dir, lock, policy).await?;
        Ok(Self::new(search, details, upstream))
    }
}

/// Build and configure the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/tv/search", post(handlers::search))
        .route("/tv/details", post(handlers::details))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `state` on `listener` until Ctrl+C or SIGTERM
pub async fn run(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
