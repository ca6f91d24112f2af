//! HTTP boundary: router, CORS, quotas and the listener loop.

pub mod rate_limit;
pub mod routes;

use crate::config::ServerConfig;
use crate::error::SyllabusError;
use crate::service::AnalysisService;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use rate_limit::ClientRateLimiter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// How often clients with a refilled quota are forgotten.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the application router.
///
/// Only `/extract-text` is rate limited; `/health` is always answered.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let limiter = Arc::new(ClientRateLimiter::from_config(config));
    router_with_limiter(state, config, limiter)
}

fn router_with_limiter(
    state: AppState,
    config: &ServerConfig,
    limiter: Arc<ClientRateLimiter>,
) -> Router {
    let analysis = Router::new()
        .route("/extract-text", post(routes::extract_text))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::enforce));

    Router::new()
        .merge(analysis)
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match (config.production, config.allowed_origin.as_deref()) {
        (true, Some(origin)) => match HeaderValue::from_str(origin) {
            Ok(value) => cors.allow_origin(AllowOrigin::exact(value)),
            Err(e) => {
                warn!("Ignoring invalid allowed origin {:?}: {}", origin, e);
                cors
            }
        },
        _ => cors.allow_origin(Any),
    }
}

/// Bind `config.bind` and serve until Ctrl+C or SIGTERM.
pub async fn serve(service: AnalysisService, config: &ServerConfig) -> Result<(), SyllabusError> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| SyllabusError::Server { source })?;

    let limiter = Arc::new(ClientRateLimiter::from_config(config));
    let pruner = rate_limit::spawn_pruner(limiter.clone(), PRUNE_INTERVAL);
    let app = router_with_limiter(AppState::new(service), config, limiter);
    info!(
        "Listening on {} (production={}, limits {}/hour {}/day)",
        config.bind, config.production, config.hourly_limit, config.daily_limit
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|source| SyllabusError::Server { source });
    pruner.abort();
    served?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
