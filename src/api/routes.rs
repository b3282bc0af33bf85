//! HTTP server assembly and shared application state.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agents::{AgentRegistry, SharedRegistry};
use crate::config::Config;
use crate::engine::{LifecycleEngine, SharedEngine};
use crate::subscription::{SharedLedger, SubscriptionLedger};
use crate::tools::{SharedCatalog, SimulatedInvoker, ToolCatalog, ToolInvoker};
use crate::users::{SharedUserStore, UserStore};

use super::auth;
use super::subscriptions as subscriptions_api;
use super::tools as tools_api;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: SharedUserStore,
    pub ledger: SharedLedger,
    pub registry: SharedRegistry,
    pub catalog: SharedCatalog,
    pub engine: SharedEngine,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let users = Arc::new(UserStore::load(&config.data_dir).await);
    let ledger = Arc::new(SubscriptionLedger::load(&config.data_dir).await);
    let registry = Arc::new(AgentRegistry::load(&config.data_dir, Arc::clone(&ledger)).await);
    let catalog = Arc::new(ToolCatalog::load(&config.data_dir).await);

    let invoker: Arc<dyn ToolInvoker> = Arc::new(SimulatedInvoker::default());
    let engine = Arc::new(LifecycleEngine::new(
        Arc::clone(&registry),
        Arc::clone(&catalog),
        invoker,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        users,
        ledger,
        registry,
        catalog,
        engine,
    });

    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .nest("/api/agents", super::agents::routes())
        .nest("/api/subscriptions", subscriptions_api::routes())
        .nest("/api/tools", tools_api::routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// GET /api/health - Liveness probe.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "devMode": state.config.dev_mode,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
