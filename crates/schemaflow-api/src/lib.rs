//! SchemaFlow Event API
//!
//! HTTP front door for user events plus the wiring the `schemaflow` binary
//! uses to run producers and consumers.
//!
//! ## Endpoints
//!
//! - `POST /events/user_action?user_id=123&action=login&page=/home`
//! - `GET /health`

use axum::{
    routing::{get, post},
    Router,
};
use schemaflow_client::ProducerPipeline;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod runtime;

pub use config::{AppConfig, ConfigError, TransportKind};
pub use error::AppError;
pub use models::{ApiResponse, UserEvent};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProducerPipeline<UserEvent>>,
    /// Log the pipeline publishes to
    pub transport: TransportKind,
}

impl AppState {
    pub fn new(pipeline: ProducerPipeline<UserEvent>, transport: TransportKind) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            transport,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/events/user_action",
            post(handlers::events::produce_user_event),
        )
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve `router` until `shutdown` completes, letting in-flight requests finish.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("🚀 Event API listening on {}", addr);
        tracing::info!(
            "   curl -X POST 'http://{}/events/user_action?user_id=123&action=login'",
            addr
        );
        tracing::info!("   Health: http://{}/health", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("👋 Event API shut down gracefully");
    Ok(())
}
