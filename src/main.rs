//! OTScope Server
//!
//! Turns an uploaded network capture into an inventory of OT devices.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         OTSCOPE                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────────────────┐ │
//! │  │  Upload   │  │  Extraction  │  │  Aggregation         │ │
//! │  │  (Axum)   │─►│  Coordinator │─►│  (assets + summary)  │ │
//! │  └───────────┘  └──────┬───────┘  └──────────────────────┘ │
//! │                        ▼                                    │
//! │          ┌──────────┬──────────┬──────────┐                 │
//! │          │  Modbus  │   DNP3   │  IEC104  │  extractors     │
//! │          └──────────┴──────────┴──────────┘                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod extractors;
mod handlers;
mod models;
mod pipeline;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

pub use error::{AppError, AppResult};

use extractors::ExtractorRegistry;
use pipeline::ExtractionOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(config.is_production());

    config.validate().context("Invalid configuration")?;

    tracing::info!("OTScope Server starting...");

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    tracing::info!("Upload dir: {}", config.upload_dir.display());

    let registry = ExtractorRegistry::from_config(&config);
    if registry.is_empty() {
        tracing::warn!("No extractors registered; every upload will yield an empty inventory");
    } else {
        tracing::info!("Extractors: {:?}", registry);
    }

    // Build application state
    let state = AppState::new(config.clone(), registry);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "otscope=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub registry: Arc<ExtractorRegistry>,
    pub extraction: ExtractionOptions,
}

impl AppState {
    pub fn new(config: config::Config, registry: ExtractorRegistry) -> Self {
        let extraction = ExtractionOptions {
            timeout: config.extractor_timeout(),
            concurrency: config.concurrency_limit(),
        };

        Self {
            config,
            registry: Arc::new(registry),
            extraction,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/upload", post(handlers::upload::upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
