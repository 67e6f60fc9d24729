//! Application startup and lifecycle management.

use crate::config::AnalysisConfig;
use crate::handlers;
use crate::services::analyzer::openai::{OpenAiAnalyzer, OpenAiConfig};
use crate::services::analyzer::TransactionAnalyzer;
use crate::services::{get_metrics, init_metrics, AnalysisService, UploadService};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AnalysisConfig,
    pub analysis: AnalysisService,
    pub upload: UploadService,
}

/// State for health check endpoints.
#[derive(Clone)]
struct HealthState {
    analyzer: Arc<dyn TransactionAnalyzer>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "analysis-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.analyzer.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed - analyzer unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = get_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the OpenAI-backed analyzer.
    pub async fn build(config: AnalysisConfig) -> Result<Self, AppError> {
        let analyzer: Arc<dyn TransactionAnalyzer> = Arc::new(OpenAiAnalyzer::new(OpenAiConfig {
            api_key: config.openai.api_key.clone(),
            model: config.openai.model.clone(),
            base_url: config.openai.base_url.clone(),
        }));

        tracing::info!(
            model = %config.openai.model,
            "Initialized OpenAI analyzer"
        );

        Self::build_with_analyzer(config, analyzer).await
    }

    /// Build the application with an injected analyzer.
    /// Used in tests to swap in a deterministic mock.
    pub async fn build_with_analyzer(
        config: AnalysisConfig,
        analyzer: Arc<dyn TransactionAnalyzer>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let analysis = AnalysisService::new(analyzer);
        let upload = UploadService::new(analysis.clone());

        let state = AppState {
            config: config.clone(),
            analysis,
            upload,
        };

        // Bind HTTP listener (port 0 = random port for testing)
        let addr = config.common.address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Analysis service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let health_state = HealthState {
            analyzer: self.state.analysis.analyzer().clone(),
        };

        let health_router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_handler))
            .with_state(health_state);

        let api_router = Router::new()
            .route("/api/upload", post(handlers::upload_transactions))
            .route("/api/analyze/merchant", post(handlers::analyze_merchant))
            .route("/api/analyze/patterns", post(handlers::analyze_patterns))
            // The exact 1 MiB file limit is enforced in the upload
            // handler; the body limit just bounds the whole envelope.
            .layer(DefaultBodyLimit::max(
                handlers::MAX_UPLOAD_BYTES + 64 * 1024,
            ))
            .with_state(self.state);

        let app = health_router
            .merge(api_router)
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(CorsLayer::permissive());

        axum::serve(self.listener, app).await
    }
}
