//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::AnalysisPipeline;
use crate::Result;

/// Assemble the router with its middleware stack
pub fn build_app(pipeline: Arc<AnalysisPipeline>, enable_cors: bool, max_concurrent: usize) -> Router {
    let state = AppState { pipeline };

    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(ConcurrencyLimitLayer::new(max_concurrent.max(1)))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("🚀 Starting vulnrag API server...");

    let pipeline = Arc::new(AnalysisPipeline::from_config(config)?);
    let app = build_app(pipeline, enable_cors, config.server.max_concurrent_requests);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health   - Health check");
    info!("  POST /api/analyze  - Two-phase vulnerability analysis");
    info!("  POST /api/search   - Reference retrieval only");

    axum::serve(listener, app).await?;

    Ok(())
}
