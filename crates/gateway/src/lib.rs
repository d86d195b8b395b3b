//! HTTP API gateway for the DSA tutor.
//!
//! Exposes the chat pipeline over REST for a browser front end:
//!
//! - `GET  /` and `GET /health`: static status payload
//! - `POST /api/ask`: stateless, history supplied by the client
//! - `POST /api/chat`: server-held session history
//! - `GET  /api/sessions/{id}`: stored turns of a session
//! - `DELETE /api/sessions/{id}`: reset a session
//!
//! Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use dsatutor_agent::ChatPipeline;
use dsatutor_config::AppConfig;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<ChatPipeline>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS (any origin unless `gateway.allowed_origins` is set)
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .merge(api::api_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Fails before binding if no API key is configured.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.require_api_key()?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let pipeline = Arc::new(ChatPipeline::from_config(&config)?);
    let state = Arc::new(GatewayState { pipeline });
    let app = build_router(state, &config.gateway.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "DSA Instructor API is running!",
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let (state, _provider) = test_state(&["unused"]);
        let app = build_router(state, &[]);

        for uri in ["/", "/health"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["message"], "DSA Instructor API is running!");
            assert_eq!(json["status"], "ok");
        }
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let (state, _provider) = test_state(&["unused"]);
        let app = build_router(state, &["http://localhost:3000".to_string()]);

        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn start_without_api_key_fails_fast() {
        let config = AppConfig::default();
        let err = start(config).await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("api key"));
    }
}
