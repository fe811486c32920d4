//! HTTP gateway for textpilot.
//!
//! - `GET /` health check
//! - `POST /message` signed SMS webhook, answered with TwiML
//! - `GET /agent?query=` unauthenticated local test endpoint
//!
//! Built on Axum. Every request gets its own agent run; nothing is shared
//! between requests except the read-only [`GatewayState`].

pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use textpilot_agent::AgentFactory;
use textpilot_agent::prompts::direct_query;
use textpilot_channels::RequestValidator;
use textpilot_config::AppConfig;

/// Largest accepted request body.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub factory: Arc<AgentFactory>,
    /// `None` when no auth token is configured; signed requests are then refused.
    pub validator: Option<RequestValidator>,
    /// Externally visible base URL the provider signs against.
    pub public_url: Option<String>,
    pub skip_signature_validation: bool,
}

impl GatewayState {
    pub fn new(factory: Arc<AgentFactory>, auth_token: Option<String>) -> Self {
        Self {
            factory,
            validator: auth_token.filter(|t| !t.is_empty()).map(RequestValidator::new),
            public_url: None,
            skip_signature_validation: false,
        }
    }

    pub fn from_config(config: &AppConfig, factory: Arc<AgentFactory>) -> Self {
        Self {
            public_url: config.gateway.public_url.clone().filter(|u| !u.trim().is_empty()),
            skip_signature_validation: config.gateway.skip_signature_validation,
            ..Self::new(factory, config.sms.auth_token.clone())
        }
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn with_skip_signature_validation(mut self, skip: bool) -> Self {
        self.skip_signature_validation = skip;
        self
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/message", post(webhook::message_handler))
        .route("/agent", get(agent_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until the process is stopped.
pub async fn start(config: &AppConfig, factory: Arc<AgentFactory>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = GatewayState::from_config(config, factory);

    if state.skip_signature_validation {
        warn!("Webhook signature validation is DISABLED; do not run this way in production");
    } else if state.validator.is_none() {
        warn!("TWILIO_AUTH_TOKEN is not set; every webhook request will be refused");
    }

    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct AgentQuery {
    #[serde(default)]
    query: Option<String>,
}

/// Run the agent on a query and return its reply as plain text.
async fn agent_handler(State(state): State<SharedState>, Query(params): Query<AgentQuery>) -> Response {
    let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing 'query' parameter").into_response();
    };
    info!(query_len = query.len(), "Direct agent query");

    let prompt = state.factory.system_prompt_or_default().await;
    let outcome = state.factory.agent().run(&prompt, &direct_query(&query)).await;
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        outcome.text,
    )
        .into_response()
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(provider: Arc<FixedProvider>) -> Router {
        build_router(Arc::new(GatewayState::new(factory(provider), Some("token".into()))))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let provider = FixedProvider::new("unused");
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app(provider.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn agent_endpoint_returns_plain_text() {
        let provider = FixedProvider::new("It is 2:30 PM EST.");
        let req = Request::builder()
            .uri("/agent?query=what%20time%20is%20it")
            .body(Body::empty())
            .unwrap();

        let response = app(provider.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"It is 2:30 PM EST.");
        assert!(provider.last_user_message.lock().unwrap().as_deref().unwrap().contains("what time is it"));
    }

    #[tokio::test]
    async fn agent_endpoint_requires_query() {
        let provider = FixedProvider::new("unused");
        let req = Request::builder().uri("/agent").body(Body::empty()).unwrap();
        let response = app(provider.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn blank_token_means_no_validator() {
        let state = GatewayState::new(factory(FixedProvider::new("x")), Some(String::new()));
        assert!(state.validator.is_none());
    }
}
