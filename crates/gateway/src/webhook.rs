//! The signed inbound-SMS webhook.
//!
//! Flow: check the signature header is present, decode the form body,
//! verify the signature over the callback URL and the form parameters,
//! run the agent once, and answer with TwiML. Anything that goes wrong
//! after authentication still produces a `200` reply.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use textpilot_agent::InboundText;
use textpilot_channels::{SIGNATURE_HEADER, twiml};
use textpilot_core::error::SignatureError;
use tracing::{error, info, warn};

use crate::SharedState;

pub async fn message_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !state.skip_signature_validation && signature.is_none() {
        warn!("Rejected webhook without a signature header");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let params: Vec<(String, String)> = match serde_urlencoded::from_bytes(&body) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "Rejected malformed webhook form body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if state.skip_signature_validation {
        warn!("Webhook signature validation is DISABLED; processing unverified request");
    } else {
        let url = callback_url(state.public_url.as_deref(), &headers, &uri);
        let verdict = match &state.validator {
            Some(validator) => validator.validate(&url, &params, signature.as_deref().unwrap_or_default()),
            None => Err(SignatureError::NoSecret),
        };
        match verdict {
            Ok(()) => {}
            Err(SignatureError::NoSecret) => {
                error!("TWILIO_AUTH_TOKEN is not configured; cannot verify webhook");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Rejected webhook with invalid signature");
                return StatusCode::UNAUTHORIZED.into_response();
            }
        }
    }

    let inbound = inbound_text(&params);
    info!(
        from = %inbound.from,
        to = %inbound.to,
        sid = %inbound.message_sid,
        body_len = inbound.body.len(),
        "Inbound text"
    );
    if inbound.body.trim().is_empty() {
        warn!(from = %inbound.from, "Inbound text has an empty body");
    }

    let prompt = state.factory.system_prompt_or_default().await;
    let outcome = state.factory.agent().run(&prompt, &inbound.to_prompt()).await;
    if !outcome.is_done() {
        warn!(from = %inbound.from, failure = ?outcome.failure, "Agent run failed, replying with fallback");
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        twiml::message_response(&outcome.text),
    )
        .into_response()
}

/// Pull the fields the agent cares about out of the form. Missing fields are empty.
pub fn inbound_text(params: &[(String, String)]) -> InboundText {
    let field = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    InboundText {
        from: field("From"),
        to: field("To"),
        message_sid: field("MessageSid"),
        body: field("Body"),
    }
}

/// The URL the provider signed: the configured public base when set,
/// otherwise rebuilt from the `Host` and `X-Forwarded-Proto` headers.
pub fn callback_url(public_url: Option<&str>, headers: &HeaderMap, uri: &Uri) -> String {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    if let Some(base) = public_url {
        return format!("{}{path}", base.trim_end_matches('/'));
    }
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let proto = header_str("x-forwarded-proto")
        .and_then(|p| p.split(',').next())
        .map(str::trim)
        .unwrap_or("http");
    let host = header_str(header::HOST.as_str()).unwrap_or("localhost");
    format!("{proto}://{host}{path}")
}
