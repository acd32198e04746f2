//! Webhook intake scaffold. Payloads must carry an HMAC-SHA256 signature
//! over the raw body in `x-signature`, as `sha256=<base64>`.

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use base64::prelude::{Engine, BASE64_STANDARD};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const EVENT_TYPE_HEADER: &str = "x-event-type";

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(receive))
}

/// Signature for `body`, in the exact form expected in the header. Used by
/// senders and by tests.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Constant-time verification via `Mac::verify_slice`.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(encoded) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(signature) = BASE64_STANDARD.decode(encoded) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    message: &'static str,
    event: String,
}

#[instrument(skip(state, headers, body))]
async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(&state.config.webhook_secret, body.as_bytes(), signature) {
        warn!("webhook with missing or invalid signature");
        return Err(ApiError::Authentication("Invalid signature".into()));
    }

    let payload: serde_json::Value = serde_json::from_str(&body)
        .map_err(|_| ApiError::Validation("Invalid JSON payload".into()))?;

    let event = headers
        .get(EVENT_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    info!(%event, size = body.len(), keys = payload.as_object().map(|o| o.len()).unwrap_or(0), "webhook accepted");
    Ok(Json(WebhookAck {
        message: "Webhook processed",
        event,
    }))
}
