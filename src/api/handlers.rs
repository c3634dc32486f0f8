use crate::api::signature::{verify_signature, SIGNATURE_HEADER};
use crate::api::AppState;
use crate::models::WebhookPayload;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// Webhook 入口: 校验签名 → 解码 → 逐个事件处理, 处理完毕才返回 200
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_signature(&body, signature, &state.channel_secret) {
        tracing::warn!("Invalid signature, rejecting webhook");
        return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to decode webhook payload: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad request").into_response();
        }
    };

    tracing::info!(
        "Received {} event(s) for {}",
        payload.events.len(),
        payload.destination.as_deref().unwrap_or("-")
    );
    for event in &payload.events {
        if let Err(e) = state.bot.handle_event(event).await {
            tracing::error!("Failed to handle event: {}", e);
        }
    }

    (StatusCode::OK, "OK").into_response()
}
