use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use std::net::SocketAddr;

use crate::services::{build_message, client_ip, dispatch_all, format_body, UNKNOWN_COUNTRY};
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub ok: bool,
}

/// `POST /send`: relay an arbitrary JSON payload to every configured chat.
///
/// The body is never rejected. Anything that does not parse as JSON is
/// relayed as an empty payload.
#[tracing::instrument(skip_all)]
pub async fn send_message(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SendResponse>, AppError> {
    let remote = connect_info.map(|ConnectInfo(addr)| addr);

    let (ip, country) = match client_ip(&headers, remote) {
        Some(ip) => {
            let country = state.geolocator.country_for(&ip).await;
            (ip, country)
        }
        None => {
            tracing::warn!("Could not determine client IP");
            (UNKNOWN_COUNTRY.to_string(), UNKNOWN_COUNTRY.to_string())
        }
    };

    let payload = parse_payload(&body);
    let message = build_message(&format_body(payload.as_ref()), &country, &ip);

    tracing::info!(
        ip = %ip,
        country = %country,
        destinations = state.config.destinations.len(),
        "Relaying message"
    );

    dispatch_all(
        state.chat_provider.as_ref(),
        &state.config.destinations,
        &message,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Message relay failed");
        AppError::DeliveryFailed(anyhow::Error::new(e))
    })?;

    Ok(Json(SendResponse { ok: true }))
}

fn parse_payload(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }

    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed request body");
            None
        }
    }
}
