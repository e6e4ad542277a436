use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::DispatchOutcome;

/// Largest downstream body relayed back to the sender
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// POST the payload to `http://localhost:<port>` and map the consumer's status.
pub async fn forward(
    client: &Client,
    port: u16,
    payload: Vec<u8>,
    timeout: Duration,
) -> DispatchOutcome {
    let url = format!("http://localhost:{port}");
    debug!(url = %url, size = payload.len(), "Forwarding payload");

    let response = match client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout)
        .body(payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            warn!(url = %url, error = %e, "Forward timed out");
            return DispatchOutcome::new(StatusCode::GATEWAY_TIMEOUT, e.to_string());
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Forward failed");
            return DispatchOutcome::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    map_response(response).await
}

async fn map_response(response: Response) -> DispatchOutcome {
    let status = response.status();

    match status.as_u16() {
        200..=299 => DispatchOutcome::delivered(),
        300..=399 => DispatchOutcome::empty(StatusCode::BAD_GATEWAY),
        400..=499 => DispatchOutcome::new(StatusCode::BAD_REQUEST, read_body(response).await),
        500..=599 => DispatchOutcome::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            read_body(response).await,
        ),
        _ => DispatchOutcome::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled downstream status {status}"),
        ),
    }
}

/// Read the downstream body as-is, falling back to a generic message
async fn read_body(response: Response) -> Bytes {
    let status = response.status();

    match response.bytes().await {
        Ok(mut bytes) => {
            if bytes.len() > MAX_BODY_SIZE {
                warn!(
                    size = bytes.len(),
                    max_size = MAX_BODY_SIZE,
                    "Downstream body too large, truncating"
                );
                bytes.truncate(MAX_BODY_SIZE);
            }
            bytes
        }
        Err(e) => {
            warn!(status = %status, error = %e, "Could not read downstream body");
            Bytes::from(format!("Downstream responded with {status}"))
        }
    }
}
