use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::inbound::CipherError;
use crate::server::RelayState;
use crate::server::responses::RelayResponse;

/// Protocol token every sender must present
pub const RELAY_PROTOCOL: &str = "funnel-v1";

pub const PROTOCOL_HEADER: &str = "x-webhook-protocol";
pub const NONCE_HEADER: &str = "x-webhook-nonce";
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Deserialize)]
pub struct FunnelQuery {
    pub id: Option<String>,
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// `POST /funnel?id=<endpoint_id>`
///
/// Resolves the funnel, checks the protocol headers, verifies the signature
/// over the raw body, decrypts it and dispatches the plaintext. Every failed
/// check ends the request with its own status.
#[tracing::instrument(name = "POST /funnel", skip_all, fields(endpoint_id))]
pub async fn relay(
    State(state): State<RelayState>,
    query: Result<Query<FunnelQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> RelayResponse {
    // 1. Resolve funnel
    let endpoint_id = query.ok().and_then(|Query(q)| q.id).unwrap_or_default();
    let Some(funnel) = state.registry().get(&endpoint_id) else {
        info!(endpoint_id = %endpoint_id, "Rejected delivery for unknown funnel");
        return RelayResponse::gone();
    };
    tracing::Span::current().record("endpoint_id", endpoint_id.as_str());

    // 2-4. Protocol headers
    if header_value(&headers, PROTOCOL_HEADER) != Some(RELAY_PROTOCOL) {
        warn!(endpoint_id = %endpoint_id, "Rejected delivery with wrong protocol");
        return RelayResponse::forbidden("Unsupported webhook protocol");
    }
    let Some(nonce) = header_value(&headers, NONCE_HEADER) else {
        warn!(endpoint_id = %endpoint_id, "Rejected delivery without nonce");
        return RelayResponse::forbidden("Missing nonce");
    };
    let Some(signature) = header_value(&headers, SIGNATURE_HEADER) else {
        warn!(endpoint_id = %endpoint_id, "Rejected delivery without signature");
        return RelayResponse::forbidden("Missing signature");
    };

    // 5. Body
    let body = match body {
        Ok(body) if !body.is_empty() => body,
        Ok(_) => {
            warn!(endpoint_id = %endpoint_id, "Rejected delivery with empty body");
            return RelayResponse::bad_request("Missing body");
        }
        Err(e) => {
            warn!(endpoint_id = %endpoint_id, error = %e, "Could not read delivery body");
            return RelayResponse::bad_request("Unreadable body");
        }
    };

    // 6. Signature over the still-encrypted body
    if !state
        .opener()
        .verify(&funnel.webhook_secret, nonce, &body, signature)
    {
        warn!(endpoint_id = %endpoint_id, "Rejected delivery with invalid signature");
        return RelayResponse::forbidden("Invalid signature");
    }

    // 7. Decrypt
    let plaintext = match state.opener().open(&funnel.webhook_secret, nonce, &body) {
        Ok(plaintext) => plaintext,
        Err(e @ (CipherError::Decode(_) | CipherError::ShortBuffer(_))) => {
            error!(endpoint_id = %endpoint_id, error = %e, "Signed delivery is malformed");
            return RelayResponse::internal(e.to_string());
        }
        Err(CipherError::Authentication) => {
            error!(endpoint_id = %endpoint_id, "Signed delivery could not be opened");
            return RelayResponse::internal("Could not open payload");
        }
    };
    debug!(endpoint_id = %endpoint_id, size = plaintext.len(), "Delivery decrypted");

    // 8. Dispatch target
    let Some(target) = state.dispatch_table().get(&endpoint_id).cloned() else {
        error!(endpoint_id = %endpoint_id, "No dispatch target for known funnel");
        return RelayResponse::misconfigured();
    };

    // 9. Dispatch on its own task so a disconnecting sender does not cancel it
    let dispatcher = state.dispatcher().clone();
    let task_endpoint = endpoint_id.clone();
    let dispatch = tokio::spawn(async move {
        dispatcher
            .dispatch(&task_endpoint, &target, plaintext)
            .await
    });

    match dispatch.await {
        Ok(outcome) => RelayResponse::from(outcome),
        Err(e) => {
            error!(endpoint_id = %endpoint_id, error = %e, "Dispatch task failed");
            RelayResponse::internal("Dispatch failed")
        }
    }
}
