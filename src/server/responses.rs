use axum::body::Bytes;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::outbound::dispatch::DispatchOutcome;

/// Terminal response of the relay state machine: a status and a raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RelayResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn gone() -> Self {
        Self::new(StatusCode::GONE, "Unknown funnel")
    }

    pub fn forbidden(reason: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, reason)
    }

    pub fn bad_request(reason: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason)
    }

    pub fn internal(reason: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, reason)
    }

    pub fn misconfigured() -> Self {
        Self::new(
            StatusCode::INSUFFICIENT_STORAGE,
            "No dispatch target configured for this funnel",
        )
    }
}

impl From<DispatchOutcome> for RelayResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        Self::new(outcome.status, outcome.body)
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        if self.body.is_empty() {
            self.status.into_response()
        } else {
            (
                self.status,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                self.body,
            )
                .into_response()
        }
    }
}
