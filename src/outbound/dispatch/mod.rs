// Delivery of decrypted payloads to local consumers
//
//   port – HTTP POST to localhost:<port>
//   exec – spawn an executable with the payload in its environment
//
// Both strategies run once per delivery under the same deadline and never retry.

pub mod exec;
pub mod port;

use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use reqwest::Client;
use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::info;

use crate::domain::funnel::ForwardTarget;

/// Deadline applied to every dispatch
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to build dispatch HTTP client: {0}")]
    Client(String),
}

/// Response the relay returns to the original sender after a dispatch.
///
/// The body is kept as raw bytes so consumer responses are relayed unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: StatusCode,
    pub body: Bytes,
}

impl DispatchOutcome {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Bytes::new())
    }

    /// The consumer accepted the payload
    pub fn delivered() -> Self {
        Self::empty(StatusCode::NO_CONTENT)
    }
}

/// Executes dispatch strategies against local consumers
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the default deadline (10 seconds)
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_timeout(DEFAULT_DISPATCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DispatchError> {
        // Redirects are answered as a bad consumer response, never followed
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(format!("WebhookFunnel/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deliver one payload to `target` and reduce the result to a response
    pub async fn dispatch(
        &self,
        endpoint_id: &str,
        target: &ForwardTarget,
        payload: Vec<u8>,
    ) -> DispatchOutcome {
        let outcome = match target {
            ForwardTarget::Port(port) => {
                port::forward(&self.client, *port, payload, self.timeout).await
            }
            ForwardTarget::Exec(path) => exec::run(path, &payload, self.timeout).await,
        };

        info!(
            endpoint_id = %endpoint_id,
            forward = %target,
            status = outcome.status.as_u16(),
            "Dispatch finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_default_timeout() -> Result<(), DispatchError> {
        let dispatcher = Dispatcher::new()?;
        assert_eq!(dispatcher.timeout(), Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn test_dispatcher_custom_timeout() -> Result<(), DispatchError> {
        let dispatcher = Dispatcher::with_timeout(Duration::from_millis(250))?;
        assert_eq!(dispatcher.timeout(), Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn test_outcome_constructors() {
        assert_eq!(
            DispatchOutcome::delivered(),
            DispatchOutcome::new(StatusCode::NO_CONTENT, "")
        );
        assert!(DispatchOutcome::empty(StatusCode::BAD_GATEWAY).body.is_empty());
    }
}
