/*
   Seams between the relay core and its collaborators: the funnel store, the
   remote webhook source, and the crypto used on inbound deliveries.
*/

use crate::domain::funnel::{FunnelDefinition, FunnelList};
use crate::inbound::cipher::CipherError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Error type for funnel store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access funnel store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed funnel store document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error type for provisioning calls against the webhook source
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Provisioning request failed: {0}")]
    RequestFailed(String),

    #[error("Provisioning request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected provisioning response: status={status}, body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

/// Load-once/save contract of the funnel registry store
#[async_trait]
pub trait FunnelStore: Send + Sync {
    async fn load(&self) -> Result<FunnelList, StoreError>;
    async fn save(&self, funnels: &FunnelList) -> Result<(), StoreError>;
}

/// Registers a funnel's public URL and secret with the remote webhook source
#[async_trait]
pub trait WebhookProvisioning: Send + Sync {
    async fn update_webhook(
        &self,
        funnel: &FunnelDefinition,
        webhook_url: &str,
    ) -> Result<(), ProvisioningError>;
}

/// Authenticates and decrypts inbound deliveries.
///
/// Injected into the relay state so the server can be exercised with a
/// counting or failing implementation.
pub trait PayloadOpener: Send + Sync {
    fn verify(&self, secret: &str, nonce: &str, body: &[u8], signature: &str) -> bool;
    fn open(&self, secret: &str, nonce: &str, body: &[u8]) -> Result<Vec<u8>, CipherError>;
}
