use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::funnel::FunnelDefinition;
use crate::domain::ports::{ProvisioningError, WebhookProvisioning};

/// Body of the webhook update call
#[derive(Debug, Serialize)]
struct WebhookUpdate<'a> {
    webhook_url: &'a str,
    webhook_secret: &'a str,
    webhooks_enabled: bool,
}

/// REST client for the remote webhook source API
pub struct ProvisioningClient {
    client: Client,
    api_url: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for ProvisioningClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningClient")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProvisioningClient {
    /// Create a client with the default timeout (30 seconds)
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ProvisioningError> {
        Self::with_timeout(api_url, token, Duration::from_secs(30))
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProvisioningError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("WebhookFunnel/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProvisioningError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout,
        })
    }

    /// Endpoint that holds a target's webhook settings
    pub fn webhook_endpoint(&self, funnel: &FunnelDefinition) -> String {
        format!(
            "{}/{}s/{}/webhook",
            self.api_url, funnel.target_type, funnel.target_id
        )
    }

    fn map_error(&self, err: reqwest::Error) -> ProvisioningError {
        if err.is_timeout() {
            ProvisioningError::Timeout(self.timeout)
        } else {
            ProvisioningError::RequestFailed(err.to_string())
        }
    }
}

#[async_trait]
impl WebhookProvisioning for ProvisioningClient {
    async fn update_webhook(
        &self,
        funnel: &FunnelDefinition,
        webhook_url: &str,
    ) -> Result<(), ProvisioningError> {
        let endpoint = self.webhook_endpoint(funnel);
        debug!(endpoint = %endpoint, webhook_url = %webhook_url, "Updating remote webhook");

        let response = self
            .client
            .patch(&endpoint)
            .bearer_auth(&self.token)
            .json(&WebhookUpdate {
                webhook_url,
                webhook_secret: &funnel.webhook_secret,
                webhooks_enabled: true,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "Provisioning request failed");
                self.map_error(e)
            })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProvisioningError::UnexpectedStatus { status, body })
    }
}
