use std::sync::Arc;

use tracing::{error, info};

use crate::domain::funnel::FunnelList;
use crate::domain::ports::{ProvisioningError, WebhookProvisioning};

/// Result of provisioning a single funnel
#[derive(Debug)]
pub struct ProvisionReport {
    pub endpoint_id: String,
    pub result: Result<(), ProvisioningError>,
}

/// Registers every funnel with the remote webhook source before serving.
///
/// Runs sequentially. A failure only affects the funnel it belongs to and is
/// never retried.
pub struct Provisioner {
    client: Arc<dyn WebhookProvisioning>,
}

impl Provisioner {
    pub fn new(client: Arc<dyn WebhookProvisioning>) -> Self {
        Self { client }
    }

    pub async fn provision_all(&self, list: &FunnelList) -> Vec<ProvisionReport> {
        let mut reports = Vec::with_capacity(list.funnels.len());

        for funnel in &list.funnels {
            let webhook_url = list.webhook_url(&funnel.endpoint_id);
            let result = self.client.update_webhook(funnel, &webhook_url).await;

            match &result {
                Ok(()) => info!(
                    endpoint_id = %funnel.endpoint_id,
                    target_type = %funnel.target_type,
                    target_id = %funnel.target_id,
                    webhook_url = %webhook_url,
                    "Funnel provisioned"
                ),
                Err(e) => error!(
                    endpoint_id = %funnel.endpoint_id,
                    target_type = %funnel.target_type,
                    target_id = %funnel.target_id,
                    error = %e,
                    "Funnel provisioning failed, remote source will not deliver to it"
                ),
            }

            reports.push(ProvisionReport {
                endpoint_id: funnel.endpoint_id.clone(),
                result,
            });
        }

        reports
    }
}
