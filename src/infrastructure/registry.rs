use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::funnel::{ForwardTarget, FunnelDefinition, FunnelList};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Endpoint id {0} is configured more than once")]
    DuplicateEndpoint(String),
}

/// Read-only index of funnels keyed by endpoint id.
///
/// Built once at startup and shared by every request worker without locking.
#[derive(Debug, Clone, Default)]
pub struct FunnelRegistry {
    funnels: HashMap<String, FunnelDefinition>,
}

impl FunnelRegistry {
    pub fn from_list(list: &FunnelList) -> Result<Self, RegistryError> {
        Self::from_funnels(list.funnels.iter().cloned())
    }

    pub fn from_funnels(
        funnels: impl IntoIterator<Item = FunnelDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for funnel in funnels {
            if index.contains_key(&funnel.endpoint_id) {
                return Err(RegistryError::DuplicateEndpoint(funnel.endpoint_id));
            }
            index.insert(funnel.endpoint_id.clone(), funnel);
        }

        Ok(Self { funnels: index })
    }

    pub fn get(&self, endpoint_id: &str) -> Option<&FunnelDefinition> {
        self.funnels.get(endpoint_id)
    }

    pub fn len(&self) -> usize {
        self.funnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funnels.is_empty()
    }

    /// Parse every funnel's forward string into a dispatch target.
    ///
    /// Funnels with an unparseable forward are logged and left out; requests
    /// for them are answered as a dispatch misconfiguration.
    pub fn dispatch_table(&self) -> DispatchTable {
        let mut targets = HashMap::with_capacity(self.funnels.len());
        for funnel in self.funnels.values() {
            match funnel.forward.parse::<ForwardTarget>() {
                Ok(target) => {
                    info!(
                        endpoint_id = %funnel.endpoint_id,
                        target_type = %funnel.target_type,
                        target_id = %funnel.target_id,
                        forward = %target,
                        "Funnel ready"
                    );
                    targets.insert(funnel.endpoint_id.clone(), target);
                }
                Err(e) => {
                    warn!(
                        endpoint_id = %funnel.endpoint_id,
                        error = %e,
                        "Funnel has an invalid forward, deliveries will be refused"
                    );
                }
            }
        }

        DispatchTable { targets }
    }
}

/// Immutable mapping from endpoint id to its precomputed dispatch target
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    targets: HashMap<String, ForwardTarget>,
}

impl DispatchTable {
    pub fn get(&self, endpoint_id: &str) -> Option<&ForwardTarget> {
        self.targets.get(endpoint_id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
