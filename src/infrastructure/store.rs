use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::funnel::FunnelList;
use crate::domain::ports::{FunnelStore, StoreError};

/// Funnel store persisted as a single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FunnelStore for JsonFileStore {
    async fn load(&self) -> Result<FunnelList, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Funnel store not found, starting empty");
                return Ok(FunnelList::default());
            }
            Err(e) => return Err(e.into()),
        };

        let list: FunnelList = serde_json::from_slice(&raw)?;
        debug!(
            path = %self.path.display(),
            funnels = list.funnels.len(),
            "Loaded funnel store"
        );
        Ok(list)
    }

    async fn save(&self, funnels: &FunnelList) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(funnels)?;

        // Write next to the target then rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "Saved funnel store");
        Ok(())
    }
}
