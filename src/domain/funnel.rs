use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of remote entity that owns a funnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Bot,
    Server,
    Team,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Bot => "bot",
            TargetType::Server => "server",
            TargetType::Team => "team",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured route from the public relay endpoint to a local consumer.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunnelDefinition {
    pub target_type: TargetType,

    pub target_id: String,

    pub webhook_secret: String,

    /// Selects this funnel on inbound requests. Immutable once generated.
    pub endpoint_id: String,

    /// `port:<n>` or `exec:<path>`
    pub forward: String,
}

impl FunnelDefinition {
    /// Create a funnel with a freshly generated endpoint id
    pub fn new(
        target_type: TargetType,
        target_id: impl Into<String>,
        webhook_secret: impl Into<String>,
        forward: impl Into<String>,
    ) -> Self {
        Self {
            target_type,
            target_id: target_id.into(),
            webhook_secret: webhook_secret.into(),
            endpoint_id: Uuid::new_v4().simple().to_string(),
            forward: forward.into(),
        }
    }
}

// The secret must never reach a log line.
impl fmt::Debug for FunnelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunnelDefinition")
            .field("target_type", &self.target_type)
            .field("target_id", &self.target_id)
            .field("webhook_secret", &"<redacted>")
            .field("endpoint_id", &self.endpoint_id)
            .field("forward", &self.forward)
            .finish()
    }
}

/// The persisted aggregate read from the funnel store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunnelList {
    pub port: u16,

    /// Public base URL the relay is reachable at. Only used for provisioning.
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub funnels: Vec<FunnelDefinition>,
}

impl Default for FunnelList {
    fn default() -> Self {
        Self {
            port: 8080,
            domain: String::new(),
            funnels: Vec::new(),
        }
    }
}

impl FunnelList {
    /// Append a funnel, rejecting a duplicate endpoint id
    pub fn add(&mut self, funnel: FunnelDefinition) -> Result<(), DuplicateEndpointError> {
        if self.find(&funnel.endpoint_id).is_some() {
            return Err(DuplicateEndpointError(funnel.endpoint_id));
        }
        self.funnels.push(funnel);
        Ok(())
    }

    /// Remove a funnel by endpoint id, returning it if it existed
    pub fn remove(&mut self, endpoint_id: &str) -> Option<FunnelDefinition> {
        let index = self
            .funnels
            .iter()
            .position(|f| f.endpoint_id == endpoint_id)?;
        Some(self.funnels.remove(index))
    }

    pub fn find(&self, endpoint_id: &str) -> Option<&FunnelDefinition> {
        self.funnels.iter().find(|f| f.endpoint_id == endpoint_id)
    }

    /// Public URL the remote source should deliver to for this endpoint
    pub fn webhook_url(&self, endpoint_id: &str) -> String {
        format!(
            "{}/funnel?id={}",
            self.domain.trim_end_matches('/'),
            endpoint_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Duplicate endpoint id: {0}")]
pub struct DuplicateEndpointError(pub String);

/// Dispatch target derived from a funnel's `forward` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardTarget {
    Port(u16),
    Exec(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardParseError {
    #[error("Missing ':' separator in forward {0:?}")]
    MissingSeparator(String),

    #[error("Unknown forward kind {0:?}, expected port or exec")]
    UnknownKind(String),

    #[error("Invalid port {0:?}")]
    InvalidPort(String),

    #[error("Empty executable path")]
    EmptyPath,
}

impl FromStr for ForwardTarget {
    type Err = ForwardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, data) = s
            .split_once(':')
            .ok_or_else(|| ForwardParseError::MissingSeparator(s.to_string()))?;

        match kind {
            "port" => match data.parse::<u16>() {
                Ok(port) if port > 0 => Ok(ForwardTarget::Port(port)),
                _ => Err(ForwardParseError::InvalidPort(data.to_string())),
            },
            "exec" => {
                if data.is_empty() {
                    return Err(ForwardParseError::EmptyPath);
                }
                Ok(ForwardTarget::Exec(data.to_string()))
            }
            other => Err(ForwardParseError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ForwardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardTarget::Port(port) => write!(f, "port:{port}"),
            ForwardTarget::Exec(path) => write!(f, "exec:{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(forward: &str) -> FunnelDefinition {
        FunnelDefinition::new(TargetType::Bot, "1234", "s3cret", forward)
    }

    #[test]
    fn test_new_generates_unique_endpoint_ids() {
        let a = sample("port:3000");
        let b = sample("port:3000");

        assert_ne!(a.endpoint_id, b.endpoint_id);
        assert_eq!(a.endpoint_id.len(), 32);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let funnel = sample("port:3000");
        let debug = format!("{funnel:?}");

        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_add_rejects_duplicate_endpoint() {
        let mut list = FunnelList::default();
        let funnel = sample("port:3000");

        list.add(funnel.clone()).expect("first insert");
        let err = list.add(funnel.clone()).unwrap_err();

        assert_eq!(err, DuplicateEndpointError(funnel.endpoint_id));
        assert_eq!(list.funnels.len(), 1);
    }

    #[test]
    fn test_remove_by_endpoint_id() {
        let mut list = FunnelList::default();
        let funnel = sample("exec:/bin/true");
        list.add(funnel.clone()).expect("insert");

        assert_eq!(list.remove(&funnel.endpoint_id), Some(funnel));
        assert!(list.funnels.is_empty());
        assert_eq!(list.remove("missing"), None);
    }

    #[test]
    fn test_webhook_url_trims_trailing_slash() {
        let list = FunnelList {
            domain: "https://relay.example.com/".to_string(),
            ..Default::default()
        };

        assert_eq!(
            list.webhook_url("abc"),
            "https://relay.example.com/funnel?id=abc"
        );
    }

    #[test]
    fn test_target_type_serde() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&TargetType::Server)?;
        assert_eq!(json, r#""server""#);

        let parsed: TargetType = serde_json::from_str(r#""team""#)?;
        assert_eq!(parsed, TargetType::Team);
        Ok(())
    }

    #[test]
    fn test_parse_forward_targets() {
        assert_eq!("port:3000".parse::<ForwardTarget>(), Ok(ForwardTarget::Port(3000)));
        assert_eq!(
            "exec:/usr/local/bin/handler".parse::<ForwardTarget>(),
            Ok(ForwardTarget::Exec("/usr/local/bin/handler".to_string()))
        );
        // Paths may contain further colons
        assert_eq!(
            "exec:C:/hooks/run.exe".parse::<ForwardTarget>(),
            Ok(ForwardTarget::Exec("C:/hooks/run.exe".to_string()))
        );
    }

    #[test]
    fn test_parse_invalid_forwards() {
        assert!(matches!(
            "3000".parse::<ForwardTarget>(),
            Err(ForwardParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "socket:/tmp/x".parse::<ForwardTarget>(),
            Err(ForwardParseError::UnknownKind(_))
        ));
        assert!(matches!(
            "port:0".parse::<ForwardTarget>(),
            Err(ForwardParseError::InvalidPort(_))
        ));
        assert!(matches!(
            "port:70000".parse::<ForwardTarget>(),
            Err(ForwardParseError::InvalidPort(_))
        ));
        assert_eq!(
            "exec:".parse::<ForwardTarget>(),
            Err(ForwardParseError::EmptyPath)
        );
    }

    #[test]
    fn test_forward_display_roundtrips() {
        let target = ForwardTarget::Port(8081);
        assert_eq!(target.to_string(), "port:8081");
    }
}
