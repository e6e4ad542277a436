use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use config::{
    Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub dispatch: DispatchConfig,
    pub provisioning: ProvisioningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    /// Overrides the port stored with the funnels when set
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub timeout_secs: u64,
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Deserialize)]
pub struct ProvisioningConfig {
    pub enabled: bool,
    pub api_url: String,
    pub token: Option<String>,
}

impl fmt::Debug for ProvisioningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    fn load_with_sources(env_vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults()?;
        // If env_vars is provided, we use it instead of the config file and
        // system environment to keep tests independent of the host
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            builder = builder
                .add_source(File::with_name("webhook-funnel").required(false))
                // Format: APP_SERVER__HOST, APP_PROVISIONING__TOKEN, ...
                .add_source(
                    Environment::with_prefix("APP")
                        .prefix_separator("_")
                        .separator("__"),
                );
        }

        builder.build()?.try_deserialize()
    }

    /// Set default values for the configuration.
    /// `server.port` and `provisioning.token` have no default.
    fn set_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLib::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("registry.path", "funnels.json")?
            .set_default("dispatch.timeout_secs", 10)?
            .set_default("provisioning.enabled", true)?
            .set_default("provisioning.api_url", "https://api.example.com/v1")
    }
}
