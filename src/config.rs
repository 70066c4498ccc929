//! Runtime configuration, read from the environment with defaults.
//!
//! | Variable | Default |
//! |---|---|
//! | `MICROHUB_NAME` | `microhub` |
//! | `MICROHUB_VERSION` | `latest` |
//! | `MICROHUB_ADDRESS` | `0.0.0.0:8080` |
//! | `MICROHUB_ADVERTISE_IP` | unset |
//! | `MICROHUB_IDEMPOTENCY_TTL_SECS` | `20` |
//! | `MICROHUB_IDEMPOTENCY_PREFIX` | `idempotency:` |
//! | `MICROHUB_IDEMPOTENCY_FIELD` | `x-sole-id` |
//! | `REDIS_URL` | unset (in-memory store) |

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::idempotency::GuardConfig;
use crate::microsvc::ServerInfo;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    /// Values parsed but are inconsistent or out of range.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub name: String,
    pub version: String,
    pub address: String,
    pub advertise_ip: Option<String>,
    pub idempotency: GuardConfig,
    /// `None` selects the in-memory store.
    pub redis_url: Option<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: "microhub".to_string(),
            version: "latest".to_string(),
            address: "0.0.0.0:8080".to_string(),
            advertise_ip: None,
            idempotency: GuardConfig::default(),
            redis_url: None,
        }
    }
}

impl HubConfig {
    /// Load from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = HubConfig::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = var("MICROHUB_NAME") {
            config.name = name;
        }
        if let Some(version) = var("MICROHUB_VERSION") {
            config.version = version;
        }
        if let Some(address) = var("MICROHUB_ADDRESS") {
            config.address = address;
        }
        config.advertise_ip = var("MICROHUB_ADVERTISE_IP");

        if let Some(secs) = parse_var::<u64>(&var, "MICROHUB_IDEMPOTENCY_TTL_SECS")? {
            config.idempotency.ttl = Duration::from_secs(secs);
        }
        if let Some(prefix) = var("MICROHUB_IDEMPOTENCY_PREFIX") {
            config.idempotency.key_prefix = prefix;
        }
        if let Some(field) = var("MICROHUB_IDEMPOTENCY_FIELD") {
            config.idempotency.key_field = field;
        }
        config.redis_url = var("REDIS_URL");

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("service name must not be empty".into()));
        }
        self.idempotency.validate()
    }

    /// Server identity for request logging, with a fresh instance id.
    pub fn server_info(&self) -> ServerInfo {
        let mut info = ServerInfo::new(&self.name)
            .with_version(&self.version)
            .with_address(&self.address);
        if let Some(ip) = &self.advertise_ip {
            info = info.with_metadata("ip", ip);
        }
        info
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}
