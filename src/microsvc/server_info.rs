use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a running service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    /// Unique per process; a UUID v4 unless set explicitly.
    pub id: String,
    pub version: String,
    /// Listen address, e.g. `0.0.0.0:8080` or `:8080`.
    pub address: String,
    /// Free-form metadata. `ip` is used when advertising the address.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4().to_string(),
            version: "latest".to_string(),
            address: String::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Address as other peers should see it: the `ip` metadata followed by
    /// the listen address.
    pub fn advertised_address(&self) -> String {
        match self.metadata.get("ip") {
            Some(ip) => format!("{ip}{}", self.address),
            None => self.address.clone(),
        }
    }
}
