//! Request-scoped metadata (HTTP headers, gRPC metadata, payload variables).

use std::collections::HashMap;

use crate::idempotency::{lookup, MetadataSource};

/// Metadata attached to an incoming request.
///
/// Transports fill it from HTTP headers or gRPC metadata, so keys are
/// usually lowercase:
///
/// ```json
/// {
///   "x-sole-id": "order-7f3a",
///   "content-type": "application/json"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    variables: HashMap<String, String>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from a map of variables.
    pub fn from_map(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    /// Get a session variable by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|v| v.as_str())
    }

    /// Set a session variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Builder form of [`Session::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Check if a session variable exists.
    pub fn has(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Get all session variables.
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }
}

impl MetadataSource for Session {
    fn metadata(&self, field: &str) -> Option<&str> {
        lookup(self.variables.iter(), field)
    }
}
