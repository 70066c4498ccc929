use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::entry::{EntryState, DEFAULT_PLACEHOLDER};
use super::key::{extract, IdempotencyKey, MetadataSource, DEFAULT_KEY_FIELD};
use super::logger::{render, CallInfo, CallLogger, Completion, TracingLogger};
use super::{GuardError, IdempotencyError};
use crate::config::{ConfigError, ConfigResult};
use crate::store::AtomicStore;

/// Cache lifetime for placeholders and stored responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(20);

/// Prefix put in front of every idempotency key in the store.
pub const DEFAULT_KEY_PREFIX: &str = "idempotency:";

/// What happens to the placeholder when the inner handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave it; the key is rejected as in flight until the TTL runs out.
    #[default]
    KeepUntilExpiry,
    /// Delete it so the caller can retry immediately.
    Release,
}

/// Settings for an `IdempotencyGuard`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub ttl: Duration,
    pub key_prefix: String,
    /// Metadata field carrying the idempotency key.
    pub key_field: String,
    pub placeholder: Vec<u8>,
    pub failure_policy: FailurePolicy,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_vec(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl GuardConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Reject settings that would break the guard's invariants.
    ///
    /// The placeholder must not be valid JSON, otherwise a stored response
    /// could be mistaken for an in-flight marker.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ttl.is_zero() {
            return Err(ConfigError::Validation("idempotency ttl must be non-zero".into()));
        }
        if self.key_field.trim().is_empty() {
            return Err(ConfigError::Validation("idempotency key field must be set".into()));
        }
        if self.placeholder.is_empty() {
            return Err(ConfigError::Validation("placeholder must not be empty".into()));
        }
        if serde_json::from_slice::<serde_json::Value>(&self.placeholder).is_ok() {
            return Err(ConfigError::Validation(
                "placeholder must not be a valid JSON document".into(),
            ));
        }
        Ok(())
    }
}

/// Middleware that runs an inner handler at most once per idempotency key
/// within the TTL window.
///
/// The only synchronization point is the store's atomic exchange; the guard
/// holds no mutable state of its own and never waits on another caller.
/// Contention is answered with `IdempotencyError::InFlight`.
pub struct IdempotencyGuard {
    store: Arc<dyn AtomicStore>,
    config: GuardConfig,
    logger: Arc<dyn CallLogger>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn AtomicStore>, config: GuardConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            logger: Arc::new(TracingLogger),
        })
    }

    /// Replace the default `TracingLogger`.
    pub fn with_logger(mut self, logger: Arc<dyn CallLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Run `next` unless this key was already handled or is being handled.
    ///
    /// - first call for a key: invoke `next`, cache its successful response
    /// - key in flight: `InFlight`, `next` not called
    /// - key completed: the cached response, `next` not called
    ///
    /// Handler errors are returned as `GuardError::Handler` and never cached.
    pub fn intercept<M, Req, Resp, E, F>(
        &self,
        call: &CallInfo,
        metadata: &M,
        request: &Req,
        next: F,
    ) -> Result<Resp, GuardError<E>>
    where
        M: MetadataSource + ?Sized,
        Req: Serialize + ?Sized,
        Resp: Serialize + DeserializeOwned,
        E: fmt::Display,
        F: FnOnce(&Req) -> Result<Resp, E>,
    {
        let key = extract(metadata, &self.config.key_field)?;
        let storage_key = key.storage_key(&self.config.key_prefix);

        let outcome = self
            .store
            .exchange(&storage_key, &self.config.placeholder, self.config.ttl);
        let state = EntryState::observe(outcome, &self.config.placeholder).map_err(|err| {
            warn!(key = %key, error = %err, "idempotency exchange failed");
            IdempotencyError::StoreUnavailable(err)
        })?;

        match state {
            EntryState::InFlight => Err(IdempotencyError::InFlight {
                key: key.to_string(),
            }
            .into()),
            EntryState::Completed(cached) => self.replay(&key, cached),
            EntryState::Empty => self.invoke(call, &key, &storage_key, request, next),
        }
    }

    fn replay<Resp, E>(&self, key: &IdempotencyKey, cached: Vec<u8>) -> Result<Resp, GuardError<E>>
    where
        Resp: DeserializeOwned,
    {
        serde_json::from_slice(&cached).map_err(|source| {
            IdempotencyError::CorruptEntry {
                key: key.to_string(),
                source,
            }
            .into()
        })
    }

    fn invoke<Req, Resp, E, F>(
        &self,
        call: &CallInfo,
        key: &IdempotencyKey,
        storage_key: &str,
        request: &Req,
        next: F,
    ) -> Result<Resp, GuardError<E>>
    where
        Req: Serialize + ?Sized,
        Resp: Serialize,
        E: fmt::Display,
        F: FnOnce(&Req) -> Result<Resp, E>,
    {
        self.logger.before(call, &render(request));
        let started = Instant::now();
        let outcome = next(request);
        let elapsed = started.elapsed();

        match outcome {
            Ok(response) => {
                let rendered = render(&response);
                self.logger.after(
                    call,
                    Completion {
                        elapsed,
                        response: Some(&rendered),
                        error: None,
                    },
                );
                self.store_response(key, storage_key, &response);
                Ok(response)
            }
            Err(err) => {
                let message = err.to_string();
                self.logger.after(
                    call,
                    Completion {
                        elapsed,
                        response: None,
                        error: Some(&message),
                    },
                );
                self.release(key, storage_key);
                Err(GuardError::Handler(err))
            }
        }
    }

    /// The handler already ran; a failed write-back is logged, not returned.
    fn store_response<Resp: Serialize>(&self, key: &IdempotencyKey, storage_key: &str, response: &Resp) {
        let encoded = match serde_json::to_vec(response) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key = %key, error = %err, "response not cacheable");
                return;
            }
        };
        if let Err(err) = self.store.set_with_ttl(storage_key, &encoded, self.config.ttl) {
            warn!(key = %key, error = %err, "failed to cache response");
        }
    }

    fn release(&self, key: &IdempotencyKey, storage_key: &str) {
        match self.config.failure_policy {
            FailurePolicy::KeepUntilExpiry => {}
            FailurePolicy::Release => {
                if let Err(err) = self.store.remove(storage_key) {
                    warn!(key = %key, error = %err, "failed to release placeholder");
                }
            }
        }
    }
}
