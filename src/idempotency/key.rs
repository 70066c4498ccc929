use std::collections::HashMap;
use std::fmt;

use super::IdempotencyError;

/// Metadata field the key is read from unless configured otherwise.
pub const DEFAULT_KEY_FIELD: &str = "x-sole-id";

/// Read-only string map attached to a request.
pub trait MetadataSource {
    /// Value of `field`, if present.
    fn metadata(&self, field: &str) -> Option<&str>;
}

impl MetadataSource for HashMap<String, String> {
    fn metadata(&self, field: &str) -> Option<&str> {
        lookup(self.iter(), field)
    }
}

/// Exact match first, then an ASCII case-insensitive scan. Transports
/// lowercase header names while direct callers often don't.
///
/// When several spellings match case-insensitively the smallest name wins,
/// independent of map iteration order.
pub(crate) fn lookup<'a, I>(entries: I, field: &str) -> Option<&'a str>
where
    I: Iterator<Item = (&'a String, &'a String)> + Clone,
{
    entries
        .clone()
        .find(|(k, _)| k.as_str() == field)
        .or_else(|| {
            entries
                .filter(|(k, _)| k.eq_ignore_ascii_case(field))
                .min_by(|(a, _), (b, _)| a.cmp(b))
        })
        .map(|(_, v)| v.as_str())
}

/// Caller-supplied key identifying one logical operation across retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the cache entry is stored.
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull the idempotency key out of request metadata.
///
/// Fails with `MissingKey` when the field is absent, empty, or blank.
pub fn extract<M>(metadata: &M, field: &str) -> Result<IdempotencyKey, IdempotencyError>
where
    M: MetadataSource + ?Sized,
{
    match metadata.metadata(field) {
        Some(value) if !value.trim().is_empty() => Ok(IdempotencyKey(value.to_string())),
        _ => Err(IdempotencyError::MissingKey {
            field: field.to_string(),
        }),
    }
}
