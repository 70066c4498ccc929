use crate::store::{Exchange, StoreError};

/// Placeholder written while an invocation is in progress.
///
/// A NUL byte can never start a JSON document, so the sentinel cannot
/// collide with a serialized response.
pub const DEFAULT_PLACEHOLDER: &[u8] = b"\0in-flight";

/// Per-key state as observed through one exchange.
///
/// `Empty -> InFlight -> Completed`, with expiry back to `Empty` handled by
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// No entry: this caller owns the invocation.
    Empty,
    /// Another caller holds the placeholder.
    InFlight,
    /// A serialized response from a finished invocation.
    Completed(Vec<u8>),
}

impl EntryState {
    /// Classify the previous value returned by an exchange. A store failure
    /// stays a failure.
    pub fn observe(outcome: Exchange, placeholder: &[u8]) -> Result<Self, StoreError> {
        match outcome {
            Exchange::NotFound => Ok(EntryState::Empty),
            Exchange::Found(previous) if previous == placeholder => Ok(EntryState::InFlight),
            Exchange::Found(previous) => Ok(EntryState::Completed(previous)),
            Exchange::Failure(err) => Err(err),
        }
    }
}
