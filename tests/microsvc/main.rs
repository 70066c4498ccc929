//! microsvc integration tests.

mod guarded;

#[cfg(feature = "http")]
mod transport_http;
