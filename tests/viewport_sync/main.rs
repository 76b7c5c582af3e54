//! ViewportSync integration tests.
//!
//! Most tests run on a paused clock with a scripted source whose query
//! responses are released by hand, so ordering is fully controlled.

mod ordering;
mod drop_pin;
#[cfg(feature = "http")]
mod over_http;
