//! Exchange plumbing shared by every driver.
//!
//! - [`signing`]: HMAC-SHA256 over a sorted query string.
//! - [`http`]: one request-scoped GET with a timeout, failures mapped to
//!   [`DriverError::Transport`](cryptoconnect_core::DriverError).
//! - [`simulated`]: an in-memory driver for tests and dry runs.

pub mod http;
pub mod signing;
pub mod simulated;

pub use http::HttpResponse;
pub use simulated::{SimulatedDriver, SimulatedDriverConfig, SimulatedFailure};
