//! HTTP surface of the service.
//!
//! * [`routes`] - warp route table and rejection handling
//! * [`handlers`] - per-route request handling
//! * [`response`] - JSON envelopes

pub mod handlers;
pub mod response;
pub mod routes;

pub use handlers::classify;
pub use response::{ApiResponse, ClassificationResult, Outcome};
pub use routes::routes;
