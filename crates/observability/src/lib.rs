//! # chatly-observability
//!
//! Observability-Crate fuer das Chatly-Relay:
//! - Liveness-Endpunkt (`GET /`) mit festem Text
//! - Structured Logging via tracing-subscriber (Text oder JSON)
//! - Request-Timing Middleware

pub mod liveness;
pub mod logging;
pub mod middleware;

pub use liveness::{liveness_router, LIVENESS_TEXT};
pub use logging::logging_initialisieren;
pub use middleware::{request_timing_layer, timing_middleware};
