//! # vorleser-observability
//!
//! Structured Logging via tracing-subscriber, Text oder JSON, auf stderr.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat};
