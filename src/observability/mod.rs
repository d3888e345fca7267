//! Observability support
//!
//! Structured logging initialization for the CLI and services embedding the
//! orchestrator.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
