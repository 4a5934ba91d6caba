//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events and spans (structured fields)
//!
//! logging.rs installs the subscriber:
//!     → JSON lines in production (log aggregation)
//!     → human-readable output everywhere else
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to every request span
//! - RUST_LOG overrides the default filter
//! - Secrets never reach log fields; configs are logged via their redacted view

pub mod logging;

pub use logging::{init_logging, LogFormat};
