//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (+ optional .env) or an env file
//!     → loader.rs (collect raw key/value pairs)
//!     → validation.rs (single pass over the schema, all issues collected)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Optional keys carry defaults so a minimal environment is enough
//! - Any failing key blocks startup; there is no partial config

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, load_from_file, load_from_map, ConfigError};
pub use schema::{AppConfig, DatabaseKind, DatabaseUrl, NodeEnv, Secret};
pub use validation::{validate, ConfigIssue, ConfigValidationError, EnvSource, RuleKind};
