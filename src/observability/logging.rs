//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the output format from the runtime environment
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development and test
//! - Log level configurable via `RUST_LOG`, defaulting per environment

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::NodeEnv;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn for_env(env: NodeEnv) -> Self {
        match env {
            NodeEnv::Production => LogFormat::Json,
            NodeEnv::Development | NodeEnv::Test => LogFormat::Pretty,
        }
    }
}

/// Default `EnvFilter` directives when `RUST_LOG` is unset.
pub fn default_directives(env: NodeEnv) -> &'static str {
    match env {
        NodeEnv::Production => "wardrobe_api=info,tower_http=info",
        NodeEnv::Development => "wardrobe_api=debug,tower_http=debug",
        NodeEnv::Test => "wardrobe_api=warn,tower_http=warn",
    }
}

/// Install the global subscriber.
///
/// Returns false if a subscriber was already installed (e.g. by a test).
pub fn init_logging(format: LogFormat, env: NodeEnv) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env)));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let fmt_layer = match format {
        LogFormat::Json => fmt_layer.json().flatten_event(true).boxed(),
        LogFormat::Pretty => fmt_layer.boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}
