//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Report every configuration problem before exiting
//! - Bind the listener once everything else is ready

use std::io::Write;

use tokio::net::TcpListener;

use crate::config::{AppConfig, ConfigError};

/// Write a human-readable report of a failed configuration load.
///
/// One line per failing key, so operators can fix everything in one pass.
pub fn write_config_report(err: &ConfigError, out: &mut dyn Write) -> std::io::Result<()> {
    match err.validation() {
        Some(validation) => {
            writeln!(out, "Invalid configuration ({} problem(s)):", validation.len())?;
            for issue in validation.issues() {
                writeln!(out, "  - {}", issue)?;
            }
        }
        None => writeln!(out, "Configuration could not be loaded: {}", err)?,
    }
    Ok(())
}

/// Print a configuration failure to stderr.
///
/// Runs before logging is initialised, so stderr is the only channel.
pub fn report_config_error(err: &ConfigError) {
    let _ = write_config_report(err, &mut std::io::stderr().lock());
}

/// Log the accepted configuration without secrets.
pub fn log_config(config: &AppConfig) {
    tracing::info!(
        node_env = %config.node_env,
        port = config.port,
        database = config.database_kind().as_str(),
        cors_origins = ?config.cors_origins(),
        s3_bucket = %config.s3_bucket,
        "Configuration loaded"
    );
    tracing::debug!(config = %config.redacted(), "Effective configuration");
}

/// Bind the HTTP listener on the configured port.
pub async fn bind_listener(config: &AppConfig) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_map;
    use std::collections::HashMap;

    #[test]
    fn test_report_lists_every_issue() {
        let env: HashMap<String, String> =
            [("PORT".to_string(), "abc".to_string())].into_iter().collect();
        let err = load_from_map(&env).unwrap_err();

        let mut out = Vec::new();
        write_config_report(&err, &mut out).unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(report.starts_with("Invalid configuration (9 problem(s)):"));
        assert!(report.contains("PORT [invalid_type]"));
        assert!(report.contains("JWT_SECRET [missing]"));
        assert_eq!(report.lines().count(), 10);
    }
}
