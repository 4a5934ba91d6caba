//! Configuration loading from the process environment or an env file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate, ConfigValidationError, EnvSource};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}

impl ConfigError {
    /// The validation failure, if that is what this is.
    pub fn validation(&self) -> Option<&ConfigValidationError> {
        match self {
            ConfigError::Validation(e) => Some(e),
            ConfigError::EnvFile { .. } => None,
        }
    }
}

/// Load and validate configuration from the process environment.
///
/// A `.env` file in the working directory (or a parent) is applied first if
/// one exists. Variables already set in the environment take precedence.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Applied .env file"),
        Err(e) if e.not_found() => {}
        Err(source) => {
            return Err(ConfigError::EnvFile {
                path: PathBuf::from(".env"),
                source,
            })
        }
    }

    load_from_map(&process_env())
}

/// Load and validate configuration from an env file alone.
///
/// The process environment is neither read nor modified.
pub fn load_from_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let env = read_env_file(path)?;
    load_from_map(&env)
}

/// Validate an arbitrary key/value source.
pub fn load_from_map<S: EnvSource + ?Sized>(env: &S) -> Result<AppConfig, ConfigError> {
    Ok(validate(env)?)
}

/// Parse an env file into a map without touching the process environment.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let wrap = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut env = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(wrap)? {
        let (key, value) = item.map_err(wrap)?;
        env.insert(key, value);
    }
    Ok(env)
}

/// Snapshot of the process environment. Non-UTF-8 entries are skipped.
fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
