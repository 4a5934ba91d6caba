//! Configuration schema definitions.
//!
//! Two halves live here:
//! - [`SCHEMA`], the ordered list of recognised environment keys and the
//!   rules each one is checked against
//! - [`AppConfig`] and its field types, the typed result of a successful
//!   validation pass

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use url::Url;

/// Environment variable names recognised by the backend.
pub mod keys {
    pub const NODE_ENV: &str = "NODE_ENV";
    pub const PORT: &str = "PORT";
    pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const REDIS_URL: &str = "REDIS_URL";
    pub const S3_ENDPOINT: &str = "S3_ENDPOINT";
    pub const S3_BUCKET: &str = "S3_BUCKET";
    pub const S3_ACCESS_KEY: &str = "S3_ACCESS_KEY";
    pub const S3_SECRET_KEY: &str = "S3_SECRET_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const JWT_SECRET: &str = "JWT_SECRET";
}

/// Minimum length of `JWT_SECRET`, in characters.
pub const JWT_SECRET_MIN_CHARS: usize = 32;

/// Allowed values of `NODE_ENV`.
pub const NODE_ENVS: &[&str] = &["development", "production", "test"];

/// A single step in a field's rule chain.
///
/// Rules run in declaration order. Presence rules (`Required`, `Optional`,
/// `Default`) decide what happens when the key is absent; `Coerce` turns the
/// raw text into a typed value; `Check` refines the typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Absent key is an error.
    Required,
    /// Absent key ends evaluation with no value.
    Optional,
    /// Absent key is replaced with this raw value.
    Default(&'static str),
    Coerce(Coercion),
    Check(Predicate),
}

/// Conversions from raw text to a typed value.
///
/// Only `Integer` reports unparseable input as a type error; a bad URL or an
/// unknown environment name is a failed constraint on a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Integer,
    Url,
    NodeEnv,
}

/// Refinement predicates applied after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    NonEmpty,
    Positive,
    AtMost(i64),
    MinChars(usize),
    /// Filesystem path, sqlite file, or a sqlite/postgresql/mysql URL.
    DatabaseLocation,
}

/// A recognised configuration key and its rule chain.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub key: &'static str,
    pub help: &'static str,
    pub rules: &'static [Rule],
}

impl Field {
    /// The raw default substituted when the key is absent, if any.
    pub fn default_value(&self) -> Option<&'static str> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Default(value) => Some(*value),
            _ => None,
        })
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }
}

/// Every recognised key, in evaluation order.
pub const SCHEMA: &[Field] = &[
    Field {
        key: keys::NODE_ENV,
        help: "Runtime environment (development, production, test)",
        rules: &[Rule::Default("development"), Rule::Coerce(Coercion::NodeEnv)],
    },
    Field {
        key: keys::PORT,
        help: "TCP port the HTTP server listens on",
        rules: &[
            Rule::Default("3000"),
            Rule::Coerce(Coercion::Integer),
            Rule::Check(Predicate::Positive),
            Rule::Check(Predicate::AtMost(u16::MAX as i64)),
        ],
    },
    Field {
        key: keys::CORS_ORIGINS,
        help: "Comma-separated list of allowed browser origins",
        rules: &[Rule::Optional],
    },
    Field {
        key: keys::DATABASE_URL,
        help: "Database location: sqlite file path or sqlite/postgresql/mysql URL",
        rules: &[
            Rule::Required,
            Rule::Check(Predicate::NonEmpty),
            Rule::Check(Predicate::DatabaseLocation),
        ],
    },
    Field {
        key: keys::REDIS_URL,
        help: "Redis connection URL",
        rules: &[Rule::Required, Rule::Check(Predicate::NonEmpty), Rule::Coerce(Coercion::Url)],
    },
    Field {
        key: keys::S3_ENDPOINT,
        help: "Object storage endpoint URL",
        rules: &[Rule::Required, Rule::Check(Predicate::NonEmpty), Rule::Coerce(Coercion::Url)],
    },
    Field {
        key: keys::S3_BUCKET,
        help: "Bucket holding wardrobe item images",
        rules: &[Rule::Required, Rule::Check(Predicate::NonEmpty)],
    },
    Field {
        key: keys::S3_ACCESS_KEY,
        help: "Object storage access key",
        rules: &[Rule::Required, Rule::Check(Predicate::NonEmpty)],
    },
    Field {
        key: keys::S3_SECRET_KEY,
        help: "Object storage secret key",
        rules: &[Rule::Required, Rule::Check(Predicate::NonEmpty)],
    },
    Field {
        key: keys::OPENAI_API_KEY,
        help: "API key for outfit suggestion generation",
        rules: &[Rule::Required, Rule::Check(Predicate::NonEmpty)],
    },
    Field {
        key: keys::JWT_SECRET,
        help: "Signing secret for access tokens (at least 32 characters)",
        rules: &[Rule::Required, Rule::Check(Predicate::MinChars(JWT_SECRET_MIN_CHARS))],
    },
];

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeEnv {
    #[default]
    Development,
    Production,
    Test,
}

impl NodeEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeEnv::Development => "development",
            NodeEnv::Production => "production",
            NodeEnv::Test => "test",
        }
    }
}

impl fmt::Display for NodeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(NodeEnv::Development),
            "production" => Ok(NodeEnv::Production),
            "test" => Ok(NodeEnv::Test),
            other => Err(format!("unknown environment \"{}\"", other)),
        }
    }
}

/// Database backend class, inferred from the `DATABASE_URL` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    /// Plain filesystem path to a sqlite database.
    SqliteFile,
    /// `sqlite://` URL.
    Sqlite,
    Postgres,
    Mysql,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::SqliteFile => "sqlite_file",
            DatabaseKind::Sqlite => "sqlite",
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Mysql => "mysql",
        }
    }
}

/// Returns true if `value` is an accepted `DATABASE_URL`.
///
/// Any one of the alternatives is enough; a value may match several.
pub fn is_database_location(value: &str) -> bool {
    const PREFIXES: &[&str] = &["./", "../", "/", "sqlite://", "postgresql://", "mysql://"];
    const SUFFIXES: &[&str] = &[".sqlite", ".db"];

    PREFIXES.iter().any(|p| value.starts_with(p)) || SUFFIXES.iter().any(|s| value.ends_with(s))
}

/// A validated `DATABASE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrl(String);

impl DatabaseUrl {
    /// Wrap an already-validated location.
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> DatabaseKind {
        if self.0.starts_with("postgresql://") {
            DatabaseKind::Postgres
        } else if self.0.starts_with("mysql://") {
            DatabaseKind::Mysql
        } else if self.0.starts_with("sqlite://") {
            DatabaseKind::Sqlite
        } else {
            DatabaseKind::SqliteFile
        }
    }

    /// The location with any embedded password masked.
    pub fn redacted(&self) -> String {
        match self.kind() {
            DatabaseKind::Postgres | DatabaseKind::Mysql => match Url::parse(&self.0) {
                Ok(url) => redact_url(&url),
                Err(_) => self.0.clone(),
            },
            _ => self.0.clone(),
        }
    }
}

const REDACTED: &str = "****";

/// Render a URL with its password (if any) masked.
pub fn redact_url(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut masked = url.clone();
    // Only fails for cannot-be-a-base URLs, which carry no password.
    let _ = masked.set_password(Some(REDACTED));
    masked.to_string()
}

/// A credential that must never reach logs or serialized output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Validated, immutable backend configuration.
///
/// Only constructed by [`crate::config::validation::validate`]; every field
/// is present and well-typed.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub node_env: NodeEnv,
    pub port: u16,
    pub cors_origins: Option<String>,
    pub database_url: DatabaseUrl,
    pub redis_url: Url,
    pub s3_endpoint: Url,
    pub s3_bucket: String,
    pub s3_access_key: Secret,
    pub s3_secret_key: Secret,
    pub openai_api_key: Secret,
    pub jwt_secret: Secret,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.node_env == NodeEnv::Production
    }

    pub fn database_kind(&self) -> DatabaseKind {
        self.database_url.kind()
    }

    /// Allowed CORS origins, trimmed, with empty entries dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// JSON view safe for logs and operator output.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "node_env": self.node_env,
            "port": self.port,
            "cors_origins": self.cors_origins(),
            "database_url": self.database_url.redacted(),
            "database_kind": self.database_kind(),
            "redis_url": redact_url(&self.redis_url),
            "s3_endpoint": redact_url(&self.s3_endpoint),
            "s3_bucket": self.s3_bucket,
            "s3_access_key": self.s3_access_key,
            "s3_secret_key": self.s3_secret_key,
            "openai_api_key": self.openai_api_key,
            "jwt_secret": self.jwt_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_location_alternatives() {
        for ok in [
            "./data.sqlite",
            "../shared/app.db",
            "/var/lib/app.db",
            "closet.sqlite",
            "sqlite://mem",
            "postgresql://u:p@h:5432/d",
            "mysql://u:p@h:3306/d",
        ] {
            assert!(is_database_location(ok), "{} should be accepted", ok);
        }

        for bad in ["not-a-path", "postgres://u@h/d", "data.sqlite3", ""] {
            assert!(!is_database_location(bad), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_database_kind_inference() {
        assert_eq!(DatabaseUrl::new("./data.sqlite").kind(), DatabaseKind::SqliteFile);
        assert_eq!(DatabaseUrl::new("/var/lib/app.db").kind(), DatabaseKind::SqliteFile);
        assert_eq!(DatabaseUrl::new("sqlite://mem").kind(), DatabaseKind::Sqlite);
        assert_eq!(DatabaseUrl::new("postgresql://u:p@h:5432/d").kind(), DatabaseKind::Postgres);
        assert_eq!(DatabaseUrl::new("mysql://u:p@h:3306/d").kind(), DatabaseKind::Mysql);
    }

    #[test]
    fn test_database_url_redacts_password() {
        let url = DatabaseUrl::new("postgresql://closet:hunter2@db:5432/wardrobe");
        let shown = url.redacted();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("closet"));
        assert_eq!(DatabaseUrl::new("./data.sqlite").redacted(), "./data.sqlite");
    }

    #[test]
    fn test_secret_never_displays_value() {
        let secret = Secret::new("sk-live-very-secret");
        assert_eq!(format!("{}", secret), "****");
        assert_eq!(format!("{:?}", secret), "Secret(****)");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"****\"");
        assert_eq!(secret.expose(), "sk-live-very-secret");
    }

    #[test]
    fn test_schema_shape() {
        assert_eq!(SCHEMA.len(), 11);
        let required: Vec<_> = SCHEMA.iter().filter(|f| f.is_required()).map(|f| f.key).collect();
        assert_eq!(required.len(), 8);
        assert!(!required.contains(&keys::PORT));

        let port = SCHEMA.iter().find(|f| f.key == keys::PORT).unwrap();
        assert_eq!(port.default_value(), Some("3000"));
    }

    #[test]
    fn test_node_env_parse() {
        assert_eq!("production".parse::<NodeEnv>(), Ok(NodeEnv::Production));
        assert!("staging".parse::<NodeEnv>().is_err());
        assert_eq!(NodeEnv::default(), NodeEnv::Development);
    }
}
