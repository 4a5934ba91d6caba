//! Configuration validation.
//!
//! # Responsibilities
//! - Walk [`SCHEMA`] once, in order, against a raw key/value source
//! - Coerce raw text to typed values and apply refinement predicates
//! - Build the typed [`AppConfig`] only when every key passed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - At most one issue per key: the first failing rule wins
//! - Validation is a pure function of its input; extra keys are ignored

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::schema::{
    is_database_location, keys, AppConfig, Coercion, DatabaseUrl, Field, NodeEnv, Predicate, Rule,
    Secret, NODE_ENVS, SCHEMA,
};

/// A read-only source of raw configuration values.
pub trait EnvSource {
    fn get_raw(&self, key: &str) -> Option<&str>;
}

impl EnvSource for HashMap<String, String> {
    fn get_raw(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn get_raw(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Which class of rule rejected a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Required key was absent.
    Missing,
    /// Raw text could not be coerced to the expected type.
    InvalidType,
    /// Typed value failed a refinement predicate.
    Constraint,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Missing => "missing",
            RuleKind::InvalidType => "invalid_type",
            RuleKind::Constraint => "constraint",
        };
        f.write_str(name)
    }
}

/// A single failing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub key: &'static str,
    pub rule: RuleKind,
    pub message: String,
}

impl ConfigIssue {
    fn new(key: &'static str, rule: RuleKind, message: impl Into<String>) -> Self {
        Self { key, rule, message: message.into() }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.key, self.rule, self.message)
    }
}

/// Validation failed; carries every failing key in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {}", join_issues(.issues))]
pub struct ConfigValidationError {
    issues: Vec<ConfigIssue>,
}

impl ConfigValidationError {
    /// Never empty.
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// The issue recorded for `key`, if it failed.
    pub fn issue_for(&self, key: &str) -> Option<&ConfigIssue> {
        self.issues.iter().find(|issue| issue.key == key)
    }
}

impl From<ConfigIssue> for ConfigValidationError {
    fn from(issue: ConfigIssue) -> Self {
        Self { issues: vec![issue] }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Intermediate value of a key while its rule chain runs.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Integer(i64),
    Url(Url),
    Env(NodeEnv),
}

/// Validate `env` against the schema.
///
/// Every key is evaluated even after earlier keys fail, so the error lists
/// every problem at once.
pub fn validate<S: EnvSource + ?Sized>(env: &S) -> Result<AppConfig, ConfigValidationError> {
    let mut issues = Vec::new();
    let mut resolved = Resolved::default();

    for field in SCHEMA {
        match evaluate(field, env.get_raw(field.key)) {
            Ok(Some(value)) => {
                resolved.values.insert(field.key, value);
            }
            Ok(None) => {}
            Err(issue) => issues.push(issue),
        }
    }

    if !issues.is_empty() {
        tracing::debug!(failed = issues.len(), "configuration rejected");
        return Err(ConfigValidationError { issues });
    }

    resolved.into_config().map_err(ConfigValidationError::from)
}

/// Run one field's rule chain against its raw value.
fn evaluate(field: &Field, raw: Option<&str>) -> Result<Option<Value>, ConfigIssue> {
    let key = field.key;
    let mut value = raw.map(|s| Value::Text(s.to_owned()));

    for rule in field.rules {
        match rule {
            Rule::Required => {
                if value.is_none() {
                    return Err(ConfigIssue::new(key, RuleKind::Missing, "is required but not set"));
                }
            }
            Rule::Optional => {
                if value.is_none() {
                    return Ok(None);
                }
            }
            Rule::Default(default) => {
                if value.is_none() {
                    value = Some(Value::Text((*default).to_owned()));
                }
            }
            Rule::Coerce(coercion) => {
                if let Some(current) = value.take() {
                    value = Some(coerce(*coercion, current).map_err(|(rule, message)| {
                        ConfigIssue::new(key, rule, message)
                    })?);
                }
            }
            Rule::Check(predicate) => {
                if let Some(current) = &value {
                    check(*predicate, current).map_err(|(rule, message)| {
                        ConfigIssue::new(key, rule, message)
                    })?;
                }
            }
        }
    }

    Ok(value)
}

type RuleFailure = (RuleKind, String);

fn coerce(coercion: Coercion, value: Value) -> Result<Value, RuleFailure> {
    match (coercion, value) {
        (Coercion::Integer, Value::Integer(n)) => Ok(Value::Integer(n)),
        (Coercion::Integer, Value::Text(raw)) => coerce_integer(&raw).map(Value::Integer),
        (Coercion::Url, Value::Text(raw)) => Url::parse(&raw)
            .map(Value::Url)
            .map_err(|e| (RuleKind::Constraint, format!("must be a valid URL ({})", e))),
        (Coercion::NodeEnv, Value::Text(raw)) => raw.parse().map(Value::Env).map_err(|_| {
            (
                RuleKind::Constraint,
                format!("must be one of {} (got \"{}\")", NODE_ENVS.join(", "), raw),
            )
        }),
        (_, _) => Err((RuleKind::InvalidType, "expected text".to_string())),
    }
}

/// Numeric coercion: blank reads as zero, integral floats and
/// `0x`/`0o`/`0b` literals are accepted.
fn coerce_integer(raw: &str) -> Result<i64, RuleFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Some((digits, radix)) = split_radix(trimmed) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err((RuleKind::InvalidType, format!("expected a number, got \"{}\"", raw)));
        }
        // Digits are validated above, so overflow is the only failure left.
        return i64::from_str_radix(digits, radix)
            .map_err(|_| (RuleKind::Constraint, "is out of range".to_string()));
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => {
            if f.fract() != 0.0 {
                Err((RuleKind::Constraint, "must be an integer".to_string()))
            } else if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err((RuleKind::Constraint, "is out of range".to_string()))
            }
        }
        _ => Err((RuleKind::InvalidType, format!("expected a number, got \"{}\"", raw))),
    }
}

fn split_radix(s: &str) -> Option<(&str, u32)> {
    let (prefix, digits) = (s.get(..2)?, &s[2..]);
    match prefix {
        "0x" | "0X" => Some((digits, 16)),
        "0o" | "0O" => Some((digits, 8)),
        "0b" | "0B" => Some((digits, 2)),
        _ => None,
    }
}

fn check(predicate: Predicate, value: &Value) -> Result<(), RuleFailure> {
    let constraint = |message: String| Err((RuleKind::Constraint, message));

    match (predicate, value) {
        (Predicate::NonEmpty, Value::Text(s)) => {
            if s.is_empty() {
                return constraint("must not be empty".to_string());
            }
        }
        (Predicate::MinChars(min), Value::Text(s)) => {
            if s.chars().count() < min {
                return constraint(format!("must be at least {} characters long", min));
            }
        }
        (Predicate::DatabaseLocation, Value::Text(s)) => {
            if !is_database_location(s) {
                return constraint(
                    "must be a filesystem path (./, ../, /), a .sqlite/.db file, \
                     or a sqlite://, postgresql:// or mysql:// URL"
                        .to_string(),
                );
            }
        }
        (Predicate::Positive, Value::Integer(n)) => {
            if *n <= 0 {
                return constraint("must be a positive integer".to_string());
            }
        }
        (Predicate::AtMost(max), Value::Integer(n)) => {
            if *n > max {
                return constraint(format!("must be at most {}", max));
            }
        }
        (Predicate::Positive | Predicate::AtMost(_), _) => {
            return Err((RuleKind::InvalidType, "expected a number".to_string()));
        }
        (_, _) => {
            return Err((RuleKind::InvalidType, "expected text".to_string()));
        }
    }
    Ok(())
}

/// Conversion from a rule chain's final value into a config field type.
trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for Secret {
    fn from_value(value: Value) -> Option<Self> {
        String::from_value(value).map(Secret::new)
    }
}

impl FromValue for DatabaseUrl {
    fn from_value(value: Value) -> Option<Self> {
        String::from_value(value).map(DatabaseUrl::new)
    }
}

impl FromValue for u16 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(n) => u16::try_from(n).ok(),
            _ => None,
        }
    }
}

impl FromValue for Url {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Url(url) => Some(url),
            _ => None,
        }
    }
}

impl FromValue for NodeEnv {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Env(env) => Some(env),
            _ => None,
        }
    }
}

/// Values that survived their rule chains, keyed by schema key.
#[derive(Debug, Default)]
struct Resolved {
    values: HashMap<&'static str, Value>,
}

impl Resolved {
    /// Move a field's typed value out. Failing here means the schema's rule
    /// chain for `key` does not produce the type `AppConfig` expects.
    fn take<T: FromValue>(&mut self, key: &'static str) -> Result<T, ConfigIssue> {
        self.values.remove(key).and_then(T::from_value).ok_or_else(|| {
            ConfigIssue::new(key, RuleKind::InvalidType, "rule chain produced an unexpected type")
        })
    }

    fn take_optional<T: FromValue>(&mut self, key: &'static str) -> Option<T> {
        self.values.remove(key).and_then(T::from_value)
    }

    fn into_config(mut self) -> Result<AppConfig, ConfigIssue> {
        Ok(AppConfig {
            node_env: self.take(keys::NODE_ENV)?,
            port: self.take(keys::PORT)?,
            cors_origins: self.take_optional(keys::CORS_ORIGINS),
            database_url: self.take(keys::DATABASE_URL)?,
            redis_url: self.take(keys::REDIS_URL)?,
            s3_endpoint: self.take(keys::S3_ENDPOINT)?,
            s3_bucket: self.take(keys::S3_BUCKET)?,
            s3_access_key: self.take(keys::S3_ACCESS_KEY)?,
            s3_secret_key: self.take(keys::S3_SECRET_KEY)?,
            openai_api_key: self.take(keys::OPENAI_API_KEY)?,
            jwt_secret: self.take(keys::JWT_SECRET)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DatabaseKind;

    const SECRET_32: &str = "0123456789abcdef0123456789abcdef";

    fn valid_env() -> HashMap<String, String> {
        [
            (keys::DATABASE_URL, "./data.sqlite"),
            (keys::REDIS_URL, "redis://localhost:6379"),
            (keys::S3_ENDPOINT, "http://localhost:9000"),
            (keys::S3_BUCKET, "wardrobe-items"),
            (keys::S3_ACCESS_KEY, "minio"),
            (keys::S3_SECRET_KEY, "minio-secret"),
            (keys::OPENAI_API_KEY, "sk-test"),
            (keys::JWT_SECRET, SECRET_32),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn with(key: &str, value: &str) -> HashMap<String, String> {
        let mut env = valid_env();
        env.insert(key.to_string(), value.to_string());
        env
    }

    fn only_issue(env: &HashMap<String, String>) -> ConfigIssue {
        let err = validate(env).unwrap_err();
        assert_eq!(err.len(), 1, "unexpected issues: {}", err);
        err.issues()[0].clone()
    }

    #[test]
    fn test_valid_env_with_defaults() {
        let config = validate(&valid_env()).unwrap();
        assert_eq!(config.node_env, NodeEnv::Development);
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, None);
        assert_eq!(config.database_kind(), DatabaseKind::SqliteFile);
        assert_eq!(config.s3_bucket, "wardrobe-items");
        assert_eq!(config.jwt_secret.expose(), SECRET_32);
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let mut env = valid_env();
        env.insert("PATH".into(), "/usr/bin".into());
        env.insert("SMTP_HOST".into(), "mail.local".into());
        assert!(validate(&env).is_ok());
    }

    #[test]
    fn test_each_missing_required_key_reported_once() {
        let required: Vec<_> = SCHEMA.iter().filter(|f| f.is_required()).collect();
        for field in required {
            let mut env = valid_env();
            env.remove(field.key);
            let err = validate(&env).unwrap_err();
            let hits: Vec<_> = err.issues().iter().filter(|i| i.key == field.key).collect();
            assert_eq!(hits.len(), 1, "{}", field.key);
            assert_eq!(hits[0].rule, RuleKind::Missing);
        }
    }

    #[test]
    fn test_no_short_circuit_on_empty_input() {
        let env: HashMap<String, String> = HashMap::new();
        let err = validate(&env).unwrap_err();
        let required = SCHEMA.iter().filter(|f| f.is_required()).count();
        assert_eq!(err.len(), required);
        assert!(err.issues().iter().all(|i| i.rule == RuleKind::Missing));

        // Schema order is preserved.
        let order: Vec<_> = err.issues().iter().map(|i| i.key).collect();
        let expected: Vec<_> = SCHEMA.iter().filter(|f| f.is_required()).map(|f| f.key).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_port_coercion() {
        let config = validate(&with(keys::PORT, "8080")).unwrap();
        assert_eq!(config.port, 8080);

        let issue = only_issue(&with(keys::PORT, "eighty"));
        assert_eq!((issue.key, issue.rule), (keys::PORT, RuleKind::InvalidType));

        for bad in ["0", "-1", "-8080", "80.5", "70000", ""] {
            let issue = only_issue(&with(keys::PORT, bad));
            assert_eq!((issue.key, issue.rule), (keys::PORT, RuleKind::Constraint), "{:?}", bad);
        }

        assert_eq!(validate(&with(keys::PORT, " 4000 ")).unwrap().port, 4000);
    }

    #[test]
    fn test_port_numeric_literals() {
        assert_eq!(validate(&with(keys::PORT, "0x50")).unwrap().port, 80);
        assert_eq!(validate(&with(keys::PORT, "0o17")).unwrap().port, 15);
        assert_eq!(validate(&with(keys::PORT, "0b1010")).unwrap().port, 10);
        assert_eq!(validate(&with(keys::PORT, "1e3")).unwrap().port, 1000);

        for bad in ["0x", "0xzz", "0b102", "-0x50"] {
            let issue = only_issue(&with(keys::PORT, bad));
            assert_eq!((issue.key, issue.rule), (keys::PORT, RuleKind::InvalidType), "{:?}", bad);
        }

        let issue = only_issue(&with(keys::PORT, "0x10000"));
        assert_eq!((issue.key, issue.rule), (keys::PORT, RuleKind::Constraint));
    }

    #[test]
    fn test_database_url_forms() {
        for ok in [
            "./data.sqlite",
            "/var/lib/app.db",
            "sqlite://mem",
            "postgresql://u:p@h:5432/d",
            "mysql://u:p@h:3306/d",
        ] {
            assert!(validate(&with(keys::DATABASE_URL, ok)).is_ok(), "{}", ok);
        }

        let issue = only_issue(&with(keys::DATABASE_URL, "not-a-path"));
        assert_eq!((issue.key, issue.rule), (keys::DATABASE_URL, RuleKind::Constraint));

        let issue = only_issue(&with(keys::DATABASE_URL, ""));
        assert_eq!(issue.message, "must not be empty");
    }

    #[test]
    fn test_url_fields() {
        for key in [keys::REDIS_URL, keys::S3_ENDPOINT] {
            let issue = only_issue(&with(key, "not a url"));
            assert_eq!((issue.key, issue.rule), (key, RuleKind::Constraint));
        }
        let config = validate(&with(keys::REDIS_URL, "redis://localhost:6379")).unwrap();
        assert_eq!(config.redis_url.port(), Some(6379));
    }

    #[test]
    fn test_jwt_secret_length() {
        let issue = only_issue(&with(keys::JWT_SECRET, &SECRET_32[..31]));
        assert_eq!((issue.key, issue.rule), (keys::JWT_SECRET, RuleKind::Constraint));
        assert!(validate(&with(keys::JWT_SECRET, SECRET_32)).is_ok());
    }

    #[test]
    fn test_node_env() {
        let config = validate(&with(keys::NODE_ENV, "production")).unwrap();
        assert!(config.is_production());

        let issue = only_issue(&with(keys::NODE_ENV, "staging"));
        assert_eq!((issue.key, issue.rule), (keys::NODE_ENV, RuleKind::Constraint));
        assert!(issue.message.contains("staging"));
    }

    #[test]
    fn test_empty_required_strings_fail_constraint() {
        let issue = only_issue(&with(keys::S3_BUCKET, ""));
        assert_eq!((issue.key, issue.rule), (keys::S3_BUCKET, RuleKind::Constraint));
    }

    #[test]
    fn test_error_display_lists_every_key() {
        let mut env = with(keys::PORT, "abc");
        env.insert(keys::NODE_ENV.into(), "staging".into());
        env.remove(keys::JWT_SECRET);

        let err = validate(&env).unwrap_err();
        let rendered = err.to_string();
        assert_eq!(err.len(), 3);
        for key in [keys::NODE_ENV, keys::PORT, keys::JWT_SECRET] {
            assert!(rendered.contains(key), "{}", rendered);
        }
        assert_eq!(err.issue_for(keys::JWT_SECRET).map(|i| i.rule), Some(RuleKind::Missing));
    }

    #[test]
    fn test_cors_origins_split() {
        let env = with(keys::CORS_ORIGINS, "https://app.example.com, ,http://localhost:5173");
        let config = validate(&env).unwrap();
        assert_eq!(
            config.cors_origins(),
            vec!["https://app.example.com".to_string(), "http://localhost:5173".to_string()]
        );
    }
}
