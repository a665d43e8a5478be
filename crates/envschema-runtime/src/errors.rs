//! Error types for envschema-runtime.
//!
//! Per-variable problems are [`ValidationError`] records that the engine
//! collects into a result; they are never raised on their own. Whole-call
//! failures are [`EnvSchemaError`], with [`EngineError`] for anything the
//! rule engine reports.

use envschema_core::{CoreError, FieldType};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Class of a per-variable validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required variable is absent from the input.
    MissingVariable,
    /// The raw value (or the default) could not be coerced to the declared type.
    InvalidType,
    /// A length, range, pattern or enum constraint failed.
    ConstraintViolation,
}

impl ErrorKind {
    /// Derive the kind from the rule name an engine reported.
    ///
    /// Engines may name a failed presence check `required` and a failed
    /// coercion `type`; both are read like their canonical names.
    pub fn from_rule(rule: Option<&str>) -> Self {
        match rule {
            Some("missing") | Some("required") => ErrorKind::MissingVariable,
            Some("invalid_type") | Some("type") | Some("default") => ErrorKind::InvalidType,
            _ => ErrorKind::ConstraintViolation,
        }
    }
}

/// A collection of validation errors, in schema declaration order.
///
/// Rendered as the aggregate failure message:
///
/// ```text
/// Environment variable validation failed:
/// API_KEY: length 5 is less than minimum 32
/// ENVIRONMENT: invalid value 'invalid', must be one of: development, staging, production
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// True when no variable failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed variables.
    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable validation failed:")?;
        for error in &self.errors {
            write!(f, "\n{}", error.line())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// A single validation failure for one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Name of the variable that failed.
    pub variable: String,

    /// Human-readable error message.
    #[serde(rename = "error")]
    pub message: String,

    /// The rule that was violated (if known).
    ///
    /// Examples:
    /// - `"missing"` - required variable absent
    /// - `"invalid_type"` - value could not be coerced
    /// - `"min_length"` - string too short
    /// - `"max"` - number too large
    /// - `"enum"` - value not in the allowed set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    pub kind: ErrorKind,

    /// The expected value or constraint (if applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// The actual value that failed validation (if applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ValidationError {
    /// Create a new validation error; the kind follows from the rule.
    pub fn new(variable: impl Into<String>, message: impl Into<String>, rule: Option<&str>) -> Self {
        Self {
            variable: variable.into(),
            message: message.into(),
            rule: rule.map(str::to_string),
            kind: ErrorKind::from_rule(rule),
            expected: None,
            actual: None,
        }
    }

    /// Set the expected value.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Set the actual value.
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// `"<variable>: <message>"`
    pub fn line(&self) -> String {
        format!("{}: {}", self.variable, self.message)
    }

    // --- Common error constructors ---

    /// A required variable is absent.
    pub fn missing(variable: impl Into<String>) -> Self {
        Self::new(variable, "required variable is missing", Some("missing"))
    }

    /// The raw value does not parse as the declared type.
    pub fn invalid_type(variable: impl Into<String>, expected: FieldType, raw: &str) -> Self {
        Self::new(
            variable,
            format!("expected {}, got \"{}\"", expected, raw),
            Some("invalid_type"),
        )
        .with_expected(expected.as_str())
        .with_actual(raw)
    }

    /// The schema default does not fit the declared type.
    pub fn invalid_default(variable: impl Into<String>, expected: FieldType, default: &str) -> Self {
        Self::new(
            variable,
            format!("default value {} is not a valid {}", default, expected),
            Some("default"),
        )
        .with_expected(expected.as_str())
        .with_actual(default)
    }

    /// Create an error for a string that is too short.
    pub fn min_length(variable: impl Into<String>, min: usize, actual: usize) -> Self {
        Self::new(
            variable,
            format!("length {} is less than minimum {}", actual, min),
            Some("min_length"),
        )
        .with_expected(format!(">= {}", min))
        .with_actual(actual.to_string())
    }

    /// Create an error for a string that is too long.
    pub fn max_length(variable: impl Into<String>, max: usize, actual: usize) -> Self {
        Self::new(
            variable,
            format!("length {} exceeds maximum {}", actual, max),
            Some("max_length"),
        )
        .with_expected(format!("<= {}", max))
        .with_actual(actual.to_string())
    }

    /// Create an error for a number below minimum.
    pub fn minimum(variable: impl Into<String>, min: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::new(
            variable,
            format!("value {} is less than minimum {}", actual, min),
            Some("min"),
        )
        .with_expected(format!(">= {}", min))
        .with_actual(actual.to_string())
    }

    /// Create an error for a number above maximum.
    pub fn maximum(variable: impl Into<String>, max: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::new(
            variable,
            format!("value {} exceeds maximum {}", actual, max),
            Some("max"),
        )
        .with_expected(format!("<= {}", max))
        .with_actual(actual.to_string())
    }

    /// Create an error for a pattern mismatch.
    pub fn pattern(variable: impl Into<String>, pattern: &str, value: &str) -> Self {
        Self::new(
            variable,
            format!("value does not match pattern {}", pattern),
            Some("pattern"),
        )
        .with_expected(pattern)
        .with_actual(value)
    }

    /// The schema's pattern is not a valid regular expression.
    pub fn invalid_pattern(variable: impl Into<String>, pattern: &str, reason: &str) -> Self {
        Self::new(
            variable,
            format!("invalid pattern '{}': {}", pattern, reason),
            Some("pattern"),
        )
        .with_expected(pattern)
    }

    /// Create an error for an invalid enum value.
    pub fn invalid_enum(variable: impl Into<String>, allowed: &[String], actual: &str) -> Self {
        Self::new(
            variable,
            format!(
                "invalid value '{}', must be one of: {}",
                actual,
                allowed.join(", ")
            ),
            Some("enum"),
        )
        .with_expected(allowed.join(" | "))
        .with_actual(actual)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variable, self.message)?;

        if let Some(rule) = &self.rule {
            write!(f, " [{}]", rule)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Failures reported by a rule engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] CoreError),

    #[error("Failed to load schema from {path}: {message}")]
    Load { path: String, message: String },

    #[error("Rule engine unavailable: {0}")]
    Unavailable(String),

    #[error("Rule engine returned a malformed result: {0}")]
    MalformedResult(String),

    #[error("Rule engine error: {0}")]
    Other(String),
}

/// Errors returned by [`EnvValidator`](crate::EnvValidator).
#[derive(Error, Debug)]
pub enum EnvSchemaError {
    /// The schema could not be read, parsed, or loaded by the engine.
    #[error("Failed to load schema from {source_name}: {cause}")]
    SchemaLoad {
        source_name: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Raised by strict validation; wraps every collected error.
    #[error(transparent)]
    ValidationFailed(#[from] ValidationErrors),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl EnvSchemaError {
    /// A [`EnvSchemaError::SchemaLoad`] for the schema named `source_name`.
    pub fn schema_load(
        source_name: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EnvSchemaError::SchemaLoad {
            source_name: source_name.into(),
            cause: cause.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnvSchemaError>;
