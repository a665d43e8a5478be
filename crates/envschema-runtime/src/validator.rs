//! The public entry point.
//!
//! [`EnvValidator`] owns a rule engine and sequences each call:
//! resolve the schema, marshal schema and inputs into engine values,
//! evaluate, marshal the result back, and log a summary.

use crate::engine::{NativeEngine, RuleEngine};
use crate::env::{env_to_structured, process_env, EnvVars};
use crate::errors::{EngineError, Result};
use crate::loader::{self, SchemaSource};
use crate::nickel::NickelEngine;
use crate::report::ValidationReport;
use crate::result::ValidationResult;
use envschema_core::structured_to_host;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Which rule engine an [`EnvValidator`] drives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EngineKind {
    /// The built-in engine (JSON and YAML schemas).
    #[default]
    Native,
    /// The built-in engine plus `.ncl` schemas through the `nickel` CLI.
    /// Without an explicit binary, `nickel` is looked up on `PATH`.
    NickelCli { binary: Option<PathBuf> },
}

/// Configuration for an [`EnvValidator`].
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub engine: EngineKind,
    /// Whether each `validate` call logs a summary.
    pub report: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Native,
            report: true,
        }
    }
}

impl ValidatorConfig {
    /// Build the configured engine.
    pub fn build_engine(&self) -> std::result::Result<Box<dyn RuleEngine>, EngineError> {
        Ok(match &self.engine {
            EngineKind::Native => Box::new(NativeEngine::new()),
            EngineKind::NickelCli { binary: Some(binary) } => Box::new(NickelEngine::new(binary)),
            EngineKind::NickelCli { binary: None } => Box::new(NickelEngine::discover()?),
        })
    }
}

/// Validates environment variables against schemas.
///
/// The engine is held behind a lock, so one validator can be shared across
/// threads; calls on the same validator run one at a time.
///
/// # Example
///
/// ```rust
/// use envschema_runtime::{EnvValidator, EnvVars};
/// use serde_json::json;
///
/// let validator = EnvValidator::new();
/// let schema = json!({
///     "PORT": {"type": "integer", "min": 1, "max": 65535, "default": 3000}
/// });
///
/// let result = validator.validate(schema, Some(&EnvVars::new())).unwrap();
/// assert!(result.valid);
/// assert_eq!(result.values["PORT"], 3000);
/// ```
pub struct EnvValidator {
    engine: Mutex<Box<dyn RuleEngine>>,
    config: ValidatorConfig,
}

impl fmt::Debug for EnvValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvValidator")
            .field("engine", &self.lock_engine().name())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for EnvValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvValidator {
    /// A validator using the built-in engine.
    pub fn new() -> Self {
        Self::with_engine(NativeEngine::new())
    }

    /// A validator driving a caller-supplied engine.
    pub fn with_engine(engine: impl RuleEngine + 'static) -> Self {
        Self {
            engine: Mutex::new(Box::new(engine)),
            config: ValidatorConfig::default(),
        }
    }

    /// A validator built from configuration.
    pub fn with_config(config: ValidatorConfig) -> std::result::Result<Self, EngineError> {
        let engine = config.build_engine()?;
        Ok(Self {
            engine: Mutex::new(engine),
            config,
        })
    }

    /// Turn per-call summary logging on or off.
    pub fn with_report(mut self, report: bool) -> Self {
        self.config.report = report;
        self
    }

    /// The configuration this validator was built with.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Name of the engine behind the lock, e.g. `"native"` or `"nickel"`.
    pub fn engine_name(&self) -> String {
        self.lock_engine().name().to_string()
    }

    // The engine holds no invariants a panicking call could break.
    fn lock_engine(&self) -> MutexGuard<'_, Box<dyn RuleEngine>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate `env` (or the process environment) against `schema`.
    ///
    /// Per-variable failures are collected into the returned result.
    /// Errors are returned only when the schema cannot be loaded or the
    /// engine fails.
    pub fn validate(
        &self,
        schema: impl Into<SchemaSource>,
        env: Option<&EnvVars>,
    ) -> Result<ValidationResult> {
        self.evaluate(schema.into(), env).map(|(result, _)| result)
    }

    /// Validate and return the coerced values, failing with every error at once.
    ///
    /// The values are normally a mapping. An engine that reports a bare value
    /// for a degenerate schema gets that value back, marshalled like any other.
    pub fn validate_or_error(
        &self,
        schema: impl Into<SchemaSource>,
        env: Option<&EnvVars>,
    ) -> Result<Value> {
        let (result, host) = self.evaluate(schema.into(), env)?;
        let bare = match host.get("values") {
            None | Some(Value::Null) | Some(Value::Object(_)) | Some(Value::Array(_)) => None,
            Some(other) => Some(other.clone()),
        };

        let values = result.into_values()?;
        Ok(bare.unwrap_or(Value::Object(values)))
    }

    /// Run the engine and decode its result, keeping the host form as well.
    fn evaluate(&self, source: SchemaSource, env: Option<&EnvVars>) -> Result<(ValidationResult, Value)> {
        let owned_env;
        let env = match env {
            Some(env) => env,
            None => {
                owned_env = process_env();
                &owned_env
            }
        };

        let resolved = loader::resolve_for_validation(&source)?;
        let raw = {
            let mut engine = self.lock_engine();
            debug!(engine = engine.name(), schema = %source, "validating");
            engine
                .validate(resolved.arg, env_to_structured(env))
                .map_err(|e| loader::validation_error(&source, e))?
        };

        let host = structured_to_host(&raw);
        let result = ValidationResult::from_host(&host)?;

        if self.config.report {
            // Without an up-front schema, names come from what the engine reported.
            let names = resolved.names.unwrap_or_else(|| reported_names(&result));
            ValidationReport::new(names.iter().map(String::as_str), env, &result).log();
        }

        Ok((result, host))
    }

    /// Resolve a schema to a host mapping without validating anything.
    pub fn load_schema(&self, source: impl Into<SchemaSource>) -> Result<Value> {
        let source = source.into();
        let mut engine = self.lock_engine();
        loader::load_schema(&mut **engine, &source)
    }
}

fn reported_names(result: &ValidationResult) -> Vec<String> {
    let mut names: Vec<String> = result.values.keys().cloned().collect();
    for error in &result.errors {
        if !names.contains(&error.variable) {
            names.push(error.variable.clone());
        }
    }
    names
}

/// Validate with a default [`EnvValidator`].
pub fn validate_env(
    schema: impl Into<SchemaSource>,
    env: Option<&EnvVars>,
) -> Result<ValidationResult> {
    EnvValidator::new().validate(schema, env)
}
