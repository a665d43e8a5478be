//! Library interface for the envschema CLI

use anyhow::{Context, Result};
use clap::ValueEnum;
use envschema_runtime::{
    process_env, EngineKind, EnvValidator, EnvVars, ValidationErrors,
    ValidationReport, ValidationResult, ValidatorConfig,
};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How `check` prints its outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Rule engine selected on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EngineChoice {
    #[default]
    Native,
    Nickel,
}

impl EngineChoice {
    pub fn into_kind(self, nickel_binary: Option<PathBuf>) -> EngineKind {
        match self {
            EngineChoice::Native => EngineKind::Native,
            EngineChoice::Nickel => EngineKind::NickelCli {
                binary: nickel_binary,
            },
        }
    }
}

/// Build a validator for the chosen engine.
pub fn build_validator(engine: EngineKind, report: bool) -> Result<EnvValidator> {
    EnvValidator::with_config(ValidatorConfig { engine, report })
        .context("Failed to initialise rule engine")
}

/// The process environment, overlaid with the entries of a dotenv file.
pub fn read_env(env_file: Option<&Path>) -> Result<EnvVars> {
    let mut vars = process_env();

    if let Some(path) = env_file {
        let entries = dotenvy::from_path_iter(path)
            .with_context(|| format!("Failed to read env file {}", path.display()))?;

        let mut loaded = 0;
        for entry in entries {
            let (key, value) =
                entry.with_context(|| format!("Failed to parse env file {}", path.display()))?;
            vars.insert(key, value);
            loaded += 1;
        }
        debug!("Loaded {} variables from {}", loaded, path.display());
    }

    Ok(vars)
}

/// Result of `envschema check`
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub result: ValidationResult,
    pub report: ValidationReport,
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        self.result.valid
    }

    /// Coerced values, or every error when validation failed.
    pub fn into_strict(self) -> std::result::Result<Map<String, Value>, ValidationErrors> {
        self.result.into_values()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&self.result).context("Failed to serialize result")
            }
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();

        for line in self.report.summary_lines() {
            let _ = writeln!(out, "{}", line);
        }

        if !self.result.values.is_empty() {
            let _ = writeln!(out, "Values:");
            for (name, value) in &self.result.values {
                let _ = writeln!(out, "  {} = {}", name, value);
            }
        }

        if self.is_valid() {
            let _ = writeln!(out, "✓ {} variables valid", self.result.values.len());
        } else {
            let _ = writeln!(out, "✗ {} errors", self.result.errors.len());
        }

        out
    }
}

/// Load `schema` and validate `env` against it.
pub fn check(validator: &EnvValidator, schema: &Path, env: &EnvVars) -> Result<CheckOutcome> {
    info!("Checking environment against {}", schema.display());

    let document = validator
        .load_schema(schema)
        .with_context(|| format!("Failed to load schema {}", schema.display()))?;
    let names: Vec<String> = document
        .as_object()
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default();

    let result = validator
        .validate(document, Some(env))
        .with_context(|| format!("Failed to validate against {}", schema.display()))?;
    let report = ValidationReport::new(names.iter().map(String::as_str), env, &result);

    Ok(CheckOutcome { result, report })
}

/// The resolved schema as pretty JSON.
pub fn show_schema(validator: &EnvValidator, schema: &Path) -> Result<String> {
    let document = validator
        .load_schema(schema)
        .with_context(|| format!("Failed to load schema {}", schema.display()))?;
    serde_json::to_string_pretty(&document).context("Failed to serialize schema")
}
