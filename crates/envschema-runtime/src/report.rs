//! Validation summaries.
//!
//! Reporting is observational: a [`ValidationReport`] is computed from a
//! result and never changes it.

use crate::env::EnvVars;
use crate::result::ValidationResult;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Schema variables present in the input
    pub read: Vec<String>,
    /// Variables that ended up with a value
    pub validated: Vec<String>,
    /// Schema variables absent from the input
    pub missing: Vec<String>,
    /// Input variables the schema does not mention
    pub extra: Vec<String>,
    /// `"<variable>: <message>"` per error
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Classify the schema's variables by what `inputs` and `result` say
    /// about them.
    pub fn new<'a>(
        schema_names: impl IntoIterator<Item = &'a str>,
        inputs: &EnvVars,
        result: &ValidationResult,
    ) -> Self {
        let names: Vec<&str> = schema_names.into_iter().collect();

        let (read, missing): (Vec<&str>, Vec<&str>) =
            names.iter().copied().partition(|name| inputs.contains_key(*name));

        let extra = inputs
            .keys()
            .filter(|key| !names.contains(&key.as_str()))
            .cloned()
            .collect();

        Self {
            read: read.into_iter().map(str::to_string).collect(),
            validated: result.values.keys().cloned().collect(),
            missing: missing.into_iter().map(str::to_string).collect(),
            extra,
            errors: result.error_lines(),
        }
    }

    /// True when the result carried no errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable summary; empty sections are left out.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.read.is_empty() {
            lines.push(format!("Read {} variables: {}", self.read.len(), self.read.join(", ")));
        }
        if !self.validated.is_empty() {
            lines.push(format!(
                "Validated {} variables: {}",
                self.validated.len(),
                self.validated.join(", ")
            ));
        }
        if !self.missing.is_empty() {
            lines.push(format!(
                "Missing {} variables from schema: {}",
                self.missing.len(),
                self.missing.join(", ")
            ));
        }
        if !self.errors.is_empty() {
            lines.push(format!("Validation failed with {} errors", self.errors.len()));
            lines.extend(self.errors.iter().map(|e| format!("  {}", e)));
        }

        lines
    }

    /// Emit the summary through `tracing`.
    pub fn log(&self) {
        if !self.read.is_empty() {
            info!("Read {} variables: {}", self.read.len(), self.read.join(", "));
        }
        if !self.validated.is_empty() {
            info!(
                "Validated {} variables: {}",
                self.validated.len(),
                self.validated.join(", ")
            );
        }
        if !self.missing.is_empty() {
            warn!(
                "Missing {} variables from schema: {}",
                self.missing.len(),
                self.missing.join(", ")
            );
        }
        if !self.errors.is_empty() {
            error!("Validation failed with {} errors", self.errors.len());
            for line in &self.errors {
                error!("  {}", line);
            }
        }
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.summary_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
