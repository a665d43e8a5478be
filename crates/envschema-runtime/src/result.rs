//! The outcome of a validation call and its engine-side encoding.
//!
//! Engines return results as a structured table:
//!
//! ```text
//! { valid = <bool>,
//!   values = { NAME = <typed value>, ... },
//!   errors = { { variable = "NAME", error = "<message>", rule = "<rule>" }, ... } }
//! ```

use crate::errors::{EngineError, ValidationError, ValidationErrors};
use envschema_core::{host_to_structured, StructuredValue, Table};
use serde::Serialize;
use serde_json::{Map, Value};

/// Result of validating one input set against one schema.
///
/// Holds no reference to the schema or inputs it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// `true` iff `errors` is empty.
    pub valid: bool,
    /// Coerced values for every field that passed or received a default.
    pub values: Map<String, Value>,
    /// Every failure, in schema declaration order.
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// `"<variable>: <message>"` for each error.
    pub fn error_lines(&self) -> Vec<String> {
        self.errors.iter().map(ValidationError::line).collect()
    }

    /// Turn the result into the strict-mode outcome.
    pub fn into_values(self) -> Result<Map<String, Value>, ValidationErrors> {
        if self.valid {
            Ok(self.values)
        } else {
            Err(ValidationErrors::from(self.errors))
        }
    }

    /// Encode as the engine result table.
    pub fn to_structured(&self) -> StructuredValue {
        let mut table = Table::new();
        table.set("valid", StructuredValue::Boolean(self.valid));
        table.set("values", host_to_structured(&Value::Object(self.values.clone())));
        table.set(
            "errors",
            StructuredValue::Table(Table::sequence(self.errors.iter().map(error_to_structured))),
        );
        table.into()
    }

    /// Decode an engine result that has already been converted to a host value.
    pub fn from_host(value: &Value) -> Result<Self, EngineError> {
        if !looks_like_validation_result(value) {
            return Err(EngineError::MalformedResult(format!(
                "expected a table with 'valid', 'values' and 'errors', got {}",
                truncate(&value.to_string(), 120)
            )));
        }

        let valid = value["valid"].as_bool().unwrap_or(false);
        let values = values_from_host(value.get("values"));
        let errors: Vec<ValidationError> = match value.get("errors") {
            Some(Value::Array(items)) => items.iter().map(error_from_host).collect(),
            _ => Vec::new(),
        };

        // An engine claiming success while reporting errors is not trusted.
        Ok(Self {
            valid: valid && errors.is_empty(),
            values,
            errors,
        })
    }
}

/// Whether a host value has the shape of an engine validation result.
///
/// Requires a mapping with a boolean `valid`. `values` may hold anything;
/// a bare value there is kept for the strict entry point. `errors` may be
/// absent, a sequence, or an empty mapping (an empty engine table reads
/// back as an empty mapping).
pub fn looks_like_validation_result(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };

    let valid = matches!(map.get("valid"), Some(Value::Bool(_)));
    let errors = match map.get("errors") {
        None | Some(Value::Null) | Some(Value::Array(_)) => true,
        Some(Value::Object(m)) => m.is_empty(),
        Some(_) => false,
    };

    valid && errors
}

fn values_from_host(values: Option<&Value>) -> Map<String, Value> {
    match values {
        Some(Value::Object(map)) => map.clone(),
        // Variables named "1".."N" come back as a sequence; restore the names.
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v.clone()))
            .collect(),
        _ => Map::new(),
    }
}

fn error_to_structured(error: &ValidationError) -> StructuredValue {
    let mut table = Table::new();
    table.set("variable", StructuredValue::from(error.variable.as_str()));
    table.set("error", StructuredValue::from(error.message.as_str()));
    if let Some(rule) = &error.rule {
        table.set("rule", StructuredValue::from(rule.as_str()));
    }
    if let Some(expected) = &error.expected {
        table.set("expected", StructuredValue::from(expected.as_str()));
    }
    if let Some(actual) = &error.actual {
        table.set("actual", StructuredValue::from(actual.as_str()));
    }
    table.into()
}

fn error_from_host(entry: &Value) -> ValidationError {
    let Some(map) = entry.as_object() else {
        let message = match entry {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return ValidationError::new("unknown", message, None);
    };

    let text = |key: &str| map.get(key).and_then(Value::as_str);

    let mut error = ValidationError::new(
        text("variable").unwrap_or("unknown"),
        text("error").unwrap_or("unknown error"),
        text("rule"),
    );
    error.expected = text("expected").map(str::to_string);
    error.actual = text("actual").map(str::to_string);
    error
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}
