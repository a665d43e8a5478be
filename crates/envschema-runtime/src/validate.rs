//! Rule evaluation for environment variables.
//!
//! [`Evaluator`] walks a [`Schema`] in declaration order, coerces each raw
//! string to its declared type, applies defaults and checks constraints.
//! Every failing variable contributes an error; evaluation never stops at
//! the first one.
//!
//! # Example
//!
//! ```rust
//! use envschema_core::{FieldRule, FieldType, Schema};
//! use envschema_runtime::{validate_schema, EnvVars};
//!
//! let schema = Schema::new().with_field(
//!     "PORT",
//!     FieldRule::new(FieldType::Integer)
//!         .with_default(3000)
//!         .with_range(Some(1.0), Some(65535.0)),
//! );
//!
//! let result = validate_schema(&schema, &EnvVars::new());
//! assert!(result.valid);
//! assert_eq!(result.values["PORT"], 3000);
//! ```

use crate::env::EnvVars;
use crate::errors::ValidationError;
use crate::result::ValidationResult;
use envschema_core::{FieldRule, FieldType, Schema};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;

/// Compiled `pattern` constraints, keyed by source text.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Regex>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a pattern, reusing an earlier compilation of the same text.
    pub fn compile(&mut self, pattern: &str) -> Result<&Regex, regex::Error> {
        if !self.compiled.contains_key(pattern) {
            let re = Regex::new(pattern)?;
            self.compiled.insert(pattern.to_string(), re);
        }
        Ok(&self.compiled[pattern])
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Evaluates schemas against input sets.
#[derive(Debug, Default)]
pub struct Evaluator {
    patterns: PatternCache,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Validate every schema field against `inputs`.
    ///
    /// Inputs the schema does not name are never inspected.
    pub fn evaluate(&mut self, schema: &Schema, inputs: &EnvVars) -> ValidationResult {
        let mut values = Map::new();
        let mut errors = Vec::new();

        for (name, rule) in schema.iter() {
            let raw = inputs.get(name).map(String::as_str);
            match self.check_field(name, rule, raw) {
                Ok(Some(value)) => {
                    values.insert(name.to_string(), value);
                }
                Ok(None) => {}
                Err(error) => errors.push(error),
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            values,
            errors,
        }
    }

    /// Resolve one field to its typed value, `None` when it is optional,
    /// absent and has no default.
    fn check_field(
        &mut self,
        name: &str,
        rule: &FieldRule,
        raw: Option<&str>,
    ) -> Result<Option<Value>, ValidationError> {
        let Some(raw) = raw else {
            if rule.required {
                return Err(ValidationError::missing(name));
            }
            return match &rule.default {
                None => Ok(None),
                Some(default) => coerce_default(default, rule.field_type)
                    .map(Some)
                    .ok_or_else(|| {
                        ValidationError::invalid_default(name, rule.field_type, &default.to_string())
                    }),
            };
        };

        let value = coerce(raw, rule.field_type)
            .ok_or_else(|| ValidationError::invalid_type(name, rule.field_type, raw))?;
        self.check_constraints(name, rule, raw, &value)?;
        Ok(Some(value))
    }

    /// Length, then range, then pattern, then enum; stops at the first failure.
    fn check_constraints(
        &mut self,
        name: &str,
        rule: &FieldRule,
        raw: &str,
        value: &Value,
    ) -> Result<(), ValidationError> {
        if rule.field_type == FieldType::String {
            if let Some(min) = rule.min_length {
                validate_min_length(raw, min, name)?;
            }
            if let Some(max) = rule.max_length {
                validate_max_length(raw, max, name)?;
            }
        }

        if rule.field_type.is_numeric() {
            if let Some(min) = rule.min {
                match (value.as_i64(), integral_bound(min)) {
                    (Some(n), Some(bound)) => validate_minimum(n, bound, name)?,
                    _ => {
                        if let Some(number) = value.as_f64() {
                            validate_minimum(number, min, name)?;
                        }
                    }
                }
            }
            if let Some(max) = rule.max {
                match (value.as_i64(), integral_bound(max)) {
                    (Some(n), Some(bound)) => validate_maximum(n, bound, name)?,
                    _ => {
                        if let Some(number) = value.as_f64() {
                            validate_maximum(number, max, name)?;
                        }
                    }
                }
            }
        }

        if rule.field_type == FieldType::String {
            if let Some(pattern) = &rule.pattern {
                let re = self
                    .patterns
                    .compile(pattern)
                    .map_err(|e| ValidationError::invalid_pattern(name, pattern, &e.to_string()))?;
                validate_pattern(raw, re, pattern, name)?;
            }
        }

        if let Some(allowed) = &rule.allowed {
            validate_enum(value, allowed, rule.field_type, name)?;
        }

        Ok(())
    }
}

/// Validate `inputs` against `schema` with a fresh [`Evaluator`].
pub fn validate_schema(schema: &Schema, inputs: &EnvVars) -> ValidationResult {
    Evaluator::new().evaluate(schema, inputs)
}

// --- Coercion ---

/// Coerce a raw string to `field_type`.
///
/// Numbers and booleans ignore surrounding whitespace. Booleans accept
/// `true`/`false`/`1`/`0` in any case. Floats must be finite.
pub fn coerce(raw: &str, field_type: FieldType) -> Option<Value> {
    match field_type {
        FieldType::String => Some(Value::String(raw.to_string())),
        FieldType::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
        FieldType::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Number::from_f64)
            .map(Value::Number),
        FieldType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
    }
}

/// Coerce a schema literal (default or enum member) to `field_type`.
///
/// String literals go through [`coerce`]; other literals must already
/// have the declared type.
pub fn coerce_default(literal: &Value, field_type: FieldType) -> Option<Value> {
    match (literal, field_type) {
        (Value::String(s), _) => coerce(s, field_type),
        (Value::Number(n), FieldType::Integer) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(Value::from),
        (Value::Number(n), FieldType::Float) => {
            n.as_f64().and_then(Number::from_f64).map(Value::Number)
        }
        (Value::Bool(b), FieldType::Boolean) => Some(Value::Bool(*b)),
        _ => None,
    }
}

// --- Validation helper functions ---

/// Validate that a string meets minimum length (in characters).
pub fn validate_min_length(value: &str, min: usize, variable: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError::min_length(variable, min, len))
    } else {
        Ok(())
    }
}

/// Validate that a string meets maximum length (in characters).
pub fn validate_max_length(value: &str, max: usize, variable: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        Err(ValidationError::max_length(variable, max, len))
    } else {
        Ok(())
    }
}

/// Validate that a string matches a compiled pattern anywhere.
pub fn validate_pattern(
    value: &str,
    re: &Regex,
    pattern: &str,
    variable: &str,
) -> Result<(), ValidationError> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::pattern(variable, pattern, value))
    }
}

/// A whole-number bound as an `i64`, so integers beyond 2^53 compare exactly.
fn integral_bound(bound: f64) -> Option<i64> {
    // 2^63 itself does not fit; i64::MIN is exactly representable.
    let in_range = bound >= i64::MIN as f64 && bound < -(i64::MIN as f64);
    (bound.fract() == 0.0 && in_range).then_some(bound as i64)
}

/// Validate that a number meets minimum value (inclusive).
pub fn validate_minimum<T>(value: T, min: T, variable: &str) -> Result<(), ValidationError>
where
    T: PartialOrd + fmt::Display,
{
    if value < min {
        Err(ValidationError::minimum(variable, min, value))
    } else {
        Ok(())
    }
}

/// Validate that a number meets maximum value (inclusive).
pub fn validate_maximum<T>(value: T, max: T, variable: &str) -> Result<(), ValidationError>
where
    T: PartialOrd + fmt::Display,
{
    if value > max {
        Err(ValidationError::maximum(variable, max, value))
    } else {
        Ok(())
    }
}

/// Validate that a coerced value equals one of the allowed literals.
pub fn validate_enum(
    value: &Value,
    allowed: &[Value],
    field_type: FieldType,
    variable: &str,
) -> Result<(), ValidationError> {
    let matches = allowed
        .iter()
        .filter_map(|member| coerce_default(member, field_type))
        .any(|member| same_value(&member, value));

    if matches {
        Ok(())
    } else {
        let allowed: Vec<String> = allowed.iter().map(display_literal).collect();
        Err(ValidationError::invalid_enum(variable, &allowed, &display_literal(value)))
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn display_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
