//! Rule engines.
//!
//! An engine is consumed through exactly two calls, both speaking
//! [`StructuredValue`]s:
//!
//! - `validate(schema_or_path, env) -> result`
//! - `load_schema(path) -> schema`
//!
//! Engines may hold state (compiled patterns, interpreter handles) and take
//! `&mut self`; callers sharing one engine must serialise access.

use crate::env::env_from_structured;
use crate::errors::EngineError;
use crate::validate::Evaluator;
use envschema_core::{host_to_structured, structured_to_host, Schema, StructuredValue};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// The schema argument of [`RuleEngine::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaArg {
    /// A schema already marshalled into a table.
    Table(StructuredValue),
    /// A path for the engine to load on its own.
    Path(String),
}

/// A rule engine that evaluates schemas against inputs.
pub trait RuleEngine: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Validate `env` (a table of raw strings) against `schema`.
    ///
    /// Returns the result table described in [`crate::result`].
    fn validate(&mut self, schema: SchemaArg, env: StructuredValue)
        -> Result<StructuredValue, EngineError>;

    /// Load a schema document into a table.
    fn load_schema(&mut self, path: &str) -> Result<StructuredValue, EngineError>;
}

/// The built-in engine.
///
/// Loads JSON and YAML schema documents and evaluates rules with an
/// [`Evaluator`] whose compiled patterns persist across calls.
#[derive(Debug, Default)]
pub struct NativeEngine {
    evaluator: Evaluator,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a schema table against an input table.
    pub fn evaluate_table(
        &mut self,
        schema: &StructuredValue,
        env: &StructuredValue,
    ) -> Result<StructuredValue, EngineError> {
        let schema = Schema::from_host(&structured_to_host(schema))?;
        let inputs = env_from_structured(env);

        debug!(
            fields = schema.len(),
            inputs = inputs.len(),
            "evaluating schema"
        );

        Ok(self.evaluator.evaluate(&schema, &inputs).to_structured())
    }
}

impl RuleEngine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    fn validate(
        &mut self,
        schema: SchemaArg,
        env: StructuredValue,
    ) -> Result<StructuredValue, EngineError> {
        let schema = match schema {
            SchemaArg::Table(table) => table,
            SchemaArg::Path(path) => self.load_schema(&path)?,
        };
        self.evaluate_table(&schema, &env)
    }

    fn load_schema(&mut self, path: &str) -> Result<StructuredValue, EngineError> {
        let load_error = |message: String| EngineError::Load {
            path: path.to_string(),
            message,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let document = parse_document(Path::new(path), &contents).map_err(load_error)?;

        if !document.is_object() {
            return Err(load_error("schema document is not a mapping".to_string()));
        }

        Ok(host_to_structured(&document))
    }
}

/// Parse a schema document by extension; unknown extensions try JSON, then YAML.
fn parse_document(path: &Path, contents: &str) -> Result<Value, String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => serde_json::from_str(contents).map_err(|e| e.to_string()),
        Some("yaml") | Some("yml") => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        _ => serde_json::from_str(contents).or_else(|json_err| {
            serde_yaml::from_str(contents)
                .map_err(|yaml_err| format!("not JSON ({}) or YAML ({})", json_err, yaml_err))
        }),
    }
}
