//! Schema resolution.
//!
//! A schema arrives either inline as a host mapping or as a path. Paths are
//! first read as JSON documents; anything that is not readable JSON is
//! handed to the rule engine's own loader (YAML, Nickel, ...).

use crate::engine::{RuleEngine, SchemaArg};
use crate::errors::{EngineError, EnvSchemaError};
use envschema_core::{host_to_structured, structured_to_host, Schema};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Where a schema comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// A host mapping of variable name to rule.
    Inline(Value),
    /// A schema document on disk.
    Path(PathBuf),
}

impl SchemaSource {
    /// Name used in errors and logs.
    pub fn describe(&self) -> String {
        match self {
            SchemaSource::Inline(_) => "<inline schema>".to_string(),
            SchemaSource::Path(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<Value> for SchemaSource {
    fn from(value: Value) -> Self {
        SchemaSource::Inline(value)
    }
}

impl From<&Schema> for SchemaSource {
    fn from(schema: &Schema) -> Self {
        SchemaSource::Inline(schema.to_host())
    }
}

impl From<Schema> for SchemaSource {
    fn from(schema: Schema) -> Self {
        SchemaSource::from(&schema)
    }
}

impl From<&str> for SchemaSource {
    fn from(path: &str) -> Self {
        SchemaSource::Path(PathBuf::from(path))
    }
}

impl From<String> for SchemaSource {
    fn from(path: String) -> Self {
        SchemaSource::Path(PathBuf::from(path))
    }
}

impl From<&Path> for SchemaSource {
    fn from(path: &Path) -> Self {
        SchemaSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for SchemaSource {
    fn from(path: PathBuf) -> Self {
        SchemaSource::Path(path)
    }
}

/// Why a path could not be used as a JSON schema document.
#[derive(Error, Debug)]
pub enum SchemaFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not a mapping")]
    NotAMapping,
}

/// Read a JSON schema document.
pub fn read_json_schema(path: &Path) -> Result<Value, SchemaFileError> {
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(SchemaFileError::NotAMapping)
    }
}

/// Path string handed to engines; separators are normalised to `/`.
pub fn engine_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve `source` to a host mapping.
///
/// Inline mappings are returned unchanged. Paths are read as JSON, falling
/// back to the engine loader. Every failure is a
/// [`EnvSchemaError::SchemaLoad`] naming the source.
pub fn load_schema(engine: &mut dyn RuleEngine, source: &SchemaSource) -> Result<Value, EnvSchemaError> {
    match source {
        SchemaSource::Inline(value) if value.is_object() => Ok(value.clone()),
        SchemaSource::Inline(_) => Err(EnvSchemaError::schema_load(
            source.describe(),
            SchemaFileError::NotAMapping,
        )),
        SchemaSource::Path(path) => match read_json_schema(path) {
            Ok(value) => Ok(value),
            Err(json_err) => {
                debug!(
                    path = %path.display(),
                    engine = engine.name(),
                    "not a JSON schema ({}), using engine loader",
                    json_err
                );
                let schema = engine
                    .load_schema(&engine_path(path))
                    .map_err(|e| EnvSchemaError::schema_load(source.describe(), e))?;
                Ok(structured_to_host(&schema))
            }
        },
    }
}

/// Schema argument for a validation call, plus the declared names when
/// they are known up front.
#[derive(Debug)]
pub(crate) struct ResolvedSchema {
    pub arg: SchemaArg,
    pub names: Option<Vec<String>>,
}

/// Prepare `source` for [`RuleEngine::validate`].
///
/// Paths that are not JSON are passed to the engine unresolved. An inline
/// schema that is not a mapping fails the same way [`load_schema`] does.
pub(crate) fn resolve_for_validation(source: &SchemaSource) -> Result<ResolvedSchema, EnvSchemaError> {
    match source {
        SchemaSource::Inline(value) if value.is_object() => Ok(resolved_table(value)),
        SchemaSource::Inline(_) => Err(EnvSchemaError::schema_load(
            source.describe(),
            SchemaFileError::NotAMapping,
        )),
        SchemaSource::Path(path) => match read_json_schema(path) {
            Ok(value) => Ok(resolved_table(&value)),
            Err(json_err) => {
                debug!(path = %path.display(), "deferring schema load to engine ({})", json_err);
                Ok(ResolvedSchema {
                    arg: SchemaArg::Path(engine_path(path)),
                    names: None,
                })
            }
        },
    }
}

fn resolved_table(value: &Value) -> ResolvedSchema {
    ResolvedSchema {
        arg: SchemaArg::Table(host_to_structured(value)),
        names: value.as_object().map(|m| m.keys().cloned().collect()),
    }
}

/// Map an engine failure during validation to the facade error.
///
/// Load failures for a deferred path are schema load errors.
pub(crate) fn validation_error(source: &SchemaSource, error: EngineError) -> EnvSchemaError {
    match error {
        EngineError::Load { .. } if matches!(source, SchemaSource::Path(_)) => {
            EnvSchemaError::schema_load(source.describe(), error)
        }
        other => EnvSchemaError::Engine(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_inline_is_returned_unchanged() {
        let schema = json!({"B": {"type": "integer"}, "A": {}});
        let loaded = load_schema(&mut NativeEngine::new(), &schema.clone().into()).unwrap();
        assert_eq!(loaded, schema);
    }

    #[test]
    fn test_inline_non_mapping_is_rejected() {
        let err = load_schema(&mut NativeEngine::new(), &json!(["PORT"]).into()).unwrap_err();
        assert!(matches!(err, EnvSchemaError::SchemaLoad { .. }));
    }

    #[test]
    fn test_json_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, r#"{"PORT": {"type": "integer"}}"#).unwrap();

        let loaded = load_schema(&mut NativeEngine::new(), &path.as_path().into()).unwrap();
        assert_eq!(loaded, json!({"PORT": {"type": "integer"}}));
    }

    #[test]
    fn test_yaml_path_uses_engine_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yml");
        fs::write(&path, "DEBUG:\n  type: boolean\n  default: false\n").unwrap();

        let loaded = load_schema(&mut NativeEngine::new(), &path.clone().into()).unwrap();
        assert_eq!(loaded, json!({"DEBUG": {"type": "boolean", "default": false}}));
    }

    #[test]
    fn test_missing_path_names_source() {
        let err = load_schema(&mut NativeEngine::new(), &"/nonexistent/schema.json".into()).unwrap_err();
        match err {
            EnvSchemaError::SchemaLoad { source_name, .. } => {
                assert_eq!(source_name, "/nonexistent/schema.json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_engine_path_normalises_separators() {
        assert_eq!(engine_path(Path::new(r"conf\schema.yaml")), "conf/schema.yaml");
    }

    #[test]
    fn test_resolve_for_validation() {
        let resolved = resolve_for_validation(&json!({"Z": {}, "A": {}}).into()).unwrap();
        assert_eq!(resolved.names, Some(vec!["Z".to_string(), "A".to_string()]));
        assert!(matches!(resolved.arg, SchemaArg::Table(_)));

        let resolved = resolve_for_validation(&"/nonexistent/schema.yaml".into()).unwrap();
        assert_eq!(resolved.names, None);
        assert_eq!(resolved.arg, SchemaArg::Path("/nonexistent/schema.yaml".to_string()));
    }

    #[test]
    fn test_resolve_inline_non_mapping_matches_load_schema() {
        let source: SchemaSource = json!(["PORT"]).into();
        let err = resolve_for_validation(&source).unwrap_err();
        match err {
            EnvSchemaError::SchemaLoad { source_name, cause } => {
                assert_eq!(source_name, "<inline schema>");
                assert_eq!(cause.to_string(), "document is not a mapping");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
