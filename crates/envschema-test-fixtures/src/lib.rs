//! Test fixtures for envschema
//!
//! Provides representative schemas and input sets, plus a temp directory
//! helper that writes them to disk in each supported format.

use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Schema document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Json,
    Yaml,
    /// Malformed JSON with a `.json` extension
    BrokenJson,
    /// Valid JSON that is not a mapping
    NotAMapping,
}

/// Writes fixture schemas into a temporary directory that lives as long
/// as this value.
pub struct TestFixtures {
    temp_dir: tempfile::TempDir,
}

impl TestFixtures {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `schema` under `name` in the given format and return its path.
    pub fn write_schema(
        &self,
        name: &str,
        schema: &serde_json::Value,
        format: FixtureFormat,
    ) -> std::io::Result<PathBuf> {
        let (file_name, contents) = match format {
            FixtureFormat::Json => (format!("{name}.json"), pretty_json(schema)),
            FixtureFormat::Yaml => (
                format!("{name}.yaml"),
                serde_yaml::to_string(schema).map_err(std::io::Error::other)?,
            ),
            FixtureFormat::BrokenJson => (format!("{name}.json"), "{\"PORT\": {\"type\":".to_string()),
            FixtureFormat::NotAMapping => (format!("{name}.json"), "[\"PORT\", \"API_KEY\"]".to_string()),
        };

        let path = self.root().join(file_name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

fn pretty_json(value: &serde_json::Value) -> String {
    // Values built from `json!` always serialize.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The service schema used across the test suites: a secret key, a debug
/// flag, a bounded port with a default, and an enumerated environment.
pub fn app_schema() -> serde_json::Value {
    json!({
        "API_KEY": {
            "type": "string",
            "required": true,
            "min_length": 32,
            "pattern": "^[A-Za-z0-9]+$",
            "description": "Secret API key"
        },
        "DEBUG": {
            "type": "boolean",
            "required": false,
            "default": false,
            "description": "Enable debug mode"
        },
        "PORT": {
            "type": "integer",
            "required": false,
            "default": 3000,
            "min": 1,
            "max": 65535,
            "description": "Server port"
        },
        "ENVIRONMENT": {
            "type": "string",
            "required": true,
            "enum": ["development", "staging", "production"],
            "description": "Execution environment"
        }
    })
}

/// A larger deployment schema covering every rule kind.
pub fn deployment_schema() -> serde_json::Value {
    json!({
        "DATABASE_URL": {
            "type": "string",
            "required": true,
            "pattern": "^(postgres|https?)://",
            "description": "Primary database connection string"
        },
        "API_PORT": {"type": "integer", "required": true, "min": 1024, "max": 65535},
        "NODE_ENV": {"type": "string", "required": true, "enum": ["development", "test", "production"]},
        "LOG_LEVEL": {"type": "string", "default": "info", "enum": ["debug", "info", "warn", "error"]},
        "ENABLE_CACHE": {"type": "boolean", "default": true},
        "MAX_CONNECTIONS": {"type": "integer", "default": 10, "min": 1, "max": 1000},
        "CACHE_RATIO": {"type": "float", "min": 0.0, "max": 1.0},
        "ADMIN_EMAIL": {
            "type": "string",
            "pattern": "^[^@\\s]+@[^@\\s]+\\.[a-z]{2,}$",
            "max_length": 254
        },
        "API_KEY": {"type": "string", "required": true, "min_length": 32, "max_length": 64}
    })
}

/// Inputs that satisfy [`app_schema`].
pub fn valid_app_env() -> BTreeMap<String, String> {
    env(&[
        ("API_KEY", "ABCD1234EFGH5678IJKL9012MNOP3456"),
        ("DEBUG", "true"),
        ("PORT", "8080"),
        ("ENVIRONMENT", "production"),
    ])
}

/// Inputs that break three of [`app_schema`]'s fields.
pub fn invalid_app_env() -> BTreeMap<String, String> {
    env(&[("API_KEY", "short"), ("PORT", "99999"), ("ENVIRONMENT", "invalid")])
}

/// Inputs that satisfy [`deployment_schema`].
pub fn valid_deployment_env() -> BTreeMap<String, String> {
    env(&[
        ("DATABASE_URL", "https://db.example.com"),
        ("API_PORT", "8080"),
        ("NODE_ENV", "production"),
        ("LOG_LEVEL", "info"),
        ("ENABLE_CACHE", "true"),
        ("MAX_CONNECTIONS", "50"),
        ("ADMIN_EMAIL", "admin@example.com"),
        ("API_KEY", "ABCD1234EFGH5678IJKL9012MNOP3456"),
    ])
}

pub fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
