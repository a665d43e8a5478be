//! Nickel schema loading.
//!
//! [`NickelEngine`] lets a schema be written as a Nickel program
//! (`schema.ncl`) so it can share contracts and defaults with the rest of a
//! configuration tree. The program is exported to JSON by the `nickel` CLI;
//! rule evaluation itself is delegated to a [`NativeEngine`].
//!
//! The CLI is used rather than `nickel-lang-core` because the library API
//! changes between releases.
//!
//! # Example
//!
//! ```rust,ignore
//! use envschema_runtime::{EnvValidator, NickelEngine};
//!
//! let engine = NickelEngine::discover()?.with_import_path("./schemas");
//! let validator = EnvValidator::with_engine(engine);
//! let values = validator.validate_or_error("schemas/service.ncl", None)?;
//! ```

use crate::engine::{NativeEngine, RuleEngine, SchemaArg};
use crate::errors::EngineError;
use envschema_core::{host_to_structured, StructuredValue};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Environment variable naming an explicit `nickel` binary.
pub const NICKEL_BINARY_ENV: &str = "ENVSCHEMA_NICKEL";

/// Engine that loads `.ncl` schemas through the `nickel` CLI.
#[derive(Debug)]
pub struct NickelEngine {
    /// Path to the `nickel` executable
    binary: PathBuf,
    /// Extra directories for `import` resolution
    import_paths: Vec<PathBuf>,
    inner: NativeEngine,
}

impl NickelEngine {
    /// Use a specific `nickel` binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            import_paths: Vec::new(),
            inner: NativeEngine::new(),
        }
    }

    /// Locate `nickel` via `ENVSCHEMA_NICKEL`, then `PATH`.
    pub fn discover() -> Result<Self, EngineError> {
        Ok(Self::new(find_nickel_binary()?))
    }

    /// Add a directory to `NICKEL_IMPORT_PATH` for every export.
    pub fn with_import_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.import_paths.push(path.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Evaluate a Nickel file and return its JSON export.
    fn export_json(&self, path: &str) -> Result<Value, EngineError> {
        let load_error = |message: String| EngineError::Load {
            path: path.to_string(),
            message,
        };

        let mut cmd = Command::new(&self.binary);
        if !self.import_paths.is_empty() {
            let joined = std::env::join_paths(&self.import_paths)
                .map_err(|e| load_error(e.to_string()))?;
            cmd.env("NICKEL_IMPORT_PATH", joined);
        }

        debug!(binary = %self.binary.display(), path, "running nickel export");
        let output = cmd
            .arg("export")
            .arg("--format")
            .arg("json")
            .arg(path)
            .output()
            .map_err(|e| {
                EngineError::Unavailable(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(load_error(stderr.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| load_error(format!("nickel produced invalid JSON: {}", e)))
    }
}

fn is_nickel_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ncl"))
}

impl RuleEngine for NickelEngine {
    fn name(&self) -> &str {
        "nickel"
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
        self.inner.evaluate_table(&schema, &env)
    }

    fn load_schema(&mut self, path: &str) -> Result<StructuredValue, EngineError> {
        if !is_nickel_file(path) {
            return self.inner.load_schema(path);
        }

        let document = self.export_json(path)?;
        if !document.is_object() {
            return Err(EngineError::Load {
                path: path.to_string(),
                message: "nickel export is not a record".to_string(),
            });
        }
        Ok(host_to_structured(&document))
    }
}

/// Find the nickel binary to use
fn find_nickel_binary() -> Result<PathBuf, EngineError> {
    if let Some(explicit) = std::env::var_os(NICKEL_BINARY_ENV) {
        let path = PathBuf::from(explicit);
        info!("Using Nickel binary from {}: {}", NICKEL_BINARY_ENV, path.display());
        return Ok(path);
    }

    match which::which("nickel") {
        Ok(path) => {
            info!("Using system Nickel binary from {}", path.display());
            Ok(path)
        }
        Err(_) => Err(EngineError::Unavailable(
            "Nickel binary not found. Install nickel (cargo install nickel-lang-cli) \
             or set ENVSCHEMA_NICKEL"
                .to_string(),
        )),
    }
}
