//! envschema runtime
//!
//! Validates named string inputs (normally the process environment)
//! against a declarative schema and reports every problem in one pass.
//!
//! - **Evaluator**: type coercion, defaults and constraint checks
//! - **Rule engines**: the [`RuleEngine`] boundary, with the built-in
//!   [`NativeEngine`] and the Nickel-backed [`NickelEngine`]
//! - **Reporting**: read/validated/missing summaries through `tracing`
//! - **Facade**: [`EnvValidator`] with `validate`, `validate_or_error` and
//!   `load_schema`
//!
//! # Example
//!
//! ```rust
//! use envschema_runtime::{EnvValidator, EnvVars};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "ENVIRONMENT": {
//!         "type": "string",
//!         "required": true,
//!         "enum": ["development", "staging", "production"]
//!     }
//! });
//! let env: EnvVars = [("ENVIRONMENT".to_string(), "invalid".to_string())].into();
//!
//! let err = EnvValidator::new().validate_or_error(schema, Some(&env)).unwrap_err();
//! assert!(err.to_string().contains("ENVIRONMENT"));
//! ```

mod engine;
mod env;
mod errors;
mod loader;
mod nickel;
mod report;
mod result;
mod validate;
mod validator;

// Re-export public types
pub use engine::{NativeEngine, RuleEngine, SchemaArg};
pub use env::{env_from_structured, env_to_structured, process_env, EnvVars};
pub use errors::{EngineError, EnvSchemaError, ErrorKind, Result, ValidationError, ValidationErrors};
pub use loader::{engine_path, load_schema, read_json_schema, SchemaFileError, SchemaSource};
pub use nickel::{NickelEngine, NICKEL_BINARY_ENV};
pub use report::ValidationReport;
pub use result::{looks_like_validation_result, ValidationResult};
pub use validator::{validate_env, EngineKind, EnvValidator, ValidatorConfig};

// Validation helper functions
pub use validate::{
    coerce, coerce_default, validate_enum, validate_max_length, validate_maximum,
    validate_min_length, validate_minimum, validate_pattern, validate_schema, Evaluator,
    PatternCache,
};

// Schema model and marshalling
pub use envschema_core::{
    host_to_structured, structured_to_host, FieldRule, FieldType, Schema, StructuredValue,
    TableKey,
};
