//! Core schema model and value marshalling for envschema
//!
//! - [`value`]: the [`StructuredValue`] representation exchanged with rule
//!   engines, and conversion to and from host values (`serde_json::Value`)
//! - [`schema`]: the declarative [`Schema`] of environment variables

pub mod error;
pub mod schema;
pub mod value;

pub use error::CoreError;
pub use schema::{FieldRule, FieldType, Schema};
pub use value::{host_to_structured, structured_to_host, Shape, StructuredValue, Table, TableKey};
