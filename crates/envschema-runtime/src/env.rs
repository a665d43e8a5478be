//! Input sets: variable name to raw string value.

use envschema_core::{StructuredValue, Table, TableKey};
use std::collections::BTreeMap;

/// A set of raw inputs, usually a snapshot of the process environment.
pub type EnvVars = BTreeMap<String, String>;

/// Snapshot the current process environment.
///
/// Variables whose name or value is not valid Unicode are skipped.
pub fn process_env() -> EnvVars {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Encode inputs as an engine table keyed by variable name.
pub fn env_to_structured(vars: &EnvVars) -> StructuredValue {
    vars.iter()
        .map(|(k, v)| (TableKey::from(k.as_str()), StructuredValue::from(v.as_str())))
        .collect::<Table>()
        .into()
}

/// Read inputs back out of an engine table.
///
/// Entries are read directly rather than through host conversion, so an
/// input set is never mistaken for a sequence. Numbers and booleans are
/// taken in their string form; other values are skipped.
pub fn env_from_structured(value: &StructuredValue) -> EnvVars {
    let Some(table) = value.as_table() else {
        return EnvVars::new();
    };

    table
        .iter()
        .filter_map(|(key, value)| {
            let raw = match value {
                StructuredValue::String(s) => s.clone(),
                StructuredValue::Integer(_)
                | StructuredValue::Number(_)
                | StructuredValue::Boolean(_) => value.to_string(),
                _ => return None,
            };
            Some((key.to_string(), raw))
        })
        .collect()
}
