//! Structured values exchanged with rule engines.
//!
//! Rule engines speak a table-based value model: a single [`Table`] type
//! serves as both array and record, the way a scripting runtime's native
//! table does. Host code uses `serde_json::Value`. This module converts
//! between the two.
//!
//! # Sequence detection
//!
//! Converting a table back to a host value has to decide whether it is a
//! sequence or a mapping:
//!
//! 1. An empty table becomes an empty mapping.
//! 2. A table whose keys are all integers forming the run `1..=N`
//!    becomes a sequence ordered by key.
//! 3. Anything else becomes a mapping keyed by the string form of each key.
//! 4. Opaque foreign values become their string representation.
//!
//! # Lossy edge cases
//!
//! The two conversions are not exact inverses:
//!
//! - an empty host sequence comes back as an empty mapping;
//! - a host mapping whose keys are exactly `"1"..="N"` comes back as a
//!   sequence, because integer-like keys are stored as integer table keys;
//! - unsigned integers above `i64::MAX` and non-finite floats are carried
//!   as strings.
//!
//! These follow the engine's table model and are part of the contract.

use serde_json::{Map, Number, Value};
use std::fmt;
use tracing::debug;

/// A value in the rule engine's representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StructuredValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Table(Table),
    /// A foreign value that cannot be enumerated (functions, handles, ...).
    /// Carries the engine's string representation of it.
    Opaque(String),
}

/// Key of a [`Table`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKey {
    Integer(i64),
    String(String),
    Boolean(bool),
}

impl TableKey {
    /// Build a key from a host mapping key.
    ///
    /// Canonical integer literals (`"1"`, `"-4"`, not `"01"` or `"+1"`) are
    /// stored as integer keys.
    pub fn from_host_key(key: &str) -> Self {
        match key.parse::<i64>() {
            Ok(index) if index.to_string() == key => TableKey::Integer(index),
            _ => TableKey::String(key.to_string()),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Integer(i) => write!(f, "{}", i),
            TableKey::String(s) => write!(f, "{}", s),
            TableKey::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for TableKey {
    fn from(key: &str) -> Self {
        TableKey::String(key.to_string())
    }
}

impl From<String> for TableKey {
    fn from(key: String) -> Self {
        TableKey::String(key)
    }
}

impl From<i64> for TableKey {
    fn from(key: i64) -> Self {
        TableKey::Integer(key)
    }
}

/// An insertion-ordered associative table.
///
/// Setting an existing key replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    entries: Vec<(TableKey, StructuredValue)>,
}

impl Table {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table keyed `1..=N` from the given items.
    pub fn sequence(items: impl IntoIterator<Item = StructuredValue>) -> Self {
        let mut table = Self::new();
        for (index, item) in items.into_iter().enumerate() {
            table.entries.push((TableKey::Integer(index as i64 + 1), item));
        }
        table
    }

    /// Insert or replace the value at `key`. New keys go to the end.
    pub fn set(&mut self, key: impl Into<TableKey>, value: StructuredValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up any key. See [`Table::field`] for string keys.
    pub fn get(&self, key: &TableKey) -> Option<&StructuredValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a string key.
    pub fn field(&self, name: &str) -> Option<&StructuredValue> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, TableKey::String(s) if s == name))
            .map(|(_, v)| v)
    }

    /// Number of entries, whether the table reads back as a sequence or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &StructuredValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Values in key order if the keys are exactly the integers `1..=N`.
    pub fn as_sequence(&self) -> Option<Vec<&StructuredValue>> {
        if self.entries.is_empty() {
            return None;
        }

        let mut indexed = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match key {
                TableKey::Integer(index) => indexed.push((*index, value)),
                _ => return None,
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        let contiguous = indexed
            .iter()
            .enumerate()
            .all(|(position, (index, _))| *index == position as i64 + 1);

        contiguous.then(|| indexed.into_iter().map(|(_, value)| value).collect())
    }
}

impl FromIterator<(TableKey, StructuredValue)> for Table {
    fn from_iter<I: IntoIterator<Item = (TableKey, StructuredValue)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (key, value) in iter {
            table.set(key, value);
        }
        table
    }
}

/// How a structured value reads on the host side.
#[derive(Debug)]
pub enum Shape<'a> {
    Scalar(&'a StructuredValue),
    Sequence(Vec<&'a StructuredValue>),
    Mapping(&'a Table),
    Opaque(&'a str),
}

impl StructuredValue {
    /// Classify this value as scalar, sequence, mapping or opaque.
    pub fn shape(&self) -> Shape<'_> {
        match self {
            StructuredValue::Table(table) => match table.as_sequence() {
                Some(items) => Shape::Sequence(items),
                None => Shape::Mapping(table),
            },
            StructuredValue::Opaque(repr) => Shape::Opaque(repr),
            scalar => Shape::Scalar(scalar),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            StructuredValue::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StructuredValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a string key if this value is a table.
    pub fn field(&self, name: &str) -> Option<&StructuredValue> {
        self.as_table().and_then(|table| table.field(name))
    }
}

impl fmt::Display for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredValue::Nil => write!(f, "nil"),
            StructuredValue::Boolean(b) => write!(f, "{}", b),
            StructuredValue::Integer(i) => write!(f, "{}", i),
            StructuredValue::Number(n) => write!(f, "{}", n),
            StructuredValue::String(s) => write!(f, "{}", s),
            StructuredValue::Table(table) => write!(f, "table({} entries)", table.len()),
            StructuredValue::Opaque(repr) => write!(f, "{}", repr),
        }
    }
}

impl From<Table> for StructuredValue {
    fn from(table: Table) -> Self {
        StructuredValue::Table(table)
    }
}

impl From<&str> for StructuredValue {
    fn from(s: &str) -> Self {
        StructuredValue::String(s.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(s: String) -> Self {
        StructuredValue::String(s)
    }
}

impl From<bool> for StructuredValue {
    fn from(b: bool) -> Self {
        StructuredValue::Boolean(b)
    }
}

impl From<i64> for StructuredValue {
    fn from(i: i64) -> Self {
        StructuredValue::Integer(i)
    }
}

/// Convert a host value into the engine representation.
///
/// Sequences become tables keyed `1..=N`; mappings become tables keyed by
/// their (integer-normalised) keys. Numbers that fit neither `i64` nor a
/// finite `f64` fall back to their string form.
pub fn host_to_structured(value: &Value) -> StructuredValue {
    match value {
        Value::Null => StructuredValue::Nil,
        Value::Bool(b) => StructuredValue::Boolean(*b),
        Value::Number(n) => number_to_structured(n),
        Value::String(s) => StructuredValue::String(s.clone()),
        Value::Array(items) => {
            StructuredValue::Table(Table::sequence(items.iter().map(host_to_structured)))
        }
        Value::Object(map) => StructuredValue::Table(
            map.iter()
                .map(|(key, value)| (TableKey::from_host_key(key), host_to_structured(value)))
                .collect(),
        ),
    }
}

fn number_to_structured(n: &Number) -> StructuredValue {
    if let Some(i) = n.as_i64() {
        StructuredValue::Integer(i)
    } else if n.is_u64() {
        debug!("integer {} exceeds i64, carrying it as a string", n);
        StructuredValue::String(n.to_string())
    } else {
        match n.as_f64() {
            Some(f) if f.is_finite() => StructuredValue::Number(f),
            _ => {
                debug!("number {} is not finite, carrying it as a string", n);
                StructuredValue::String(n.to_string())
            }
        }
    }
}

/// Convert an engine value back into a host value.
///
/// Pure function of its input; see the module docs for how tables are
/// classified.
pub fn structured_to_host(value: &StructuredValue) -> Value {
    match value.shape() {
        Shape::Scalar(scalar) => scalar_to_host(scalar),
        Shape::Sequence(items) => Value::Array(items.into_iter().map(structured_to_host).collect()),
        Shape::Mapping(table) => {
            let mut map = Map::with_capacity(table.len());
            for (key, value) in table.iter() {
                map.insert(key.to_string(), structured_to_host(value));
            }
            Value::Object(map)
        }
        Shape::Opaque(repr) => {
            debug!("opaque engine value {} converted to a string", repr);
            Value::String(repr.to_string())
        }
    }
}

fn scalar_to_host(value: &StructuredValue) -> Value {
    match value {
        StructuredValue::Nil => Value::Null,
        StructuredValue::Boolean(b) => Value::Bool(*b),
        StructuredValue::Integer(i) => Value::from(*i),
        StructuredValue::Number(f) => Number::from_f64(*f).map(Value::Number).unwrap_or_else(|| {
            debug!("number {} is not finite, converting it to a string", f);
            Value::String(f.to_string())
        }),
        StructuredValue::String(s) => Value::String(s.clone()),
        // Tables and opaque values are classified by `shape` before this point.
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_table_is_mapping() {
        let value = StructuredValue::Table(Table::new());
        assert_eq!(structured_to_host(&value), json!({}));
    }

    #[test]
    fn test_contiguous_integer_keys_become_sequence() {
        // Inserted out of order; output follows key order.
        let table: Table = vec![
            (TableKey::Integer(2), StructuredValue::from("b")),
            (TableKey::Integer(1), StructuredValue::from("a")),
            (TableKey::Integer(3), StructuredValue::from("c")),
        ]
        .into_iter()
        .collect();

        assert_eq!(structured_to_host(&table.into()), json!(["a", "b", "c"]));
    }

    #[test]
    fn test_gapped_integer_keys_become_mapping() {
        let table: Table = vec![
            (TableKey::Integer(1), StructuredValue::from("a")),
            (TableKey::Integer(3), StructuredValue::from("c")),
        ]
        .into_iter()
        .collect();

        assert_eq!(structured_to_host(&table.into()), json!({"1": "a", "3": "c"}));
    }

    #[test]
    fn test_zero_based_keys_become_mapping() {
        let table: Table = vec![
            (TableKey::Integer(0), StructuredValue::from(true)),
            (TableKey::Integer(1), StructuredValue::from(false)),
        ]
        .into_iter()
        .collect();

        assert_eq!(structured_to_host(&table.into()), json!({"0": true, "1": false}));
    }

    #[test]
    fn test_mixed_keys_become_mapping() {
        let table: Table = vec![
            (TableKey::Integer(1), StructuredValue::from("first")),
            (TableKey::from("name"), StructuredValue::from("app")),
            (TableKey::Boolean(true), StructuredValue::Integer(7)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            structured_to_host(&table.into()),
            json!({"1": "first", "name": "app", "true": 7})
        );
    }

    #[test]
    fn test_opaque_falls_back_to_string() {
        let value = StructuredValue::Opaque("function: 0x5581".into());
        assert_eq!(structured_to_host(&value), json!("function: 0x5581"));
    }

    #[test]
    fn test_nested_conversion() {
        let host = json!({
            "values": {"PORT": 8080, "HOSTS": ["a", "b"]},
            "errors": [{"variable": "X", "error": "bad"}],
            "valid": false
        });

        let structured = host_to_structured(&host);
        let values = structured.field("values").and_then(|v| v.field("PORT"));
        assert_eq!(values, Some(&StructuredValue::Integer(8080)));
        assert_eq!(structured_to_host(&structured), host);
    }

    #[test]
    fn test_integer_like_host_keys_become_integer_keys() {
        assert_eq!(TableKey::from_host_key("3"), TableKey::Integer(3));
        assert_eq!(TableKey::from_host_key("-3"), TableKey::Integer(-3));
        assert_eq!(TableKey::from_host_key("03"), TableKey::String("03".into()));
        assert_eq!(TableKey::from_host_key("+3"), TableKey::String("+3".into()));
        assert_eq!(TableKey::from_host_key("PORT"), TableKey::String("PORT".into()));
    }

    #[test]
    fn test_oversized_unsigned_falls_back_to_string() {
        let host = json!(u64::MAX);
        assert_eq!(
            host_to_structured(&host),
            StructuredValue::String(u64::MAX.to_string())
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_string_fallbacks_are_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            host_to_structured(&json!(u64::MAX));
            structured_to_host(&StructuredValue::Opaque("function: 0x5581".into()));
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("integer 18446744073709551615 exceeds i64"));
        assert!(output.contains("opaque engine value function: 0x5581"));
    }

    #[test]
    fn test_non_finite_number_falls_back_to_string() {
        let value = StructuredValue::Number(f64::INFINITY);
        assert_eq!(structured_to_host(&value), json!("inf"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut table = Table::new();
        table.set("a", StructuredValue::Integer(1));
        table.set("b", StructuredValue::Integer(2));
        table.set("a", StructuredValue::Integer(3));

        assert_eq!(table.len(), 2);
        assert_eq!(table.field("a"), Some(&StructuredValue::Integer(3)));
        assert_eq!(structured_to_host(&table.into()), json!({"a": 3, "b": 2}));
    }
}
