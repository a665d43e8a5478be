//! Round-trip properties of host <-> structured conversion

use envschema_core::{host_to_structured, structured_to_host, StructuredValue, TableKey};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e12f64..1.0e12).prop_map(Value::from),
        "[ -~]{0,12}".prop_map(Value::String),
    ]
}

/// Nested values without empty sequences and with non-numeric mapping keys.
fn round_trippable() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Value::Array),
            prop::collection::btree_map("[A-Z_][A-Z0-9_]{0,7}", inner, 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

proptest! {
    #[test]
    fn round_trip_is_identity(value in round_trippable()) {
        let structured = host_to_structured(&value);
        prop_assert_eq!(structured_to_host(&structured), value);
    }

    #[test]
    fn conversion_back_is_pure(value in round_trippable()) {
        let structured = host_to_structured(&value);
        prop_assert_eq!(structured_to_host(&structured), structured_to_host(&structured));
    }

    #[test]
    fn numeric_string_keys_one_to_n_become_sequence(items in prop::collection::vec(scalar(), 1..6)) {
        let mapping: Map<String, Value> = items
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v.clone()))
            .collect();

        let back = structured_to_host(&host_to_structured(&Value::Object(mapping)));
        prop_assert_eq!(back, Value::Array(items));
    }
}

#[test]
fn test_empty_sequence_comes_back_as_mapping() {
    let back = structured_to_host(&host_to_structured(&json!([])));
    assert_eq!(back, json!({}));
}

#[test]
fn test_numeric_keyed_mapping_comes_back_as_sequence() {
    let back = structured_to_host(&host_to_structured(&json!({"1": "a", "2": "b", "3": "c"})));
    assert_eq!(back, json!(["a", "b", "c"]));

    let shuffled = structured_to_host(&host_to_structured(&json!({"2": "b", "1": "a"})));
    assert_eq!(shuffled, json!(["a", "b"]));
}

#[test]
fn test_gapped_numeric_keyed_mapping_stays_mapping() {
    let host = json!({"1": "a", "3": "c"});
    assert_eq!(structured_to_host(&host_to_structured(&host)), host);
}

#[test]
fn test_sequences_are_keyed_from_one() {
    let structured = host_to_structured(&json!(["x", "y"]));
    let table = structured.as_table().unwrap();

    assert_eq!(table.get(&TableKey::Integer(1)), Some(&StructuredValue::from("x")));
    assert_eq!(table.get(&TableKey::Integer(2)), Some(&StructuredValue::from("y")));
    assert_eq!(table.get(&TableKey::Integer(0)), None);
}
