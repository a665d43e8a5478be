//! End-to-end tests for EnvValidator

use envschema_runtime::{
    validate_env, EngineError, EnvSchemaError, EnvValidator, EnvVars, ErrorKind, FieldRule,
    FieldType, Schema,
};
use envschema_test_fixtures::{
    app_schema, deployment_schema, env, invalid_app_env, valid_app_env, valid_deployment_env,
    FixtureFormat, TestFixtures,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn validator() -> EnvValidator {
    EnvValidator::new().with_report(false)
}

#[test]
fn test_valid_input_yields_every_field() {
    let result = validator().validate(app_schema(), Some(&valid_app_env())).unwrap();

    assert!(result.valid);
    assert!(result.errors.is_empty());
    assert_eq!(
        Value::Object(result.values),
        json!({
            "API_KEY": "ABCD1234EFGH5678IJKL9012MNOP3456",
            "DEBUG": true,
            "PORT": 8080,
            "ENVIRONMENT": "production"
        })
    );
}

#[test]
fn test_port_default_applies() {
    let schema = json!({"PORT": {"type": "integer", "min": 1, "max": 65535, "default": 3000}});
    let result = validator().validate(schema, Some(&EnvVars::new())).unwrap();

    assert!(result.valid);
    assert_eq!(Value::Object(result.values), json!({"PORT": 3000}));
    assert!(result.errors.is_empty());
}

#[test]
fn test_short_api_key_is_min_length_violation() {
    let schema = json!({
        "API_KEY": {"type": "string", "required": true, "min_length": 32, "pattern": "^[A-Za-z0-9]+$"}
    });
    let result = validator()
        .validate(schema, Some(&env(&[("API_KEY", "short")])))
        .unwrap();

    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].variable, "API_KEY");
    assert_eq!(result.errors[0].rule.as_deref(), Some("min_length"));
    assert_eq!(result.errors[0].kind, ErrorKind::ConstraintViolation);
    assert!(!result.values.contains_key("API_KEY"));
}

#[test]
fn test_enum_violation() {
    let schema = json!({
        "ENVIRONMENT": {
            "type": "string",
            "enum": ["development", "staging", "production"],
            "required": true
        }
    });
    let result = validator()
        .validate(schema.clone(), Some(&env(&[("ENVIRONMENT", "invalid")])))
        .unwrap();

    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::ConstraintViolation);
    assert_eq!(result.errors[0].rule.as_deref(), Some("enum"));

    let err = validator()
        .validate_or_error(schema, Some(&env(&[("ENVIRONMENT", "invalid")])))
        .unwrap_err();
    assert!(matches!(err, EnvSchemaError::ValidationFailed(_)));
    assert!(err.to_string().contains("ENVIRONMENT"));
}

#[test]
fn test_missing_required_fields() {
    let result = validator().validate(app_schema(), Some(&EnvVars::new())).unwrap();

    let missing: Vec<&str> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::MissingVariable)
        .map(|e| e.variable.as_str())
        .collect();
    assert_eq!(missing, vec!["API_KEY", "ENVIRONMENT"]);
    assert_eq!(Value::Object(result.values), json!({"DEBUG": false, "PORT": 3000}));
}

#[test]
fn test_strict_mode_reports_all_errors_in_order() {
    let err = validator()
        .validate_or_error(app_schema(), Some(&invalid_app_env()))
        .unwrap_err();

    insta::assert_snapshot!(err.to_string(), @r"
    Environment variable validation failed:
    API_KEY: length 5 is less than minimum 32
    PORT: value 99999 exceeds maximum 65535
    ENVIRONMENT: invalid value 'invalid', must be one of: development, staging, production
    ");
}

#[test]
fn test_strict_mode_returns_values() {
    let values = validator()
        .validate_or_error(deployment_schema(), Some(&valid_deployment_env()))
        .unwrap();

    assert_eq!(values["API_PORT"], 8080);
    assert_eq!(values["LOG_LEVEL"], "info");
    assert_eq!(values["ENABLE_CACHE"], true);
    assert_eq!(values["MAX_CONNECTIONS"], 50);
    assert!(values.get("CACHE_RATIO").is_none());
}

#[test]
fn test_typed_schema_source() {
    let schema = Schema::new().with_field(
        "WORKERS",
        FieldRule::new(FieldType::Integer).required().with_range(Some(1.0), Some(64.0)),
    );

    let result = validator()
        .validate(&schema, Some(&env(&[("WORKERS", "128")])))
        .unwrap();
    assert_eq!(result.errors[0].rule.as_deref(), Some("max"));
}

#[test]
fn test_validate_env_uses_default_validator() {
    let result = validate_env(app_schema(), Some(&valid_app_env())).unwrap();
    assert!(result.valid);
}

#[test]
fn test_validate_is_idempotent() {
    let validator = validator();
    let first = validator.validate(app_schema(), Some(&invalid_app_env())).unwrap();
    let second = validator.validate(app_schema(), Some(&invalid_app_env())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_json_schema_file() {
    let fixtures = TestFixtures::new().unwrap();
    let path = fixtures
        .write_schema("deployment", &deployment_schema(), FixtureFormat::Json)
        .unwrap();

    let result = validator().validate(path.as_path(), Some(&valid_deployment_env())).unwrap();
    assert!(result.valid, "{:?}", result.errors);
}

#[test]
fn test_yaml_schema_file_goes_through_engine() {
    let fixtures = TestFixtures::new().unwrap();
    let path = fixtures
        .write_schema("app", &app_schema(), FixtureFormat::Yaml)
        .unwrap();

    let validator = validator();
    let result = validator.validate(path.clone(), Some(&invalid_app_env())).unwrap();
    assert_eq!(result.errors.len(), 3);

    let loaded = validator.load_schema(path).unwrap();
    assert_eq!(loaded, app_schema());
}

#[test]
fn test_broken_json_is_schema_load_error() {
    let fixtures = TestFixtures::new().unwrap();
    let path = fixtures
        .write_schema("broken", &json!({}), FixtureFormat::BrokenJson)
        .unwrap();

    let err = validator().validate(path.clone(), Some(&EnvVars::new())).unwrap_err();
    match err {
        EnvSchemaError::SchemaLoad { source_name, .. } => {
            assert_eq!(source_name, path.display().to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(matches!(
        validator().load_schema(path),
        Err(EnvSchemaError::SchemaLoad { .. })
    ));
}

#[test]
fn test_non_mapping_document_is_schema_load_error() {
    let fixtures = TestFixtures::new().unwrap();
    let path = fixtures
        .write_schema("list", &json!({}), FixtureFormat::NotAMapping)
        .unwrap();

    assert!(matches!(
        validator().load_schema(path),
        Err(EnvSchemaError::SchemaLoad { .. })
    ));
}

#[test]
fn test_missing_schema_file() {
    let err = validator()
        .validate("/nonexistent/envschema/schema.json", Some(&EnvVars::new()))
        .unwrap_err();
    assert!(matches!(err, EnvSchemaError::SchemaLoad { .. }));
}

#[test]
fn test_invalid_rule_is_engine_error() {
    let err = validator()
        .validate(json!({"WHEN": {"type": "datetime"}}), Some(&EnvVars::new()))
        .unwrap_err();
    assert!(matches!(err, EnvSchemaError::Engine(EngineError::InvalidSchema(_))));
}

#[test]
fn test_load_schema_inline_is_unchanged() {
    let schema = app_schema();
    assert_eq!(validator().load_schema(schema.clone()).unwrap(), schema);
}

#[test]
fn test_defaults_to_process_environment() {
    std::env::set_var("ENVSCHEMA_IT_PROCESS_PORT", "4242");

    let schema = json!({"ENVSCHEMA_IT_PROCESS_PORT": {"type": "integer", "required": true}});
    let values = validator().validate_or_error(schema, None).unwrap();
    assert_eq!(values["ENVSCHEMA_IT_PROCESS_PORT"], 4242);
}

#[test]
fn test_shared_validator_across_threads() {
    let validator = Arc::new(validator());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let validator = Arc::clone(&validator);
            std::thread::spawn(move || {
                let port = (8000 + i).to_string();
                let inputs = env(&[
                    ("API_KEY", "ABCD1234EFGH5678IJKL9012MNOP3456"),
                    ("PORT", port.as_str()),
                    ("ENVIRONMENT", "staging"),
                ]);
                validator.validate_or_error(app_schema(), Some(&inputs)).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let values = handle.join().unwrap();
        assert_eq!(values["PORT"], 8000 + i as i64);
    }
}
