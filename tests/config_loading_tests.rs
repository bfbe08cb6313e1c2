//! Config Loading Tests
//!
//! Exercises TOML file loading, validation and typo detection through the
//! public config API.

use meeting_scheduler::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use meeting_scheduler::config::{ConfigError, SchedulerConfig};
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_file_loads() {
    let file = write_config(
        r#"
[backend]
enabled = false
base_url = "http://10.0.0.5:8000"
timeout_secs = 5
client_errors_fatal = true

[compression]
url = "https://compress.example.test/raw/"
target_model = "gpt-4o-mini"
rate = "0.5"
timeout_secs = 15

[generation]
base_url = "https://llm.example.test/v1beta"
default_model = "gemini-2.0-flash"
temperature = 0.2
max_output_tokens = 1024
thinking_budget = 0
timeout_secs = 20
"#,
    );

    let config = SchedulerConfig::load_from_file(file.path()).unwrap();
    assert!(!config.backend.enabled);
    assert!(config.backend.client_errors_fatal);
    assert_eq!(config.backend.timeout().as_secs(), 5);
    assert_eq!(config.compression.target_model, "gpt-4o-mini");
    assert_eq!(config.generation.default_model, "gemini-2.0-flash");
    assert_eq!(config.generation.max_output_tokens, 1024);
}

#[test]
fn empty_file_gives_defaults() {
    let file = write_config("");
    let config = SchedulerConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config, SchedulerConfig::default());
}

#[test]
fn invalid_values_are_rejected_with_all_reasons() {
    let file = write_config(
        r#"
[backend]
timeout_secs = 0

[generation]
base_url = "generativelanguage.googleapis.com"
"#,
    );
    match SchedulerConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 2, "got: {errors:?}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn malformed_toml_reports_path() {
    let file = write_config("[backend\n");
    let err = SchedulerConfig::load_from_file(file.path()).unwrap_err();
    match &err {
        ConfigError::Parse(path, _) => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SchedulerConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn typo_keys_warn_but_still_load() {
    let toml_str = r#"
[generation]
default_modle = "gemini-2.0-flash"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("generation.default_model")
    );

    let file = write_config(toml_str);
    let config = SchedulerConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.generation.default_model, "gemini-2.5-flash");
}

#[test]
fn every_default_key_is_known() {
    let text = SchedulerConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&text).is_empty());

    let known = known_config_keys();
    assert!(suggest_correction("zzzzzzzzzzzzzzzzzz", &known).is_none());
}
