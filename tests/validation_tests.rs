//! Configuration validation tests
//!
//! Checks the errors and warnings reported for effective configurations.

use toolbridge::config::validation::ConfigValidator;
use toolbridge::config::{Config, LogLevel};
use toolbridge::{ValidationIssue, ValidationSeverity};

fn issues(config: &Config) -> Vec<ValidationIssue> {
    ConfigValidator::new(config).issues()
}

fn errors(config: &Config) -> Vec<ValidationIssue> {
    issues(config).into_iter().filter(|i| i.severity == ValidationSeverity::Error).collect()
}

fn warnings(config: &Config) -> Vec<ValidationIssue> {
    issues(config).into_iter().filter(|i| i.severity == ValidationSeverity::Warning).collect()
}

/// Defaults must pass without findings
#[test]
fn test_default_config_is_clean() {
    let config = Config::default();
    assert!(issues(&config).is_empty(), "unexpected issues: {:?}", issues(&config));
    assert!(config.validate().is_ok());
}

#[test]
fn test_port_zero_is_error() {
    let mut config = Config::default();
    config.server.port = 0;
    let errors = errors(&config);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "server.port");
    assert!(config.validate().is_err());
}

#[test]
fn test_privileged_port_is_warning() {
    let mut config = Config::default();
    config.server.port = 443;
    assert!(errors(&config).is_empty());
    let warnings = warnings(&config);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "server.port");
    assert!(config.validate().is_ok(), "warnings alone must not fail validation");
}

#[test]
fn test_empty_default_user() {
    let mut config = Config::default();
    config.server.default_user = "   ".to_string();
    assert_eq!(errors(&config)[0].field, "server.default_user");
}

#[test]
fn test_non_http_url_is_error() {
    let mut config = Config::default();
    config.upstream.stream_url = "ftp://gateway/stream".to_string();
    let errors = errors(&config);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "upstream.stream_url");
    assert!(errors[0].message.contains("ftp://gateway/stream"));
}

#[test]
fn test_plain_http_url_is_warning() {
    let mut config = Config::default();
    config.upstream.prod_chat_url = "http://localhost:9000/chat/".to_string();
    assert!(errors(&config).is_empty());
    assert_eq!(warnings(&config)[0].field, "upstream.prod_chat_url");
}

#[test]
fn test_timeout_bounds() {
    let mut config = Config::default();
    config.upstream.timeout_secs = 0;
    assert_eq!(errors(&config)[0].field, "upstream.timeout_secs");

    config.upstream.timeout_secs = 3600;
    assert!(errors(&config).is_empty());
    assert_eq!(warnings(&config)[0].field, "upstream.timeout_secs");
}

#[test]
fn test_trace_level_is_warning() {
    let mut config = Config::default();
    config.server.log_level = LogLevel::Trace;
    assert_eq!(warnings(&config)[0].field, "server.log_level");
}

#[test]
fn test_streaming_settings() {
    let mut config = Config::default();
    config.streaming.channel_capacity = 0;
    config.streaming.content_chunk_size = 0;
    let fields: Vec<String> = errors(&config).into_iter().map(|e| e.field).collect();
    assert_eq!(fields, vec!["streaming.channel_capacity", "streaming.content_chunk_size"]);

    let mut config = Config::default();
    config.streaming.content_chunk_size = 4096;
    assert_eq!(warnings(&config)[0].field, "streaming.content_chunk_size");
}

/// Every error is listed in the failure message
#[test]
fn test_validate_lists_all_errors() {
    let mut config = Config::default();
    config.server.port = 0;
    config.upstream.timeout_secs = 0;
    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("2 error(s)"));
    assert!(message.contains("1. server.port"));
    assert!(message.contains("2. upstream.timeout_secs"));
}

#[test]
fn test_issue_display() {
    let mut config = Config::default();
    config.server.port = 0;
    let issue = &errors(&config)[0];
    assert_eq!(issue.to_string(), format!("server.port: {}", issue.message));
}
