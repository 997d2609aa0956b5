// Unit tests for errors module

use super::*;
use std::time::Duration;

#[test]
fn test_exit_codes() {
    assert_eq!(ProbeError::ElementNotFound("#x".into()).exit_code(), 2);
    assert_eq!(ProbeError::StaleElement("#x".into()).exit_code(), 2);
    assert_eq!(ProbeError::WebDriverFailed("down".into()).exit_code(), 4);
    assert_eq!(ProbeError::mismatch("url", "a", "b").exit_code(), 6);
    assert_eq!(ProbeError::Api("500".into()).exit_code(), 1);

    let timeout = WaitTimeoutError {
        description: "element #x to be present".into(),
        timeout: Duration::from_millis(500),
        elapsed: Duration::from_millis(500),
        attempts: 6,
        last_observation: None,
    };
    assert_eq!(ProbeError::from(timeout).exit_code(), 5);
}

#[test]
fn test_transient_classification() {
    assert!(ProbeError::ElementNotFound("#x".into()).is_transient());
    assert!(ProbeError::StaleElement("#x".into()).is_transient());
    assert!(!ProbeError::WebDriverFailed("down".into()).is_transient());
    assert!(!ProbeError::mismatch("url", "a", "b").is_transient());
}

#[test]
fn test_ensure_eq() {
    assert!(ensure_eq("title", "HUD", "HUD").is_ok());

    let err = ensure_eq("title", "HUD", "Other").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Assertion failed (title): expected \"HUD\", got \"Other\""
    );
}

#[test]
fn test_timeout_message_includes_description() {
    let err = ProbeError::from(WaitTimeoutError {
        description: "url to be https://localhost:9998/SiteAlerts".into(),
        timeout: Duration::from_secs(2),
        elapsed: Duration::from_secs(2),
        attempts: 21,
        last_observation: Some("https://localhost:9998/PageAlerts".into()),
    });
    let msg = err.to_string();
    assert!(msg.contains("timed out"));
    assert!(msg.contains("SiteAlerts"));
    assert!(msg.contains("last observed: https://localhost:9998/PageAlerts"));
}

#[test]
fn test_cleanup_failure_does_not_hide_command_error() {
    let timeout = WaitTimeoutError {
        description: "text '1' to be present".into(),
        timeout: Duration::from_secs(10),
        elapsed: Duration::from_secs(10),
        attempts: 101,
        last_observation: Some("text '0'".into()),
    };
    let closed = Err(ProbeError::WebDriverFailed("invalid session id".into()));

    let err = with_cleanup::<()>(Err(timeout.into()), closed).unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_)));
    assert_eq!(err.exit_code(), 5);

    let err = with_cleanup::<()>(Err(ProbeError::mismatch("url", "a", "b")), Ok(())).unwrap_err();
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn test_cleanup_failure_after_success_is_reported() {
    let closed = Err(ProbeError::WebDriverFailed("invalid session id".into()));
    let err = with_cleanup(Ok(42), closed).unwrap_err();
    assert_eq!(err.exit_code(), 4);

    assert_eq!(with_cleanup(Ok(42), Ok(())).unwrap(), 42);
}
