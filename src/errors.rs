use thiserror::Error;
use tracing::warn;

use crate::wait::WaitTimeoutError;

/// Errors raised while driving the HUD, with exit codes for the CLI
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No element matched the locator (exit code 2)
    #[error("No elements found matching locator: {0}")]
    ElementNotFound(String),
    /// Element reference no longer attached to the DOM (exit code 2)
    #[error("Stale element reference: {0}")]
    StaleElement(String),
    /// WebDriver connection or command failed (exit code 4)
    #[error("WebDriver connection failed: {0}")]
    WebDriverFailed(String),
    /// A wait ran past its deadline (exit code 5)
    #[error(transparent)]
    Timeout(#[from] WaitTimeoutError),
    /// A scenario check did not hold (exit code 6)
    #[error("Assertion failed ({context}): expected {expected:?}, got {actual:?}")]
    AssertionMismatch {
        context: String,
        expected: String,
        actual: String,
    },
    /// Wait options out of range (exit code 1)
    #[error("Invalid wait options: {0}")]
    InvalidOptions(String),
    /// ZAP API call failed (exit code 1)
    #[error("ZAP API request failed: {0}")]
    Api(String),
    /// Generic error (exit code 1)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeError::ElementNotFound(_) | ProbeError::StaleElement(_) => 2,
            ProbeError::WebDriverFailed(_) => 4,
            ProbeError::Timeout(_) => 5,
            ProbeError::AssertionMismatch { .. } => 6,
            ProbeError::InvalidOptions(_) | ProbeError::Api(_) | ProbeError::Other(_) => 1,
        }
    }

    /// Lookup failures that a poll treats as "not yet"
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProbeError::ElementNotFound(_) | ProbeError::StaleElement(_)
        )
    }

    pub fn mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ProbeError::AssertionMismatch {
            context: context.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Fail with `AssertionMismatch` unless `actual == expected`
pub fn ensure_eq(context: &str, expected: &str, actual: &str) -> ProbeResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProbeError::mismatch(context, expected, actual))
    }
}

/// Combine a command's outcome with the cleanup that ran after it.
///
/// The command's own error wins; a cleanup failure is only returned when the
/// command succeeded, and is logged otherwise.
pub fn with_cleanup<T>(result: ProbeResult<T>, cleanup: ProbeResult<()>) -> ProbeResult<T> {
    match (result, cleanup) {
        (Ok(value), cleanup) => cleanup.map(|()| value),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            warn!("Cleanup failed after an earlier error: {}", cleanup_err);
            Err(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
