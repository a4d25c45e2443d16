//! Logging utilities for structured request tracing

use std::time::Instant;

/// Track the duration of one API call and log it on drop
pub struct Timer {
    start: Instant,
    method: String,
    http_verb: &'static str,
}

impl Timer {
    /// Start timing a call to `method`
    pub fn new(http_verb: &'static str, method: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            method: method.into(),
            http_verb,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        tracing::debug!(
            method = %self.method,
            http_verb = self.http_verb,
            duration_ms = duration_ms,
            "Slack API call completed"
        );
    }
}

/// Log an error with structured context
pub fn log_error(operation: &str, error: &impl std::error::Error) {
    tracing::error!(
        operation = %operation,
        error = %error,
        error_kind = std::any::type_name_of_val(error),
        "Operation failed"
    );
}
