//! Service-boundary result shapes.

use serde::Serialize;

use crate::error::AppError;

/// Outcome reported to callers of the service layer.
///
/// Errors never cross this boundary; they are folded into `success = false`
/// and a human-readable `message`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub message: String,
    /// Numeric error code, `0` on success
    pub code: u32,
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: 0,
            data: Some(data),
        }
    }

    pub fn failed(context: &str, error: &AppError) -> Self {
        Self {
            success: false,
            message: format!("{context}: {error}"),
            code: error.code(),
            data: None,
        }
    }

    /// Response for an operation that panicked.
    pub fn panicked(context: &str) -> Self {
        Self {
            success: false,
            message: format!("{context}: internal error"),
            code: 10001,
            data: None,
        }
    }

    /// Split into the `(success, message, data)` triple.
    pub fn into_parts(self) -> (bool, String, Option<T>) {
        (self.success, self.message, self.data)
    }
}

/// Aggregate result of a batch where individual items may fail.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    /// Successful items only
    pub items: Vec<T>,
    pub total: usize,
    pub failures: usize,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            failures: 0,
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn succeeded(&self) -> usize {
        self.items.len()
    }
}
