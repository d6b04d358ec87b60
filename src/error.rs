use std::sync::Arc;

use thiserror::Error;

use crate::value::Missing;

/// A side effect that failed when its consumer ran it.
///
/// Cheap to clone, so every copy of the value that carried the effect can
/// report the same failure.
#[derive(Debug, Error, Clone)]
#[error("Side effect '{label}' failed:\n{cause}")]
pub struct SideEffectError {
    label: Arc<str>,
    cause: Arc<anyhow::Error>,
}

impl SideEffectError {
    pub fn new(label: impl Into<Arc<str>>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            label: label.into(),
            cause: Arc::new(cause.into()),
        }
    }

    /// Label of the side effect that failed.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

#[derive(Debug, Error)]
pub enum CollectorError {
    /// The collector cannot report how many elements it holds without
    /// evaluating them.
    #[error("Collector '{0}' does not support size()")]
    UnsupportedSize(&'static str),

    #[error("Element type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Cannot query the value because it has no value available.\n{0}")]
    MissingValue(Missing),

    #[error(transparent)]
    SideEffect(#[from] SideEffectError),
}
