//! Error types for UI driver operations.

use std::time::Duration;
use thiserror::Error;

use crate::driver::ControlKind;

/// Errors surfaced by a [`crate::UiDriver`] implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A window or control expected to exist did not appear.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A wait on a window or control exceeded its deadline.
    #[error("timed out after {waited:.1?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// An operation was invoked on a control kind that does not support it
    /// (e.g. toggling a plain button). Capability checks are explicit; a
    /// driver must never silently no-op.
    #[error("operation '{operation}' is not supported on {kind:?} controls")]
    Unsupported {
        operation: &'static str,
        kind: ControlKind,
    },

    /// A handle refers to an element the backend no longer tracks.
    #[error("stale handle: {what}")]
    StaleHandle { what: String },

    /// Any other error from the accessibility backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl DriverError {
    /// True for the structural failures a workflow records as a failed step
    /// (as opposed to an unanticipated backend condition).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DriverError::NotFound { .. }
                | DriverError::Timeout { .. }
                | DriverError::Unsupported { .. }
        )
    }
}

/// Result type alias using [`DriverError`].
pub type Result<T> = std::result::Result<T, DriverError>;
