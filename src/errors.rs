//! Error taxonomy. Every failure is a programmer-level contract violation
//! surfaced immediately; the engine never retries and never rolls back a
//! partially applied pass.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A native toolkit call failed, e.g. a kind-cast mismatch during patch
    /// dispatch. The pass aborts and the live tree may be left partially
    /// updated.
    #[error("toolkit failure: {details}")]
    ToolkitFailure { details: String },

    /// A specialized container does not hold its fixed structural shape.
    /// Signals caller/engine desynchronization, not a user-facing condition.
    #[error("structural invariant violated: {details}")]
    StructuralInvariantViolation { details: String },
}

impl ReconcileError {
    pub(crate) fn toolkit(details: impl Into<String>) -> Self {
        ReconcileError::ToolkitFailure {
            details: details.into(),
        }
    }

    pub(crate) fn structure(details: impl Into<String>) -> Self {
        ReconcileError::StructuralInvariantViolation {
            details: details.into(),
        }
    }
}
