//! Errors reported by the hiding operations.

use thiserror::Error;

/// Why a hiding operation did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HideError {
    /// No mesh is being edited. Nothing was touched.
    #[error("no active mesh to hide geometry on")]
    NoActiveTarget,

    /// Transient geometry could not be removed cleanly, or stored selection
    /// indices no longer fit the mesh. Reported through
    /// `HideReport::warnings`; the hide itself still applies.
    #[error("inconsistent geometry state: {message}")]
    InconsistentGeometryState { message: String },

    /// The host's visible-geometry query gave no usable answer.
    #[error("host visibility query failed: {0}")]
    HostQueryFailure(String),
}

impl HideError {
    /// Creates an inconsistent geometry error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentGeometryState {
            message: message.into(),
        }
    }

    /// Creates a host query failure.
    pub fn host_query(message: impl Into<String>) -> Self {
        Self::HostQueryFailure(message.into())
    }

    /// True for outcomes that should be surfaced as a warning rather than a
    /// failed operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            HideError::NoActiveTarget | HideError::InconsistentGeometryState { .. }
        )
    }
}
