//! Error types for patch and core-area analysis.

use thiserror::Error;

use crate::labeling::PatchId;

/// Every failure a patchscape computation can report.
///
/// Validation happens eagerly at the entry of each component; a failing call
/// never returns a truncated table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandscapeError {
    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("invalid connectivity {0}: expected 4 or 8")]
    InvalidConnectivity(u8),

    #[error("invalid configuration: {name} = {value} ({reason})")]
    InvalidConfiguration {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A label id owns no cells. Indicates a labeler bug, never bad input.
    #[error("patch {0} has no member cells")]
    EmptyPatch(PatchId),
}

impl LandscapeError {
    pub(crate) fn invalid_grid(reason: impl Into<String>) -> Self {
        Self::InvalidGrid { reason: reason.into() }
    }

    pub(crate) fn invalid_config(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfiguration {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LandscapeError>;
