// File: rusty-forms-types/src/error.rs
// Purpose: Errors raised by path parsing and path access

use crate::path::{FieldPath, Segment};

/// Programmer error: a path that is malformed or does not fit the value tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("malformed field path `{path}`: {reason}")]
    Malformed { path: String, reason: &'static str },

    #[error("invalid field path `{path}` at segment `{segment}`: {reason}")]
    InvalidPath {
        path: String,
        segment: String,
        reason: &'static str,
    },
}

impl PathError {
    pub(crate) fn malformed(path: &str, reason: &'static str) -> Self {
        PathError::Malformed {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid(path: &FieldPath, segment: Segment<'_>, reason: &'static str) -> Self {
        PathError::InvalidPath {
            path: path.to_string(),
            segment: segment.to_string(),
            reason,
        }
    }
}
