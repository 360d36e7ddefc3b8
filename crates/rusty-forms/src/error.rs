// File: rusty-forms/src/error.rs
// Purpose: Errors returned by form operations

use rusty_forms_types::{FieldPath, PathError};

/// Errors from form operations
///
/// Field validation failures are not errors: they land in the form's
/// `ErrorMap`. These are programmer or configuration mistakes.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("`{0}` is not a declared field array")]
    NotAFieldArray(FieldPath),

    #[error("index {index} is out of bounds for field array `{path}` of length {len}")]
    IndexOutOfBounds {
        path: FieldPath,
        index: usize,
        len: usize,
    },

    #[error("cannot remove row {index} of `{path}`: the first {min_length} row(s) are fixed")]
    MinLength {
        path: FieldPath,
        index: usize,
        min_length: usize,
    },

    #[error("invalid form configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T, E = FormError> = std::result::Result<T, E>;
