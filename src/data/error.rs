//! Errors occurring when working with data frames.

use itertools::Itertools;
use thiserror::Error;

/// Errors that can occur when interacting with a [`Frame`][crate::data::Frame].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Occurs when a frame with fields of unequal length was checked.
    #[error("Frame field length mismatch: {}", .lengths.iter().map(|x| format!("{} ({})", x.0, x.1)).join(", "))]
    FieldLengthMismatch {
        /// The names and lengths of the fields in the `Frame`.
        lengths: Vec<(String, usize)>,
    },
}
