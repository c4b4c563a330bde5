//! Field validation errors for hierarchy records.

use super::RecordKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// A record field is missing or malformed. Raised before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// Record id is the nil UUID.
    NilId(RecordKind),
    /// Parent reference is the nil UUID.
    NilParent(RecordKind),
    /// Annotation text is empty after trim.
    BlankText,
    /// Date string is not a `YYYY-MM-DD` calendar date.
    InvalidDate(String),
    /// Id is already live or was used by a deleted record.
    IdentityTaken { kind: RecordKind, id: Uuid },
    /// Listing offset does not address a row of the current snapshot.
    OffsetOutOfRange { offset: usize, len: usize },
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId(kind) => write!(f, "{kind} id must not be nil"),
            Self::NilParent(kind) => write!(f, "{kind} parent reference must not be nil"),
            Self::BlankText => write!(f, "annotation text must not be blank"),
            Self::InvalidDate(value) => {
                write!(f, "invalid date `{value}`; expected YYYY-MM-DD")
            }
            Self::IdentityTaken { kind, id } => {
                write!(f, "{kind} id already used: {id}")
            }
            Self::OffsetOutOfRange { offset, len } => {
                write!(f, "listing offset {offset} out of range for {len} row(s)")
            }
        }
    }
}

impl Error for RecordValidationError {}
