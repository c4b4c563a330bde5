//! Record store persistence for the site/visit/annotation hierarchy.
//!
//! # Responsibility
//! - Define the record store contract consumed by services.
//! - Keep SQL, ordering and cascade details inside the persistence boundary.
//!
//! # Invariants
//! - Every mutation is one `BEGIN IMMEDIATE` transaction: fully applied or not
//!   at all.
//! - Errors are returned to the caller, never swallowed or retried.

pub mod cascade;
pub mod record_repo;

use crate::db::DbError;
use crate::model::validation::RecordValidationError;
use crate::model::RecordKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Record store error.
#[derive(Debug)]
pub enum RepoError {
    /// Field missing or malformed; nothing was written.
    Validation(RecordValidationError),
    /// Create referenced a parent that does not exist.
    DanglingParent { kind: RecordKind, id: Uuid },
    /// Update/delete/list targeted an id that does not exist.
    NotFound { kind: RecordKind, id: Uuid },
    /// Underlying storage read/write failed.
    Persistence(DbError),
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl RepoError {
    /// Stable machine-readable error code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DanglingParent { .. } => "dangling_parent",
            Self::NotFound { .. } => "not_found",
            Self::Persistence(_) => "persistence",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DanglingParent { kind, id } => write!(f, "parent {kind} not found: {id}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Persistence(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(DbError::Sqlite(value))
    }
}
