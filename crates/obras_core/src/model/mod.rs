//! Domain model for the site/visit/annotation hierarchy.
//!
//! # Responsibility
//! - Define the three record shapes and their stable identifiers.
//! - Provide field validation shared by every write path.
//! - Provide calendar-date helpers used at API boundaries.
//!
//! # Invariants
//! - Every record is identified by a UUID that is never reused.
//! - Children reference their parent by id; parents never hold child lists.

pub mod annotation;
pub mod calendar;
pub mod site;
pub mod validation;
pub mod visit;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The three record kinds stored by the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Site,
    Visit,
    Annotation,
}

impl RecordKind {
    /// Stable lowercase label, also used as the persisted kind tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Visit => "visit",
            Self::Annotation => "annotation",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
