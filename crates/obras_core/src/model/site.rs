//! Site (construction location) record.
//!
//! # Invariants
//! - `id` is generated once by [`Site::new`] and never reassigned.
//! - `name` may be blank; listings fall back to [`UNTITLED_SITE`].

use super::validation::RecordValidationError;
use super::RecordKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable site identifier.
pub type SiteId = Uuid;

/// Label shown for sites saved without a name.
pub const UNTITLED_SITE: &str = "Untitled site";

/// Top-level tracked construction location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    /// Free text, blank allowed.
    pub name: String,
    pub location: Option<String>,
    /// Epoch ms, maintained by the store.
    pub created_at: i64,
    /// Epoch ms, bumped on every update.
    pub updated_at: i64,
}

impl Site {
    /// Builds an unsaved site with a fresh id.
    pub fn new(name: impl Into<String>, location: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            location,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.id.is_nil() {
            return Err(RecordValidationError::NilId(RecordKind::Site));
        }
        Ok(())
    }

    /// Name for list rows; blank names render as [`UNTITLED_SITE`].
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            UNTITLED_SITE
        } else {
            trimmed
        }
    }
}

/// Partial replacement for a site. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePatch {
    pub name: Option<String>,
    /// `Some(None)` clears the location.
    pub location: Option<Option<String>>,
}

impl SitePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none()
    }

    /// Applies the patch onto a loaded record.
    pub fn apply(&self, site: &mut Site) {
        if let Some(name) = &self.name {
            site.name = name.clone();
        }
        if let Some(location) = &self.location {
            site.location = location.clone();
        }
    }
}
