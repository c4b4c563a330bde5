//! Visit (dated inspection) record.

use super::calendar::format_calendar_date;
use super::site::SiteId;
use super::validation::RecordValidationError;
use super::RecordKind;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

pub type VisitId = Uuid;

/// A dated inspection event belonging to exactly one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    /// Owning site. Never nil after creation.
    pub site_id: SiteId,
    pub date: Date,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Visit {
    pub fn new(site_id: SiteId, date: Date, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_id,
            date,
            notes,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.id.is_nil() {
            return Err(RecordValidationError::NilId(RecordKind::Visit));
        }
        if self.site_id.is_nil() {
            return Err(RecordValidationError::NilParent(RecordKind::Visit));
        }
        Ok(())
    }

    /// Row title: the visit date as `YYYY-MM-DD`.
    pub fn title(&self) -> String {
        format_calendar_date(self.date)
    }
}

/// Partial replacement for a visit. The owning site cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub date: Option<Date>,
    pub notes: Option<Option<String>>,
}

impl VisitPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.notes.is_none()
    }

    pub fn apply(&self, visit: &mut Visit) {
        if let Some(date) = self.date {
            visit.date = date;
        }
        if let Some(notes) = &self.notes {
            visit.notes = notes.clone();
        }
    }
}
