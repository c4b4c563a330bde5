//! Annotation (free-text note) record.

use super::validation::RecordValidationError;
use super::visit::VisitId;
use super::RecordKind;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

pub type AnnotationId = Uuid;

/// Free-text note attached to one visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub visit_id: VisitId,
    /// Must not be blank.
    pub text: String,
    pub date: Date,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Annotation {
    pub fn new(visit_id: VisitId, text: impl Into<String>, date: Date) -> Self {
        Self {
            id: Uuid::new_v4(),
            visit_id,
            text: text.into(),
            date,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.id.is_nil() {
            return Err(RecordValidationError::NilId(RecordKind::Annotation));
        }
        if self.visit_id.is_nil() {
            return Err(RecordValidationError::NilParent(RecordKind::Annotation));
        }
        if self.text.trim().is_empty() {
            return Err(RecordValidationError::BlankText);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationPatch {
    pub text: Option<String>,
    pub date: Option<Date>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.date.is_none()
    }

    pub fn apply(&self, annotation: &mut Annotation) {
        if let Some(text) = &self.text {
            annotation.text = text.clone();
        }
        if let Some(date) = self.date {
            annotation.date = date;
        }
    }
}
