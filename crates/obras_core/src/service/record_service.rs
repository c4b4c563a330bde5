//! Mutation use-cases for sites, visits and annotations.
//!
//! # Responsibility
//! - Normalize form input (trim text, blank optional fields become `None`).
//! - Default missing visit/annotation dates to today.
//! - Resolve listing offsets for swipe-to-delete flows.
//!
//! # Invariants
//! - Every call maps to exactly one record store transaction.
//! - Failures are returned unchanged; nothing is retried or discarded.

use crate::model::annotation::{Annotation, AnnotationId, AnnotationPatch};
use crate::model::calendar::today_utc;
use crate::model::site::{Site, SiteId, SitePatch};
use crate::model::validation::RecordValidationError;
use crate::model::visit::{Visit, VisitId, VisitPatch};
use crate::repo::cascade::CascadeReport;
use crate::repo::record_repo::RecordRepository;
use crate::repo::RepoResult;
use log::{info, warn};
use time::Date;

/// Use-case service for record mutations.
pub struct RecordService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> RecordService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a site. Blank names are kept; a blank location is stored as
    /// absent.
    pub fn create_site(
        &self,
        name: impl Into<String>,
        location: Option<String>,
    ) -> RepoResult<Site> {
        let name = name.into();
        let site = Site::new(name.trim(), normalize_optional(location));
        logged("site_create", self.repo.create_site(&site))
    }

    /// Creates a visit under `site_id`, dated today when `date` is `None`.
    pub fn create_visit(
        &self,
        site_id: SiteId,
        date: Option<Date>,
        notes: Option<String>,
    ) -> RepoResult<Visit> {
        let visit = Visit::new(
            site_id,
            date.unwrap_or_else(today_utc),
            normalize_optional(notes),
        );
        logged("visit_create", self.repo.create_visit(&visit))
    }

    /// Creates an annotation under `visit_id`, dated today when `date` is
    /// `None`.
    pub fn create_annotation(
        &self,
        visit_id: VisitId,
        text: impl Into<String>,
        date: Option<Date>,
    ) -> RepoResult<Annotation> {
        let text = text.into();
        let annotation = Annotation::new(visit_id, text.trim(), date.unwrap_or_else(today_utc));
        logged("annotation_create", self.repo.create_annotation(&annotation))
    }

    pub fn update_site(&self, id: SiteId, patch: SitePatch) -> RepoResult<Site> {
        let patch = SitePatch {
            name: patch.name.map(|name| name.trim().to_string()),
            location: patch.location.map(normalize_optional),
        };
        logged("site_update", self.repo.update_site(id, &patch))
    }

    pub fn update_visit(&self, id: VisitId, patch: VisitPatch) -> RepoResult<Visit> {
        let patch = VisitPatch {
            date: patch.date,
            notes: patch.notes.map(normalize_optional),
        };
        logged("visit_update", self.repo.update_visit(id, &patch))
    }

    pub fn update_annotation(
        &self,
        id: AnnotationId,
        patch: AnnotationPatch,
    ) -> RepoResult<Annotation> {
        let patch = AnnotationPatch {
            text: patch.text.map(|text| text.trim().to_string()),
            date: patch.date,
        };
        logged("annotation_update", self.repo.update_annotation(id, &patch))
    }

    /// Deletes a site and everything below it.
    pub fn delete_site(&self, id: SiteId) -> RepoResult<CascadeReport> {
        logged_cascade("site_delete", self.repo.delete_site(id))
    }

    /// Deletes the sites at `offsets` of the current [`list_sites`] order.
    ///
    /// Offsets are resolved against a fresh snapshot. Any out-of-range offset
    /// rejects the whole call before anything is deleted.
    ///
    /// [`list_sites`]: RecordRepository::list_sites
    pub fn delete_sites_at(&self, offsets: &[usize]) -> RepoResult<CascadeReport> {
        let snapshot = self.repo.list_sites()?;
        let mut ids = Vec::with_capacity(offsets.len());
        for &offset in offsets {
            let site = snapshot
                .get(offset)
                .ok_or(RecordValidationError::OffsetOutOfRange {
                    offset,
                    len: snapshot.len(),
                })?;
            ids.push(site.id);
        }
        logged_cascade("site_delete_at", self.repo.delete_sites(&ids))
    }

    pub fn delete_visit(&self, id: VisitId) -> RepoResult<CascadeReport> {
        logged_cascade("visit_delete", self.repo.delete_visit(id))
    }

    pub fn delete_annotation(&self, id: AnnotationId) -> RepoResult<CascadeReport> {
        logged_cascade("annotation_delete", self.repo.delete_annotation(id))
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn logged<T>(event: &'static str, result: RepoResult<T>) -> RepoResult<T> {
    match &result {
        Ok(_) => info!("event={event} module=service status=ok"),
        Err(err) => warn!(
            "event={event} module=service status=error error_code={}",
            err.code()
        ),
    }
    result
}

fn logged_cascade(
    event: &'static str,
    result: RepoResult<CascadeReport>,
) -> RepoResult<CascadeReport> {
    match &result {
        Ok(report) => info!(
            "event={event} module=service status=ok sites={} visits={} annotations={}",
            report.sites, report.visits, report.annotations
        ),
        Err(err) => warn!(
            "event={event} module=service status=error error_code={}",
            err.code()
        ),
    }
    result
}
