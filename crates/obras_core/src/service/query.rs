//! Read-only query facade over the record store.
//!
//! Every call returns an owned snapshot, so a caller iterating a listing is
//! never affected by writes made while it iterates.

use crate::model::annotation::Annotation;
use crate::model::site::{Site, SiteId};
use crate::model::visit::{Visit, VisitId};
use crate::repo::record_repo::RecordRepository;
use crate::repo::RepoResult;

/// Listing facade consumed by presentation layers.
pub struct RecordQuery<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> RecordQuery<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// All sites by name, ties in creation order.
    pub fn list_sites(&self) -> RepoResult<Vec<Site>> {
        self.repo.list_sites()
    }

    /// Visits of a site, oldest date first.
    ///
    /// Fails with `NotFound` once the site has been deleted.
    pub fn visits_of(&self, site_id: SiteId) -> RepoResult<Vec<Visit>> {
        self.repo.list_visits(site_id)
    }

    /// Annotations of a visit, oldest date first.
    ///
    /// Fails with `NotFound` once the visit (or its site) has been deleted.
    pub fn annotations_of(&self, visit_id: VisitId) -> RepoResult<Vec<Annotation>> {
        self.repo.list_annotations(visit_id)
    }

    pub fn site(&self, id: SiteId) -> RepoResult<Option<Site>> {
        self.repo.get_site(id)
    }

    pub fn visit(&self, id: VisitId) -> RepoResult<Option<Visit>> {
        self.repo.get_visit(id)
    }
}
