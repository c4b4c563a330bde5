//! Core record store for the Obras site-inspection app.
//! This crate is the single source of truth for hierarchy invariants:
//! sites own visits, visits own annotations, deletes cascade.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::annotation::{Annotation, AnnotationId, AnnotationPatch};
pub use model::calendar::{format_calendar_date, parse_calendar_date, today_utc};
pub use model::site::{Site, SiteId, SitePatch, UNTITLED_SITE};
pub use model::validation::RecordValidationError;
pub use model::visit::{Visit, VisitId, VisitPatch};
pub use model::RecordKind;
pub use repo::cascade::CascadeReport;
pub use repo::record_repo::{RecordRepository, SqliteRecordRepository};
pub use repo::{RepoError, RepoResult};
pub use service::query::RecordQuery;
pub use service::record_service::RecordService;
pub use time::Date as CalendarDate;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
