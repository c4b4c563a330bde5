//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose site/visit/annotation use-cases to Dart via FRB.
//! - Translate ids and dates from their string forms at the boundary.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every failure is reported in the response envelope with a stable
//!   `error_code`; nothing is swallowed.
//! - Dates cross the boundary as `YYYY-MM-DD`.

use log::warn;
use obras_core::db::open_db;
use obras_core::{
    core_version as core_version_inner, format_calendar_date, init_logging as init_logging_inner,
    parse_calendar_date, ping as ping_inner, Annotation, AnnotationPatch, CalendarDate,
    CascadeReport, RecordQuery, RecordService, RepoError, Site, SitePatch,
    SqliteRecordRepository, Visit, VisitPatch,
};
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "obras_records.sqlite3";
const DB_PATH_ENV: &str = "OBRAS_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message on failure.
/// Safe to call repeatedly with the same `level + log_dir`.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Result envelope for create/update/delete calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created/updated/deleted record.
    pub id: Option<String>,
    /// `validation|dangling_parent|not_found|persistence|...` on failure.
    pub error_code: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(operation: &str, err: FfiError) -> Self {
        warn!(
            "event={operation} module=ffi status=error error_code={}",
            err.code
        );
        Self {
            ok: false,
            id: None,
            error_code: Some(err.code.to_string()),
            message: format!("{operation} failed: {}", err.message),
        }
    }
}

/// Site row for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteItem {
    pub id: String,
    pub name: String,
    /// `name`, or a placeholder when the name is blank.
    pub display_name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitItem {
    pub id: String,
    pub site_id: String,
    pub date: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationItem {
    pub id: String,
    pub visit_id: String,
    pub text: String,
    pub date: String,
}

/// Site listing envelope. `items` is empty when `ok` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteListResponse {
    pub ok: bool,
    pub items: Vec<SiteItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Visit listing envelope, oldest date first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitListResponse {
    pub ok: bool,
    pub items: Vec<VisitItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Annotation listing envelope, oldest date first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationListResponse {
    pub ok: bool,
    pub items: Vec<AnnotationItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Creates a site. Blank `location` is stored as absent.
#[flutter_rust_bridge::frb(sync)]
pub fn site_create(name: String, location: Option<String>) -> ActionResponse {
    match with_service(|service| Ok(service.create_site(name, location)?)) {
        Ok(site) => ActionResponse::success("Site created.", Some(site.id.to_string())),
        Err(err) => ActionResponse::failure("site_create", err),
    }
}

/// Updates a site. `None` keeps a field; `Some("")` clears the location.
#[flutter_rust_bridge::frb(sync)]
pub fn site_update(
    site_id: String,
    name: Option<String>,
    location: Option<String>,
) -> ActionResponse {
    let result = parse_id(&site_id, "site_id").and_then(|id| {
        with_service(|service| {
            let patch = SitePatch {
                name,
                location: location.map(Some),
            };
            Ok(service.update_site(id, patch)?)
        })
    });
    match result {
        Ok(site) => ActionResponse::success("Site updated.", Some(site.id.to_string())),
        Err(err) => ActionResponse::failure("site_update", err),
    }
}

/// Deletes a site with all of its visits and annotations.
#[flutter_rust_bridge::frb(sync)]
pub fn site_delete(site_id: String) -> ActionResponse {
    let result = parse_id(&site_id, "site_id")
        .and_then(|id| with_service(|service| Ok(service.delete_site(id)?)));
    match result {
        Ok(report) => ActionResponse::success(cascade_message(&report), Some(site_id)),
        Err(err) => ActionResponse::failure("site_delete", err),
    }
}

/// Deletes the sites at the given offsets of the current `sites_list` order.
/// Nothing is deleted when any offset is out of range.
#[flutter_rust_bridge::frb(sync)]
pub fn sites_delete_at(offsets: Vec<u32>) -> ActionResponse {
    let offsets: Vec<usize> = offsets.into_iter().map(|offset| offset as usize).collect();
    match with_service(|service| Ok(service.delete_sites_at(&offsets)?)) {
        Ok(report) => ActionResponse::success(cascade_message(&report), None),
        Err(err) => ActionResponse::failure("sites_delete_at", err),
    }
}

/// Lists all sites by name.
#[flutter_rust_bridge::frb(sync)]
pub fn sites_list() -> SiteListResponse {
    let result = with_query(|query| Ok(query.list_sites()?))
        .map(|sites| sites.iter().map(to_site_item).collect());
    let (ok, items, error_code, message) = split_listing("sites_list", result);
    SiteListResponse {
        ok,
        items,
        error_code,
        message,
    }
}

/// Creates a visit. `date` defaults to today when absent.
#[flutter_rust_bridge::frb(sync)]
pub fn visit_create(
    site_id: String,
    date: Option<String>,
    notes: Option<String>,
) -> ActionResponse {
    let result = parse_id(&site_id, "site_id").and_then(|site_id| {
        let date = parse_optional_date(date)?;
        with_service(|service| Ok(service.create_visit(site_id, date, notes)?))
    });
    match result {
        Ok(visit) => ActionResponse::success("Visit created.", Some(visit.id.to_string())),
        Err(err) => ActionResponse::failure("visit_create", err),
    }
}

/// Updates a visit. `None` keeps a field; `Some("")` clears the notes.
#[flutter_rust_bridge::frb(sync)]
pub fn visit_update(
    visit_id: String,
    date: Option<String>,
    notes: Option<String>,
) -> ActionResponse {
    let result = parse_id(&visit_id, "visit_id").and_then(|id| {
        let patch = VisitPatch {
            date: parse_optional_date(date)?,
            notes: notes.map(Some),
        };
        with_service(|service| Ok(service.update_visit(id, patch)?))
    });
    match result {
        Ok(visit) => ActionResponse::success("Visit updated.", Some(visit.id.to_string())),
        Err(err) => ActionResponse::failure("visit_update", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn visit_delete(visit_id: String) -> ActionResponse {
    let result = parse_id(&visit_id, "visit_id")
        .and_then(|id| with_service(|service| Ok(service.delete_visit(id)?)));
    match result {
        Ok(report) => ActionResponse::success(cascade_message(&report), Some(visit_id)),
        Err(err) => ActionResponse::failure("visit_delete", err),
    }
}

/// Lists the visits of a site, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn visits_of(site_id: String) -> VisitListResponse {
    let result = parse_id(&site_id, "site_id")
        .and_then(|id| with_query(|query| Ok(query.visits_of(id)?)))
        .map(|visits| visits.iter().map(to_visit_item).collect());
    let (ok, items, error_code, message) = split_listing("visits_of", result);
    VisitListResponse {
        ok,
        items,
        error_code,
        message,
    }
}

/// Creates an annotation. `date` defaults to today when absent.
#[flutter_rust_bridge::frb(sync)]
pub fn annotation_create(
    visit_id: String,
    text: String,
    date: Option<String>,
) -> ActionResponse {
    let result = parse_id(&visit_id, "visit_id").and_then(|visit_id| {
        let date = parse_optional_date(date)?;
        with_service(|service| Ok(service.create_annotation(visit_id, text, date)?))
    });
    match result {
        Ok(annotation) => {
            ActionResponse::success("Annotation created.", Some(annotation.id.to_string()))
        }
        Err(err) => ActionResponse::failure("annotation_create", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn annotation_update(
    annotation_id: String,
    text: Option<String>,
    date: Option<String>,
) -> ActionResponse {
    let result = parse_id(&annotation_id, "annotation_id").and_then(|id| {
        let patch = AnnotationPatch {
            text,
            date: parse_optional_date(date)?,
        };
        with_service(|service| Ok(service.update_annotation(id, patch)?))
    });
    match result {
        Ok(annotation) => {
            ActionResponse::success("Annotation updated.", Some(annotation.id.to_string()))
        }
        Err(err) => ActionResponse::failure("annotation_update", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn annotation_delete(annotation_id: String) -> ActionResponse {
    let result = parse_id(&annotation_id, "annotation_id")
        .and_then(|id| with_service(|service| Ok(service.delete_annotation(id)?)));
    match result {
        Ok(report) => ActionResponse::success(cascade_message(&report), Some(annotation_id)),
        Err(err) => ActionResponse::failure("annotation_delete", err),
    }
}

/// Lists the annotations of a visit, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn annotations_of(visit_id: String) -> AnnotationListResponse {
    let result = parse_id(&visit_id, "visit_id")
        .and_then(|id| with_query(|query| Ok(query.annotations_of(id)?)))
        .map(|annotations| annotations.iter().map(to_annotation_item).collect());
    let (ok, items, error_code, message) = split_listing("annotations_of", result);
    AnnotationListResponse {
        ok,
        items,
        error_code,
        message,
    }
}

/// Boundary error: stable code plus human-readable message.
struct FfiError {
    code: &'static str,
    message: String,
}

impl From<RepoError> for FfiError {
    fn from(value: RepoError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}

type Store<'conn> = SqliteRecordRepository<'conn>;

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_store<T>(f: impl FnOnce(Store<'_>) -> Result<T, FfiError>) -> Result<T, FfiError> {
    let conn = open_db(resolve_db_path()).map_err(|err| FfiError {
        code: "persistence",
        message: format!("record store open failed: {err}"),
    })?;
    let repo = SqliteRecordRepository::try_new(&conn)?;
    f(repo)
}

fn with_service<T>(
    f: impl FnOnce(&RecordService<Store<'_>>) -> Result<T, FfiError>,
) -> Result<T, FfiError> {
    with_store(|repo| f(&RecordService::new(repo)))
}

fn with_query<T>(
    f: impl FnOnce(&RecordQuery<Store<'_>>) -> Result<T, FfiError>,
) -> Result<T, FfiError> {
    with_store(|repo| f(&RecordQuery::new(repo)))
}

fn parse_id(value: &str, field: &str) -> Result<Uuid, FfiError> {
    Uuid::parse_str(value.trim()).map_err(|_| FfiError {
        code: "validation",
        message: format!("{field} is not a valid id: `{value}`"),
    })
}

fn parse_optional_date(value: Option<String>) -> Result<Option<CalendarDate>, FfiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_calendar_date(raw)
            .map(Some)
            .map_err(|err| FfiError {
                code: "validation",
                message: err.to_string(),
            }),
    }
}

/// Splits a listing result into `(ok, items, error_code, message)`.
fn split_listing<T>(
    operation: &str,
    result: Result<Vec<T>, FfiError>,
) -> (bool, Vec<T>, Option<String>, String) {
    match result {
        Ok(items) => {
            let message = format!("{} item(s).", items.len());
            (true, items, None, message)
        }
        Err(err) => {
            warn!(
                "event={operation} module=ffi status=error error_code={}",
                err.code
            );
            (
                false,
                Vec::new(),
                Some(err.code.to_string()),
                format!("{operation} failed: {}", err.message),
            )
        }
    }
}

fn cascade_message(report: &CascadeReport) -> String {
    format!(
        "Deleted {} site(s), {} visit(s), {} annotation(s).",
        report.sites, report.visits, report.annotations
    )
}

fn to_site_item(site: &Site) -> SiteItem {
    SiteItem {
        id: site.id.to_string(),
        name: site.name.clone(),
        display_name: site.display_name().to_string(),
        location: site.location.clone(),
    }
}

fn to_visit_item(visit: &Visit) -> VisitItem {
    VisitItem {
        id: visit.id.to_string(),
        site_id: visit.site_id.to_string(),
        date: format_calendar_date(visit.date),
        notes: visit.notes.clone(),
    }
}

fn to_annotation_item(annotation: &Annotation) -> AnnotationItem {
    AnnotationItem {
        id: annotation.id.to_string(),
        visit_id: annotation.visit_id.to_string(),
        text: annotation.text.clone(),
        date: format_calendar_date(annotation.date),
    }
}
