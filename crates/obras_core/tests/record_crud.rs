use obras_core::db::open_db_in_memory;
use obras_core::{
    AnnotationPatch, RecordKind, RecordRepository, RecordService, RecordValidationError,
    RepoError, Site, SitePatch, SqliteRecordRepository, Visit, VisitPatch,
};
use std::collections::HashSet;
use time::{Date, Month};
use uuid::Uuid;

fn day(year: i32, month: Month, day: u8) -> Date {
    Date::from_calendar_date(year, month, day).unwrap()
}

#[test]
fn create_site_roundtrip_normalizes_input() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let created = service
        .create_site("  Plant A ", Some("   ".to_string()))
        .unwrap();
    assert_eq!(created.name, "Plant A");
    assert_eq!(created.location, None);
    assert!(created.created_at > 0);

    let loaded = repo.get_site(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn blank_site_name_is_allowed_and_displays_placeholder() {
    let conn = open_db_in_memory().unwrap();
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn).unwrap());

    let created = service.create_site("", None).unwrap();
    assert_eq!(created.name, "");
    assert_eq!(created.display_name(), "Untitled site");
}

#[test]
fn site_ids_are_unique_and_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let mut seen = HashSet::new();
    for index in 0..20 {
        let site = service.create_site(format!("Site {index}"), None).unwrap();
        assert!(seen.insert(site.id));
        if index % 2 == 0 {
            service.delete_site(site.id).unwrap();
        }
    }

    let retired = *seen.iter().next().unwrap();
    let mut reused = Site::new("again", None);
    reused.id = retired;
    let err = repo.create_site(&reused).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::IdentityTaken { id, .. }) if id == retired
    ));
}

#[test]
fn create_site_rejects_nil_id_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();

    let mut site = Site::new("nil", None);
    site.id = Uuid::nil();
    let err = repo.create_site(&site).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::NilId(RecordKind::Site))
    ));
    assert!(repo.list_sites().unwrap().is_empty());
}

#[test]
fn create_visit_with_missing_site_is_dangling_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let ghost = Uuid::new_v4();
    let err = service
        .create_visit(ghost, Some(day(2024, Month::March, 1)), None)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::DanglingParent { kind: RecordKind::Site, id } if id == ghost
    ));

    let visits: i64 = conn
        .query_row("SELECT COUNT(*) FROM visits;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(visits, 0);
}

#[test]
fn create_annotation_with_deleted_visit_is_dangling() {
    let conn = open_db_in_memory().unwrap();
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn).unwrap());

    let site = service.create_site("Depot", None).unwrap();
    let visit = service.create_visit(site.id, None, None).unwrap();
    service.delete_visit(visit.id).unwrap();

    let err = service
        .create_annotation(visit.id, "crack in slab", None)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::DanglingParent { kind: RecordKind::Visit, id } if id == visit.id
    ));
}

#[test]
fn create_annotation_rejects_blank_text() {
    let conn = open_db_in_memory().unwrap();
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn).unwrap());

    let site = service.create_site("Depot", None).unwrap();
    let visit = service.create_visit(site.id, None, None).unwrap();
    let err = service.create_annotation(visit.id, "   ", None).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::BlankText)
    ));
}

#[test]
fn missing_dates_default_to_today() {
    let conn = open_db_in_memory().unwrap();
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn).unwrap());

    let before = obras_core::today_utc();
    let site = service.create_site("Depot", None).unwrap();
    let visit = service.create_visit(site.id, None, None).unwrap();
    let annotation = service.create_annotation(visit.id, "ok", None).unwrap();
    let after = obras_core::today_utc();

    assert!(visit.date >= before && visit.date <= after);
    assert!(annotation.date >= before && annotation.date <= after);
}

#[test]
fn update_site_replaces_only_patched_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let site = service
        .create_site("Plant A", Some("Zaragoza".to_string()))
        .unwrap();
    service
        .update_site(
            site.id,
            SitePatch {
                name: Some("Plant B".to_string()),
                location: None,
            },
        )
        .unwrap();

    let loaded = repo.get_site(site.id).unwrap().unwrap();
    assert_eq!(loaded.id, site.id);
    assert_eq!(loaded.name, "Plant B");
    assert_eq!(loaded.location.as_deref(), Some("Zaragoza"));

    let cleared = service
        .update_site(
            site.id,
            SitePatch {
                name: None,
                location: Some(None),
            },
        )
        .unwrap();
    assert_eq!(cleared.name, "Plant B");
    assert_eq!(cleared.location, None);
}

#[test]
fn update_visit_and_annotation_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let site = service.create_site("Plant A", None).unwrap();
    let visit = service
        .create_visit(
            site.id,
            Some(day(2024, Month::January, 10)),
            Some("first pass".to_string()),
        )
        .unwrap();
    let annotation = service
        .create_annotation(visit.id, "leak found", Some(day(2024, Month::January, 10)))
        .unwrap();

    service
        .update_visit(
            visit.id,
            VisitPatch {
                date: Some(day(2024, Month::February, 2)),
                notes: None,
            },
        )
        .unwrap();
    service
        .update_annotation(
            annotation.id,
            AnnotationPatch {
                text: Some("leak fixed".to_string()),
                date: None,
            },
        )
        .unwrap();

    let loaded_visit = repo.get_visit(visit.id).unwrap().unwrap();
    assert_eq!(loaded_visit.date, day(2024, Month::February, 2));
    assert_eq!(loaded_visit.notes.as_deref(), Some("first pass"));
    assert_eq!(loaded_visit.site_id, site.id);

    let loaded_annotation = repo.get_annotation(annotation.id).unwrap().unwrap();
    assert_eq!(loaded_annotation.text, "leak fixed");
    assert_eq!(loaded_annotation.date, day(2024, Month::January, 10));
    assert_eq!(loaded_annotation.visit_id, visit.id);
}

#[test]
fn update_of_missing_record_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn).unwrap());

    let ghost = Uuid::new_v4();
    let err = service
        .update_site(
            ghost,
            SitePatch {
                name: Some("x".to_string()),
                location: None,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { kind: RecordKind::Site, id } if id == ghost
    ));

    let err = service
        .update_visit(ghost, VisitPatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { kind: RecordKind::Visit, .. }));
}

#[test]
fn update_annotation_rejects_blank_text_and_keeps_old_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let site = service.create_site("Plant A", None).unwrap();
    let visit = service.create_visit(site.id, None, None).unwrap();
    let annotation = service.create_annotation(visit.id, "keep me", None).unwrap();

    let err = service
        .update_annotation(
            annotation.id,
            AnnotationPatch {
                text: Some("  ".to_string()),
                date: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "validation");
    assert_eq!(
        repo.get_annotation(annotation.id).unwrap().unwrap().text,
        "keep me"
    );
}

#[test]
fn duplicate_visit_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let service = RecordService::new(repo);

    let site = service.create_site("Plant A", None).unwrap();
    let visit = Visit::new(site.id, day(2024, Month::May, 5), None);
    repo.create_visit(&visit).unwrap();

    let err = repo.create_visit(&visit).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(RecordValidationError::IdentityTaken {
            kind: RecordKind::Visit,
            ..
        })
    ));
    assert_eq!(repo.list_visits(site.id).unwrap().len(), 1);
}
