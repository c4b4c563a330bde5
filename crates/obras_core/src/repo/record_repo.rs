//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Create, read, patch and delete sites, visits and annotations.
//! - Produce the ordered listings consumed by the query facade.
//!
//! # Invariants
//! - Sites list by `name ASC` with creation order (`seq ASC`) as tie-break.
//! - Children list by date (`*_day ASC`) then creation order. Listings are
//!   computed per call and never cached.
//! - Writes run in `BEGIN IMMEDIATE` transactions so concurrent writers on the
//!   same file are serialized by SQLite's file lock.
//! - Child inserts verify the parent inside the same transaction.

use super::cascade::{
    delete_annotation_row, delete_site_tree, delete_visit_tree, ensure_identity_unused,
    ensure_parent_exists, ensure_record_exists, CascadeReport,
};
use super::{RepoError, RepoResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::model::annotation::{Annotation, AnnotationId, AnnotationPatch};
use crate::model::site::{Site, SiteId, SitePatch};
use crate::model::visit::{Visit, VisitId, VisitPatch};
use crate::model::RecordKind;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use time::Date;
use uuid::Uuid;

const SITE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    location,
    created_at,
    updated_at
FROM sites";

const VISIT_SELECT_SQL: &str = "SELECT
    uuid,
    site_uuid,
    visit_day,
    notes,
    created_at,
    updated_at
FROM visits";

const ANNOTATION_SELECT_SQL: &str = "SELECT
    uuid,
    visit_uuid,
    body,
    note_day,
    created_at,
    updated_at
FROM annotations";

const REQUIRED_TABLES: [&str; 4] = ["sites", "visits", "annotations", "retired_ids"];

/// Repository interface for the site/visit/annotation hierarchy.
pub trait RecordRepository {
    /// Persists a new site and returns the stored row.
    fn create_site(&self, site: &Site) -> RepoResult<Site>;
    /// Persists a new visit under an existing site.
    fn create_visit(&self, visit: &Visit) -> RepoResult<Visit>;
    /// Persists a new annotation under an existing visit.
    fn create_annotation(&self, annotation: &Annotation) -> RepoResult<Annotation>;

    fn get_site(&self, id: SiteId) -> RepoResult<Option<Site>>;
    fn get_visit(&self, id: VisitId) -> RepoResult<Option<Visit>>;
    fn get_annotation(&self, id: AnnotationId) -> RepoResult<Option<Annotation>>;

    /// Applies a partial update and returns the stored row.
    fn update_site(&self, id: SiteId, patch: &SitePatch) -> RepoResult<Site>;
    fn update_visit(&self, id: VisitId, patch: &VisitPatch) -> RepoResult<Visit>;
    fn update_annotation(&self, id: AnnotationId, patch: &AnnotationPatch)
        -> RepoResult<Annotation>;

    /// Lists every site by name, then creation order.
    fn list_sites(&self) -> RepoResult<Vec<Site>>;
    /// Lists visits of one site by date, then creation order.
    fn list_visits(&self, site_id: SiteId) -> RepoResult<Vec<Visit>>;
    /// Lists annotations of one visit by date, then creation order.
    fn list_annotations(&self, visit_id: VisitId) -> RepoResult<Vec<Annotation>>;

    /// Deletes a site with all of its visits and annotations.
    fn delete_site(&self, id: SiteId) -> RepoResult<CascadeReport>;
    /// Deletes several sites in one transaction; any failure deletes nothing.
    fn delete_sites(&self, ids: &[SiteId]) -> RepoResult<CascadeReport>;
    /// Deletes a visit with all of its annotations.
    fn delete_visit(&self, id: VisitId) -> RepoResult<CascadeReport>;
    fn delete_annotation(&self, id: AnnotationId) -> RepoResult<CascadeReport>;
}

/// SQLite-backed record store.
#[derive(Clone, Copy)]
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn write_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn read_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Deferred,
        )?)
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create_site(&self, site: &Site) -> RepoResult<Site> {
        site.validate()?;

        let tx = self.write_tx()?;
        ensure_identity_unused(&tx, RecordKind::Site, site.id)?;
        tx.execute(
            "INSERT INTO sites (uuid, name, location) VALUES (?1, ?2, ?3);",
            params![site.id.to_string(), site.name.as_str(), site.location.as_deref()],
        )?;
        let created = load_required_site(&tx, site.id)?;
        tx.commit()?;
        Ok(created)
    }

    fn create_visit(&self, visit: &Visit) -> RepoResult<Visit> {
        visit.validate()?;

        let tx = self.write_tx()?;
        ensure_identity_unused(&tx, RecordKind::Visit, visit.id)?;
        ensure_parent_exists(&tx, RecordKind::Site, visit.site_id)?;
        tx.execute(
            "INSERT INTO visits (uuid, site_uuid, visit_day, notes) VALUES (?1, ?2, ?3, ?4);",
            params![
                visit.id.to_string(),
                visit.site_id.to_string(),
                visit.date.to_julian_day(),
                visit.notes.as_deref(),
            ],
        )?;
        let created = load_required_visit(&tx, visit.id)?;
        tx.commit()?;
        Ok(created)
    }

    fn create_annotation(&self, annotation: &Annotation) -> RepoResult<Annotation> {
        annotation.validate()?;

        let tx = self.write_tx()?;
        ensure_identity_unused(&tx, RecordKind::Annotation, annotation.id)?;
        ensure_parent_exists(&tx, RecordKind::Visit, annotation.visit_id)?;
        tx.execute(
            "INSERT INTO annotations (uuid, visit_uuid, body, note_day) VALUES (?1, ?2, ?3, ?4);",
            params![
                annotation.id.to_string(),
                annotation.visit_id.to_string(),
                annotation.text.as_str(),
                annotation.date.to_julian_day(),
            ],
        )?;
        let created = load_required_annotation(&tx, annotation.id)?;
        tx.commit()?;
        Ok(created)
    }

    fn get_site(&self, id: SiteId) -> RepoResult<Option<Site>> {
        query_site(self.conn, id)
    }

    fn get_visit(&self, id: VisitId) -> RepoResult<Option<Visit>> {
        query_visit(self.conn, id)
    }

    fn get_annotation(&self, id: AnnotationId) -> RepoResult<Option<Annotation>> {
        query_annotation(self.conn, id)
    }

    fn update_site(&self, id: SiteId, patch: &SitePatch) -> RepoResult<Site> {
        let tx = self.write_tx()?;
        let mut site = load_required_site(&tx, id)?;
        if patch.is_empty() {
            return Ok(site);
        }

        patch.apply(&mut site);
        site.validate()?;
        tx.execute(
            "UPDATE sites
             SET name = ?2,
                 location = ?3,
                 updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), site.name.as_str(), site.location.as_deref()],
        )?;
        let updated = load_required_site(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn update_visit(&self, id: VisitId, patch: &VisitPatch) -> RepoResult<Visit> {
        let tx = self.write_tx()?;
        let mut visit = load_required_visit(&tx, id)?;
        if patch.is_empty() {
            return Ok(visit);
        }

        patch.apply(&mut visit);
        visit.validate()?;
        tx.execute(
            "UPDATE visits
             SET visit_day = ?2,
                 notes = ?3,
                 updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), visit.date.to_julian_day(), visit.notes.as_deref()],
        )?;
        let updated = load_required_visit(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn update_annotation(
        &self,
        id: AnnotationId,
        patch: &AnnotationPatch,
    ) -> RepoResult<Annotation> {
        let tx = self.write_tx()?;
        let mut annotation = load_required_annotation(&tx, id)?;
        if patch.is_empty() {
            return Ok(annotation);
        }

        patch.apply(&mut annotation);
        annotation.validate()?;
        tx.execute(
            "UPDATE annotations
             SET body = ?2,
                 note_day = ?3,
                 updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                annotation.text.as_str(),
                annotation.date.to_julian_day(),
            ],
        )?;
        let updated = load_required_annotation(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn list_sites(&self) -> RepoResult<Vec<Site>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SITE_SELECT_SQL} ORDER BY name ASC, seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut sites = Vec::new();
        while let Some(row) = rows.next()? {
            sites.push(parse_site_row(row)?);
        }
        Ok(sites)
    }

    fn list_visits(&self, site_id: SiteId) -> RepoResult<Vec<Visit>> {
        let tx = self.read_tx()?;
        ensure_record_exists(&tx, RecordKind::Site, site_id)?;

        let mut visits = Vec::new();
        {
            let mut stmt = tx.prepare(&format!(
                "{VISIT_SELECT_SQL}
                 WHERE site_uuid = ?1
                 ORDER BY visit_day ASC, seq ASC;"
            ))?;
            let mut rows = stmt.query([site_id.to_string()])?;
            while let Some(row) = rows.next()? {
                visits.push(parse_visit_row(row)?);
            }
        }
        tx.commit()?;
        Ok(visits)
    }

    fn list_annotations(&self, visit_id: VisitId) -> RepoResult<Vec<Annotation>> {
        let tx = self.read_tx()?;
        ensure_record_exists(&tx, RecordKind::Visit, visit_id)?;

        let mut annotations = Vec::new();
        {
            let mut stmt = tx.prepare(&format!(
                "{ANNOTATION_SELECT_SQL}
                 WHERE visit_uuid = ?1
                 ORDER BY note_day ASC, seq ASC;"
            ))?;
            let mut rows = stmt.query([visit_id.to_string()])?;
            while let Some(row) = rows.next()? {
                annotations.push(parse_annotation_row(row)?);
            }
        }
        tx.commit()?;
        Ok(annotations)
    }

    fn delete_site(&self, id: SiteId) -> RepoResult<CascadeReport> {
        let tx = self.write_tx()?;
        let report = delete_site_tree(&tx, id)?;
        tx.commit()?;
        Ok(report)
    }

    fn delete_sites(&self, ids: &[SiteId]) -> RepoResult<CascadeReport> {
        let mut unique_ids: Vec<SiteId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique_ids.contains(id) {
                unique_ids.push(*id);
            }
        }

        let tx = self.write_tx()?;
        let mut report = CascadeReport::default();
        for id in unique_ids {
            report += delete_site_tree(&tx, id)?;
        }
        tx.commit()?;
        Ok(report)
    }

    fn delete_visit(&self, id: VisitId) -> RepoResult<CascadeReport> {
        let tx = self.write_tx()?;
        let report = delete_visit_tree(&tx, id)?;
        tx.commit()?;
        Ok(report)
    }

    fn delete_annotation(&self, id: AnnotationId) -> RepoResult<CascadeReport> {
        let tx = self.write_tx()?;
        let report = delete_annotation_row(&tx, id)?;
        tx.commit()?;
        Ok(report)
    }
}

fn query_site(conn: &Connection, id: SiteId) -> RepoResult<Option<Site>> {
    let mut stmt = conn.prepare(&format!("{SITE_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_site_row(row)?));
    }
    Ok(None)
}

fn query_visit(conn: &Connection, id: VisitId) -> RepoResult<Option<Visit>> {
    let mut stmt = conn.prepare(&format!("{VISIT_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_visit_row(row)?));
    }
    Ok(None)
}

fn query_annotation(conn: &Connection, id: AnnotationId) -> RepoResult<Option<Annotation>> {
    let mut stmt = conn.prepare(&format!("{ANNOTATION_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_annotation_row(row)?));
    }
    Ok(None)
}

fn load_required_site(conn: &Connection, id: SiteId) -> RepoResult<Site> {
    query_site(conn, id)?.ok_or(RepoError::NotFound {
        kind: RecordKind::Site,
        id,
    })
}

fn load_required_visit(conn: &Connection, id: VisitId) -> RepoResult<Visit> {
    query_visit(conn, id)?.ok_or(RepoError::NotFound {
        kind: RecordKind::Visit,
        id,
    })
}

fn load_required_annotation(conn: &Connection, id: AnnotationId) -> RepoResult<Annotation> {
    query_annotation(conn, id)?.ok_or(RepoError::NotFound {
        kind: RecordKind::Annotation,
        id,
    })
}

fn parse_site_row(row: &Row<'_>) -> RepoResult<Site> {
    let uuid_text: String = row.get("uuid")?;
    let site = Site {
        id: parse_uuid(&uuid_text, "sites.uuid")?,
        name: row.get("name")?,
        location: row.get("location")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    site.validate()?;
    Ok(site)
}

fn parse_visit_row(row: &Row<'_>) -> RepoResult<Visit> {
    let uuid_text: String = row.get("uuid")?;
    let site_text: String = row.get("site_uuid")?;
    let visit = Visit {
        id: parse_uuid(&uuid_text, "visits.uuid")?,
        site_id: parse_uuid(&site_text, "visits.site_uuid")?,
        date: parse_day(row.get("visit_day")?, "visits.visit_day")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    visit.validate()?;
    Ok(visit)
}

fn parse_annotation_row(row: &Row<'_>) -> RepoResult<Annotation> {
    let uuid_text: String = row.get("uuid")?;
    let visit_text: String = row.get("visit_uuid")?;
    let annotation = Annotation {
        id: parse_uuid(&uuid_text, "annotations.uuid")?,
        visit_id: parse_uuid(&visit_text, "annotations.visit_uuid")?,
        text: row.get("body")?,
        date: parse_day(row.get("note_day")?, "annotations.note_day")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    annotation.validate()?;
    Ok(annotation)
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_day(value: i64, column: &'static str) -> RepoResult<Date> {
    i32::try_from(value)
        .ok()
        .and_then(|day| Date::from_julian_day(day).ok())
        .ok_or_else(|| RepoError::InvalidData(format!("invalid julian day `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::InvalidData(format!(
                "record store requires table `{table}`"
            )));
        }
    }

    Ok(())
}
