//! Hierarchy integrity rules applied inside record store transactions.
//!
//! # Responsibility
//! - Check parent existence before children are inserted.
//! - Reject live or retired identities on insert.
//! - Delete a record together with all of its descendants.
//!
//! # Invariants
//! - Callers pass an open transaction; these helpers never commit.
//! - Every deleted id is written to `retired_ids` in the same transaction.
//! - Descendants are removed before their parent, so foreign keys never see
//!   an orphan.

use super::{RepoError, RepoResult};
use crate::model::annotation::AnnotationId;
use crate::model::site::SiteId;
use crate::model::validation::RecordValidationError;
use crate::model::visit::VisitId;
use crate::model::RecordKind;
use rusqlite::{params, Connection};
use std::ops::AddAssign;
use uuid::Uuid;

/// Number of rows removed by one delete, per record kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub sites: usize,
    pub visits: usize,
    pub annotations: usize,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.sites + self.visits + self.annotations
    }
}

impl AddAssign for CascadeReport {
    fn add_assign(&mut self, rhs: Self) {
        self.sites += rhs.sites;
        self.visits += rhs.visits;
        self.annotations += rhs.annotations;
    }
}

pub(crate) fn record_exists(conn: &Connection, kind: RecordKind, id: Uuid) -> RepoResult<bool> {
    let sql = match kind {
        RecordKind::Site => "SELECT EXISTS(SELECT 1 FROM sites WHERE uuid = ?1);",
        RecordKind::Visit => "SELECT EXISTS(SELECT 1 FROM visits WHERE uuid = ?1);",
        RecordKind::Annotation => "SELECT EXISTS(SELECT 1 FROM annotations WHERE uuid = ?1);",
    };
    let exists: i64 = conn.query_row(sql, [id.to_string()], |row| row.get(0))?;
    Ok(exists == 1)
}

/// Fails with `DanglingParent` when the parent of a new record is missing.
pub(crate) fn ensure_parent_exists(
    conn: &Connection,
    parent_kind: RecordKind,
    parent_id: Uuid,
) -> RepoResult<()> {
    if record_exists(conn, parent_kind, parent_id)? {
        Ok(())
    } else {
        Err(RepoError::DanglingParent {
            kind: parent_kind,
            id: parent_id,
        })
    }
}

/// Fails with `NotFound` when the target of an update/delete/list is missing.
pub(crate) fn ensure_record_exists(conn: &Connection, kind: RecordKind, id: Uuid) -> RepoResult<()> {
    if record_exists(conn, kind, id)? {
        Ok(())
    } else {
        Err(RepoError::NotFound { kind, id })
    }
}

/// Rejects ids that are live in any table or were retired by a delete.
pub(crate) fn ensure_identity_unused(
    conn: &Connection,
    kind: RecordKind,
    id: Uuid,
) -> RepoResult<()> {
    let taken: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sites WHERE uuid = ?1)
             OR EXISTS(SELECT 1 FROM visits WHERE uuid = ?1)
             OR EXISTS(SELECT 1 FROM annotations WHERE uuid = ?1)
             OR EXISTS(SELECT 1 FROM retired_ids WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if taken == 1 {
        return Err(RecordValidationError::IdentityTaken { kind, id }.into());
    }
    Ok(())
}

/// Deletes one site, its visits and their annotations.
pub(crate) fn delete_site_tree(conn: &Connection, site_id: SiteId) -> RepoResult<CascadeReport> {
    ensure_record_exists(conn, RecordKind::Site, site_id)?;
    let site_key = site_id.to_string();

    conn.execute(
        "INSERT INTO retired_ids (uuid, kind)
         SELECT a.uuid, 'annotation'
         FROM annotations a
         INNER JOIN visits v ON v.uuid = a.visit_uuid
         WHERE v.site_uuid = ?1;",
        [site_key.as_str()],
    )?;
    let annotations = conn.execute(
        "DELETE FROM annotations
         WHERE visit_uuid IN (SELECT uuid FROM visits WHERE site_uuid = ?1);",
        [site_key.as_str()],
    )?;

    conn.execute(
        "INSERT INTO retired_ids (uuid, kind)
         SELECT uuid, 'visit' FROM visits WHERE site_uuid = ?1;",
        [site_key.as_str()],
    )?;
    let visits = conn.execute("DELETE FROM visits WHERE site_uuid = ?1;", [site_key.as_str()])?;

    retire(conn, RecordKind::Site, site_id)?;
    let sites = conn.execute("DELETE FROM sites WHERE uuid = ?1;", [site_key.as_str()])?;

    Ok(CascadeReport {
        sites,
        visits,
        annotations,
    })
}

/// Deletes one visit and its annotations.
pub(crate) fn delete_visit_tree(conn: &Connection, visit_id: VisitId) -> RepoResult<CascadeReport> {
    ensure_record_exists(conn, RecordKind::Visit, visit_id)?;
    let visit_key = visit_id.to_string();

    conn.execute(
        "INSERT INTO retired_ids (uuid, kind)
         SELECT uuid, 'annotation' FROM annotations WHERE visit_uuid = ?1;",
        [visit_key.as_str()],
    )?;
    let annotations = conn.execute(
        "DELETE FROM annotations WHERE visit_uuid = ?1;",
        [visit_key.as_str()],
    )?;

    retire(conn, RecordKind::Visit, visit_id)?;
    let visits = conn.execute("DELETE FROM visits WHERE uuid = ?1;", [visit_key.as_str()])?;

    Ok(CascadeReport {
        sites: 0,
        visits,
        annotations,
    })
}

pub(crate) fn delete_annotation_row(
    conn: &Connection,
    annotation_id: AnnotationId,
) -> RepoResult<CascadeReport> {
    ensure_record_exists(conn, RecordKind::Annotation, annotation_id)?;
    retire(conn, RecordKind::Annotation, annotation_id)?;
    let annotations = conn.execute(
        "DELETE FROM annotations WHERE uuid = ?1;",
        [annotation_id.to_string()],
    )?;
    Ok(CascadeReport {
        annotations,
        ..CascadeReport::default()
    })
}

fn retire(conn: &Connection, kind: RecordKind, id: Uuid) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO retired_ids (uuid, kind) VALUES (?1, ?2);",
        params![id.to_string(), kind.as_str()],
    )?;
    Ok(())
}
