//! Relational backend over SQLite.
//!
//! Collections live as real SQL tables whose schema grows on demand:
//! `id INTEGER PRIMARY KEY` always exists, and every new field seen on
//! insert or update becomes an `ALTER TABLE ... ADD COLUMN`. Values
//! cross the boundary through [`super::coerce`], whose write-only
//! coercion (and the read-side asymmetry that follows from it) is
//! documented there.
//!
//! Predicates are *not* compiled to SQL. Each query scans the table and
//! evaluates the same in-process predicate conjunction the embedded
//! backend uses, because the numeric-or-lexical comparison rule is not
//! expressible in portable SQL and the two backends must agree exactly.
//!
//! Once this backend is selected it is never swapped out: a connection
//! failure at call time surfaces as `BackendUnavailable`, it does not
//! fall back to the embedded store.

use crate::backend::coerce::{from_sql, to_sql};
use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::guard::{CleanupRule, GuardRule, GuardViolation};
use crate::query::QuerySpec;
use flatdb_value::{Record, ID_FIELD};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// The relational backend: one shared SQLite connection for the process
/// lifetime.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens the backend, probing the connection so that selection can
    /// fail fast at startup instead of hanging the process.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BackendUnavailable`] if the database cannot
    /// be opened or the probe query fails.
    pub fn open(path: &Path, connect_timeout: Duration) -> CoreResult<Self> {
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.busy_timeout(connect_timeout).map_err(sql_err)?;
        conn.query_row("SELECT 1", [], |_| Ok(())).map_err(sql_err)?;
        debug!(path = %path.display(), "opened relational backend");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory backend.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BackendUnavailable`] if SQLite cannot open
    /// an in-memory database.
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Backend for SqliteBackend {
    fn scan(&self, table: &str) -> CoreResult<Vec<Record>> {
        let conn = self.conn.lock();
        scan_conn(&conn, table)
    }

    fn insert(&self, table: &str, record: Record) -> CoreResult<i64> {
        let quoted = quote_ident(table)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(sql_err)?;

        tx.execute(
            &format!("CREATE TABLE IF NOT EXISTS {quoted} (id INTEGER PRIMARY KEY)"),
            [],
        )
        .map_err(sql_err)?;
        ensure_columns(&tx, table, &record)?;

        let id: i64 = tx
            .query_row(
                &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {quoted}"),
                [],
                |row| row.get(0),
            )
            .map_err(sql_err)?;

        let mut columns = vec![format!("\"{ID_FIELD}\"")];
        let mut params = vec![SqlValue::Integer(id)];
        for (field, value) in record.iter() {
            columns.push(quote_ident(field)?);
            params.push(to_sql(value));
        }
        let placeholders = vec!["?"; params.len()].join(", ");
        tx.execute(
            &format!(
                "INSERT INTO {quoted} ({}) VALUES ({placeholders})",
                columns.join(", ")
            ),
            params_from_iter(params),
        )
        .map_err(sql_err)?;

        tx.commit().map_err(sql_err)?;
        Ok(id)
    }

    fn update(&self, spec: &QuerySpec, patch: &Record) -> CoreResult<usize> {
        let quoted = quote_ident(&spec.table)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(sql_err)?;

        let ids = matching_ids(&tx, spec)?;
        let assignments: Vec<(&str, SqlValue)> = patch
            .iter()
            .filter(|&(field, _)| field != ID_FIELD)
            .map(|(field, value)| (field, to_sql(value)))
            .collect();

        if !ids.is_empty() && !assignments.is_empty() {
            ensure_columns(&tx, &spec.table, patch)?;
            let mut set_clauses = Vec::with_capacity(assignments.len());
            let mut params = Vec::with_capacity(assignments.len() + ids.len());
            for (field, value) in assignments {
                set_clauses.push(format!("{} = ?", quote_ident(field)?));
                params.push(value);
            }
            let id_marks = vec!["?"; ids.len()].join(", ");
            params.extend(ids.iter().map(|id| SqlValue::Integer(*id)));
            tx.execute(
                &format!(
                    "UPDATE {quoted} SET {} WHERE id IN ({id_marks})",
                    set_clauses.join(", ")
                ),
                params_from_iter(params),
            )
            .map_err(sql_err)?;
        }

        tx.commit().map_err(sql_err)?;
        Ok(ids.len())
    }

    fn delete(&self, spec: &QuerySpec) -> CoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(sql_err)?;
        let removed = delete_matching(&tx, spec)?;
        tx.commit().map_err(sql_err)?;
        Ok(removed)
    }

    fn guard_delete(
        &self,
        table: &str,
        id: i64,
        guards: &[GuardRule],
        cleanups: &[CleanupRule],
    ) -> CoreResult<bool> {
        let quoted = quote_ident(table)?;
        let mut conn = self.conn.lock();
        // One transaction spans the whole check-then-act sequence, so a
        // blocking guard rolls everything back untouched.
        let tx = conn.transaction().map_err(sql_err)?;

        let mut blockers = Vec::new();
        for guard in guards {
            let records = scan_conn(&tx, &guard.table)?;
            let count = guard.count_matches(&records);
            if count > 0 {
                blockers.push(GuardViolation {
                    label: guard.display_label().to_string(),
                    count,
                });
            }
        }
        if !blockers.is_empty() {
            debug!(table, id, blocked_by = blockers.len(), "guarded delete refused");
            return Err(CoreError::GuardBlocked { blockers });
        }

        for cleanup in cleanups {
            let mut spec = QuerySpec::new(cleanup.table.clone());
            spec.predicates = cleanup.predicates.clone();
            delete_matching(&tx, &spec)?;
        }

        let existed = if table_exists(&tx, table)? {
            tx.execute(&format!("DELETE FROM {quoted} WHERE id = ?"), [id])
                .map_err(sql_err)?
                > 0
        } else {
            false
        };

        tx.commit().map_err(sql_err)?;
        Ok(existed)
    }
}

fn sql_err(err: rusqlite::Error) -> CoreError {
    CoreError::backend_unavailable(err.to_string())
}

/// Validates and quotes a table or column name for interpolation.
///
/// Only `[A-Za-z_][A-Za-z0-9_]*` is accepted; everything else is
/// rejected rather than escaped.
fn quote_ident(name: &str) -> CoreResult<String> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CoreError::invalid_identifier(name));
    }
    Ok(format!("\"{name}\""))
}

fn table_exists(conn: &Connection, table: &str) -> CoreResult<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
    .map_err(sql_err)
}

/// Adds any column the record uses that the table does not yet have.
fn ensure_columns(conn: &Connection, table: &str, record: &Record) -> CoreResult<()> {
    let quoted = quote_ident(table)?;
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({quoted})"))
        .map_err(sql_err)?;
    let existing: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(sql_err)?
        .collect::<Result<_, _>>()
        .map_err(sql_err)?;
    drop(stmt);

    for field in record.field_names() {
        if field != ID_FIELD && !existing.iter().any(|c| c == field) {
            conn.execute(
                &format!("ALTER TABLE {quoted} ADD COLUMN {}", quote_ident(field)?),
                [],
            )
            .map_err(sql_err)?;
        }
    }
    Ok(())
}

/// Full scan of a table, in insertion (identifier) order.
///
/// NULL columns are omitted from the resulting records; everything else
/// comes back exactly as stored, without undoing write-side coercion.
fn scan_conn(conn: &Connection, table: &str) -> CoreResult<Vec<Record>> {
    if !table_exists(conn, table)? {
        return Ok(Vec::new());
    }
    let quoted = quote_ident(table)?;
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {quoted} ORDER BY id"))
        .map_err(sql_err)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([]).map_err(sql_err)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(sql_err)? {
        let mut record = Record::new();
        for (index, column) in columns.iter().enumerate() {
            let value = row.get_ref(index).map_err(sql_err)?;
            if let Some(value) = from_sql(value) {
                record.set(column.clone(), value);
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Identifiers of the records matching a spec, found by the shared
/// in-process evaluator.
fn matching_ids(conn: &Connection, spec: &QuerySpec) -> CoreResult<Vec<i64>> {
    Ok(scan_conn(conn, &spec.table)?
        .iter()
        .filter(|record| spec.matches(record))
        .filter_map(Record::id)
        .collect())
}

fn delete_matching(conn: &Connection, spec: &QuerySpec) -> CoreResult<usize> {
    let ids = matching_ids(conn, spec)?;
    if ids.is_empty() {
        return Ok(0);
    }
    let quoted = quote_ident(&spec.table)?;
    let marks = vec!["?"; ids.len()].join(", ");
    conn.execute(
        &format!("DELETE FROM {quoted} WHERE id IN ({marks})"),
        params_from_iter(ids.iter()),
    )
    .map_err(sql_err)?;
    Ok(ids.len())
}
