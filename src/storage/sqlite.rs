//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};
use crate::{Error, Result};
use crate::student::{Field, Status, StudentInput, StudentRecord};
use super::schema;
use super::store::{GroupField, GroupedCounts, ListQuery, Page, StudentStore, PAGE_SIZE};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const STUDENT_COLUMNS: &str =
    "id, nisn, name, class, major, score, status, notes, created_at, updated_at";

/// SQLite-backed storage for student records
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::connect(path)?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a database whose schema is already in place. Used on the
    /// request path, where the schema was created at server start.
    pub fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Start a write transaction holding the RESERVED lock up front.
    ///
    /// A deferred transaction that reads before writing cannot upgrade its
    /// lock while another connection writes, and SQLite fails it with
    /// SQLITE_BUSY without consulting the busy timeout.
    fn begin_write(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?)
    }

    /// Fail with a `nisn` violation if another record already holds `nisn`
    fn ensure_unique_nisn(conn: &Connection, nisn: &str, exclude_id: Option<i64>) -> Result<()> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM students WHERE nisn = ?1 AND (?2 IS NULL OR id != ?2)",
                params![nisn, exclude_id],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Err(Error::constraint(Field::Nisn, "NISN is already registered"));
        }
        Ok(())
    }

    fn query_students(&self, sql: &str, binds: Vec<Value>) -> Result<Vec<StudentRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let students = stmt
            .query_map(params_from_iter(binds), row_to_student)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }
}

impl StudentStore for SqliteStore {
    fn find_by_nisn(&self, nisn: &str) -> Result<Option<StudentRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE nisn = ?1"),
                [nisn],
                row_to_student,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get(&self, id: i64) -> Result<Option<StudentRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
                [id],
                row_to_student,
            )
            .optional()
            .map_err(Into::into)
    }

    fn count(&self, status: Option<Status>) -> Result<u64> {
        let count: i64 = match status {
            Some(status) => self.conn.query_row(
                "SELECT COUNT(*) FROM students WHERE status = ?1",
                [status.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn count_grouped(&self, field: GroupField) -> Result<GroupedCounts> {
        let column = field.column();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column}, status, COUNT(*) FROM students GROUP BY {column}, status"
        ))?;

        let rows = stmt
            .query_map([], |row| {
                let group: String = row.get(0)?;
                let status = parse_status(row, 1)?;
                let count: i64 = row.get(2)?;
                Ok((group, status, count as u64))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = GroupedCounts::new();
        for (group, status, count) in rows {
            counts.insert(group, status, count);
        }
        Ok(counts)
    }

    fn recent(&self, status: Status, limit: usize) -> Result<Vec<StudentRecord>> {
        self.query_students(
            &format!(
                "SELECT {STUDENT_COLUMNS} FROM students
                 WHERE status = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2"
            ),
            vec![
                Value::Text(status.as_str().to_string()),
                Value::Integer(limit as i64),
            ],
        )
    }

    fn insert(&self, input: &StudentInput) -> Result<StudentRecord> {
        input.validate()?;

        let tx = self.begin_write()?;
        Self::ensure_unique_nisn(&tx, &input.nisn, None)?;

        let now = timestamp_now();
        tx.execute(
            r#"
            INSERT INTO students (nisn, name, class, major, score, status, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                input.nisn,
                input.name.trim(),
                input.class.trim(),
                input.major.trim(),
                input.stored_score(),
                input.status.as_str(),
                input.stored_notes(),
                now,
            ],
        )
        .map_err(map_write_error)?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!("Inserted student {} (nisn {})", id, input.nisn);
        self.get(id)?.ok_or(Error::RecordNotFound(id))
    }

    fn update(&self, id: i64, input: &StudentInput) -> Result<StudentRecord> {
        input.validate()?;

        let tx = self.begin_write()?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM students WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(Error::RecordNotFound(id));
        }
        Self::ensure_unique_nisn(&tx, &input.nisn, Some(id))?;

        tx.execute(
            r#"
            UPDATE students
            SET nisn = ?1, name = ?2, class = ?3, major = ?4, score = ?5,
                status = ?6, notes = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
            params![
                input.nisn,
                input.name.trim(),
                input.class.trim(),
                input.major.trim(),
                input.stored_score(),
                input.status.as_str(),
                input.stored_notes(),
                timestamp_now(),
                id,
            ],
        )
        .map_err(map_write_error)?;
        tx.commit()?;

        tracing::debug!("Updated student {}", id);
        self.get(id)?.ok_or(Error::RecordNotFound(id))
    }

    fn delete(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM students WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::RecordNotFound(id));
        }
        tracing::debug!("Deleted student {}", id);
        Ok(())
    }

    fn list(&self, query: &ListQuery) -> Result<Page<StudentRecord>> {
        let mut clause = String::from(" WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clause.push_str(" AND (name LIKE ? OR nisn LIKE ? OR class LIKE ? OR major LIKE ?)");
            let pattern = format!("%{}%", search);
            for _ in 0..4 {
                binds.push(Value::Text(pattern.clone()));
            }
        }

        if let Some(status) = query.status {
            clause.push_str(" AND status = ?");
            binds.push(Value::Text(status.as_str().to_string()));
        }

        if let Some(class) = &query.class {
            clause.push_str(" AND class = ?");
            binds.push(Value::Text(class.clone()));
        }

        if let Some(major) = &query.major {
            clause.push_str(" AND major = ?");
            binds.push(Value::Text(major.clone()));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM students{clause}"),
            params_from_iter(binds.iter()),
            |row| row.get(0),
        )?;

        binds.push(Value::Integer(PAGE_SIZE as i64));
        binds.push(Value::Integer(query.offset() as i64));
        let data = self.query_students(
            &format!(
                "SELECT {STUDENT_COLUMNS} FROM students{clause}
                 ORDER BY created_at DESC, id DESC
                 LIMIT ? OFFSET ?"
            ),
            binds,
        )?;

        Ok(Page::new(data, query.effective_page(), total as u64))
    }

    fn distinct_values(&self, field: GroupField) -> Result<Vec<String>> {
        let column = field.column();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT DISTINCT {column} FROM students ORDER BY {column}"))?;
        let values = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(values)
    }
}

/// Current time in the fixed-width form stored in timestamp columns.
/// Fixed width keeps lexical order equal to chronological order.
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Helper to convert a row to a StudentRecord
fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        id: row.get(0)?,
        nisn: row.get(1)?,
        name: row.get(2)?,
        class: row.get(3)?,
        major: row.get(4)?,
        score: row.get(5)?,
        status: parse_status(row, 6)?,
        notes: row.get(7)?,
        created_at: parse_timestamp(row, 8)?,
        updated_at: parse_timestamp(row, 9)?,
    })
}

fn parse_status(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Status> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Map a constraint failure raised by SQLite itself to the field it guards
fn map_write_error(err: rusqlite::Error) -> Error {
    let field = match &err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let detail = message.as_deref().unwrap_or_default();
            if detail.contains("nisn") {
                Some(Field::Nisn)
            } else if detail.contains("score") {
                Some(Field::Score)
            } else if detail.contains("status") {
                Some(Field::Status)
            } else {
                None
            }
        }
        _ => None,
    };

    match field {
        Some(Field::Nisn) => Error::constraint(Field::Nisn, "NISN is already registered or malformed"),
        Some(field) => Error::constraint(field, format!("{} violates a table constraint", field)),
        None => Error::StoreUnavailable(err),
    }
}
