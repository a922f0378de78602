//! SQLite table store
//!
//! Keeps the same `attendance` / `students` layout as the hosted tables so a
//! local copy can be exported offline. Queries are built from the validated
//! [`Query`] with bound parameters; only identifiers are interpolated.

use std::path::Path;

use rekap_core::{AttendanceRecord, FetchError, RosterEntry};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use serde_json::{Number, Value};

use crate::{FilterValue, Query, Row, TableStore};

pub struct SqliteStore {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> FetchError {
    FetchError::Query(e.to_string())
}

impl SqliteStore {
    /// Open an existing database file. A missing file is an error, never an
    /// empty database.
    pub fn open(path: &Path) -> Result<Self, FetchError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| FetchError::Query(format!("cannot open database {}: {e}", path.display())))?;
        Self::with_connection(conn)
    }

    /// Open a database file, creating it with an empty schema if needed
    pub fn create(path: &Path) -> Result<Self, FetchError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, FetchError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, FetchError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS students(
                student_id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                class_id TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            )",
            [],
        )
        .map_err(db_err)?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id, full_name)",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS attendance(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id TEXT NOT NULL,
                student_name TEXT NOT NULL DEFAULT '',
                class_id TEXT NOT NULL,
                date TEXT NOT NULL,
                status TEXT NOT NULL,
                academic_year TEXT NOT NULL DEFAULT '',
                recorded_by TEXT NOT NULL DEFAULT ''
            )",
            [],
        )
        .map_err(db_err)?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attendance_class_date ON attendance(class_id, date)",
            [],
        )
        .map_err(db_err)?;

        Ok(Self { conn })
    }

    pub fn insert_student(&self, entry: &RosterEntry) -> Result<(), FetchError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO students(student_id, full_name, class_id, active)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry.student_id, entry.full_name, entry.class_id, entry.active],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Insert records in one transaction
    pub fn insert_records(&mut self, records: &[AttendanceRecord]) -> Result<(), FetchError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO attendance(student_id, student_name, class_id, date, status, academic_year, recorded_by)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(db_err)?;
            for r in records {
                stmt.execute(params![
                    r.student_id,
                    r.student_name,
                    r.class_id,
                    r.date,
                    r.status,
                    r.academic_year,
                    r.recorded_by
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }

    /// SQL text and bind values for a validated query
    fn build_sql(query: &Query) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT * FROM {}", query.table);
        let mut binds = Vec::with_capacity(query.filters.len() + 2);

        for (i, f) in query.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("{} {} ?", f.column, f.op.sql()));
            binds.push(match &f.value {
                FilterValue::Text(s) => SqlValue::Text(s.clone()),
                FilterValue::Int(i) => SqlValue::Integer(*i),
                FilterValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
            });
        }

        if !query.order.is_empty() {
            let clauses: Vec<String> = query
                .order
                .iter()
                .map(|o| format!("{} {}", o.column, if o.ascending { "ASC" } else { "DESC" }))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&clauses.join(", "));
        }

        if let Some((from, to)) = query.range {
            sql.push_str(" LIMIT ? OFFSET ?");
            binds.push(SqlValue::Integer((to - from + 1) as i64));
            binds.push(SqlValue::Integer(from as i64));
        }

        (sql, binds)
    }
}

impl TableStore for SqliteStore {
    fn select(&self, query: &Query) -> Result<Vec<Row>, FetchError> {
        query.validate()?;
        let (sql, binds) = Self::build_sql(query);
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params_from_iter(binds), |r| {
                let mut row = Row::new();
                for (i, name) in columns.iter().enumerate() {
                    row.insert(name.clone(), to_json(r.get_ref(i)?));
                }
                Ok(row)
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err)?;
        Ok(rows)
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_rows, RecordFetcher};
    use pretty_assertions::assert_eq;
    use rekap_core::PeriodSelector;

    fn seeded() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_student(&RosterEntry::new("1", "Ayu", "7A")).unwrap();
        let mut inactive = RosterEntry::new("2", "Budi", "7A");
        inactive.active = false;
        store.insert_student(&inactive).unwrap();
        store
            .insert_records(&[
                AttendanceRecord::new("1", "7A", "2025-03-02", "Sakit").academic_year("2024/2025"),
                AttendanceRecord::new("1", "7A", "2025-03-01", "Hadir").academic_year("2024/2025"),
                AttendanceRecord::new("1", "7A", "2025-04-01", "Hadir").academic_year("2024/2025"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn build_sql_binds_everything() {
        let q = Query::table("attendance")
            .eq("class_id", "7A")
            .gte("date", "2025-03-01")
            .order("date", true)
            .range(1000, 1999);
        let (sql, binds) = SqliteStore::build_sql(&q);
        assert_eq!(
            sql,
            "SELECT * FROM attendance WHERE class_id = ? AND date >= ? ORDER BY date ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(binds.len(), 4);
        assert_eq!(binds[2], SqlValue::Integer(1000));
        assert_eq!(binds[3], SqlValue::Integer(1000));
    }

    #[test]
    fn roster_decodes_integer_flag() {
        let store = seeded();
        let rows = store
            .select(&Query::table("students").eq("class_id", "7A").eq("active", true))
            .unwrap();
        let roster: Vec<RosterEntry> = decode_rows("students", rows).unwrap();
        assert_eq!(roster, vec![RosterEntry::new("1", "Ayu", "7A")]);
    }

    #[test]
    fn fetch_month_through_sqlite() {
        let fetcher = RecordFetcher::new(seeded()).page_size(1);
        let records = fetcher
            .fetch_records("7A", &PeriodSelector::month(2025, 3).unwrap())
            .unwrap()
            .into_records();
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-01", "2025-03-02"]);
        assert_eq!(records[0].academic_year, "2024/2025");
    }

    #[test]
    fn missing_table_surfaces_backend_message() {
        let store = seeded();
        let err = store.select(&Query::table("grades")).unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rekap.sqlite3");
        {
            let store = SqliteStore::create(&path).unwrap();
            store.insert_student(&RosterEntry::new("9", "Citra", "8B")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.select(&Query::table("students")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn open_missing_file_fails_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.sqlite");
        let err = SqliteStore::open(&path).err().unwrap();
        assert!(err.to_string().starts_with("cannot open database"));
        assert!(!path.exists());
    }
}
