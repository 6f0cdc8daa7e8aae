use rusqlite::{backup::Progress, Connection, DatabaseName, Params};

use crate::{
    core::types::{CellValue, ColumnMeta, ExecResult, QueryResult},
    error::{AppError, AppResult},
};

/// The in-memory database handle behind a session.
///
/// Files are never opened in place: the bytes are staged into a temporary file
/// and restored into an in-memory connection with the backup API, so edits only
/// reach disk through [`Database::export`].
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    pub fn open_from_bytes(name: &str, bytes: &[u8]) -> AppResult<Self> {
        let staging = tempfile::tempdir()?;
        let staged = staging.path().join("import.db");
        std::fs::write(&staged, bytes)?;

        let open_failed = |source: rusqlite::Error| AppError::DbOpenFailed {
            name: name.to_string(),
            source,
        };
        let mut conn = Connection::open_in_memory().map_err(open_failed)?;
        conn.restore(DatabaseName::Main, &staged, None::<fn(Progress)>)
            .map_err(open_failed)?;
        // Touch the schema so a damaged file fails at load rather than on first click.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
            .map_err(open_failed)?;

        tracing::info!(name, size = bytes.len(), "database loaded");
        Ok(Self { conn })
    }

    pub fn query<P: Params>(&self, sql: &str, params: P) -> AppResult<QueryResult> {
        query(&self.conn, sql, params)
    }

    pub fn run<P: Params>(&self, sql: &str, params: P) -> AppResult<ExecResult> {
        execute(&self.conn, sql, params)
    }

    /// Runs `f` inside one transaction. An `Err` from `f` rolls everything back.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let tx = self.conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Byte-for-byte snapshot of the current in-memory state.
    pub fn export(&self) -> AppResult<Vec<u8>> {
        let staging = tempfile::tempdir()?;
        let target = staging.path().join("export.db");
        self.conn.backup(DatabaseName::Main, &target, None)?;
        let bytes = std::fs::read(&target)?;
        tracing::info!(size = bytes.len(), "database exported");
        Ok(bytes)
    }
}

pub fn query<P: Params>(conn: &Connection, sql: &str, params: P) -> AppResult<QueryResult> {
    tracing::debug!(sql, "query");
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .map(|c| ColumnMeta {
            name: c.name().to_string(),
            decl_type: c.decl_type().map(str::to_string),
        })
        .collect();

    let width = columns.len();
    let mut rows = Vec::new();
    let mut r = stmt.query(params)?;
    while let Some(row) = r.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(CellValue::from(row.get_ref(i)?));
        }
        rows.push(values);
    }

    Ok(QueryResult { columns, rows })
}

pub fn execute<P: Params>(conn: &Connection, sql: &str, params: P) -> AppResult<ExecResult> {
    tracing::debug!(sql, "execute");
    let changes = conn.execute(sql, params)?;
    Ok(ExecResult {
        changes: changes as u64,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn seeded(sql: &str) -> Database {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        Database { conn }
    }

    #[test]
    fn rejects_non_sqlite_bytes() {
        let err = Database::open_from_bytes("notes.db", &[b'x'; 4096]).unwrap_err();
        assert_eq!(err.code(), "DB_OPEN_FAILED");
    }

    #[test]
    fn empty_bytes_open_as_empty_database() {
        let db = Database::open_from_bytes("new.db", &[]).unwrap();
        let r = db.query("SELECT name FROM sqlite_master", []).unwrap();
        assert!(r.rows.is_empty());
    }

    #[test]
    fn export_then_reopen_keeps_data() {
        let db = seeded(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);
             INSERT INTO t (v) VALUES ('a'), ('b'), (NULL);",
        );
        let bytes = db.export().unwrap();
        let reopened = Database::open_from_bytes("t.db", &bytes).unwrap();
        let r = reopened.query("SELECT v FROM t ORDER BY id", []).unwrap();
        assert_eq!(
            r.rows,
            vec![
                vec![CellValue::Text("a".into())],
                vec![CellValue::Text("b".into())],
                vec![CellValue::Null],
            ]
        );
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let mut db = seeded("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);");
        let res: AppResult<()> = db.transaction(|tx| {
            execute(tx, "DELETE FROM t", [])?;
            Err(AppError::Internal("boom".into()))
        });
        assert!(res.is_err());
        let r = db.query("SELECT count(*) FROM t", []).unwrap();
        assert_eq!(r.rows[0][0], CellValue::Integer(1));
    }

    #[test]
    fn query_reports_declared_types() {
        let db = seeded("CREATE TABLE t (id INTEGER, price REAL);");
        let r = db.query("SELECT * FROM t", []).unwrap();
        assert_eq!(r.column_names(), vec!["id", "price"]);
        assert_eq!(r.columns[1].decl_type.as_deref(), Some("REAL"));
    }
}
