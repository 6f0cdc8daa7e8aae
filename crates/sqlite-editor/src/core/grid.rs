use rusqlite::params_from_iter;
use serde::Serialize;

use crate::core::database::Database;
use crate::core::limits::RowLimit;
use crate::core::schema::{self, quote_ident};
use crate::core::types::{CellValue, KeyPart, Record, RowKey};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub values: Vec<CellValue>,
    /// `None` when the table has no primary key; such rows are read-only.
    pub key: Option<RowKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub table: String,
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
    pub rows: Vec<GridRow>,
    pub total_rows: i64,
    pub limit: RowLimit,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, key: &RowKey) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.key.as_ref() == Some(key))
    }
}

/// `SELECT * FROM "table" [LIMIT n]`, each row paired with its key.
pub fn load_rows(db: &Database, table: &str, limit: RowLimit) -> AppResult<Page> {
    let sql = format!("SELECT * FROM {}{}", quote_ident(table), limit.sql_clause());
    let result = db.query(&sql, [])?;
    let columns = result.column_names();
    let primary_key = schema::primary_key_columns(&schema::describe_columns(db, table));

    let rows = result
        .rows
        .into_iter()
        .map(|values| {
            let key = capture_key(&columns, &values, &primary_key);
            GridRow { values, key }
        })
        .collect();

    Ok(Page {
        table: table.to_string(),
        columns,
        primary_key,
        rows,
        total_rows: schema::row_count(db, table),
        limit,
    })
}

fn capture_key(columns: &[String], values: &[CellValue], primary_key: &[String]) -> Option<RowKey> {
    if primary_key.is_empty() {
        return None;
    }
    let parts = primary_key
        .iter()
        .map(|pk| {
            let i = columns.iter().position(|c| c == pk)?;
            Some(KeyPart {
                column: pk.clone(),
                value: values.get(i)?.clone(),
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(RowKey(parts))
}

/// `"a" IS ? AND "b" IS ?`. `IS` keeps NULL key values addressable.
pub(crate) fn key_predicate<'a>(columns: impl Iterator<Item = &'a str>) -> String {
    columns
        .map(|c| format!("{} IS ?", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Reads the current version of a row by its captured key.
pub fn fetch_by_key(db: &Database, table: &str, key: &RowKey) -> AppResult<Record> {
    if key.is_empty() {
        return Err(AppError::Policy(format!(
            "table \"{table}\" has no primary key; rows cannot be addressed"
        )));
    }
    let sql = format!(
        "SELECT * FROM {} WHERE {} LIMIT 1",
        quote_ident(table),
        key_predicate(key.columns())
    );
    let result = db.query(&sql, params_from_iter(key.values()))?;
    let columns = result.column_names();
    let values = result
        .rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::RowMissing(table.to_string()))?;
    Ok(Record { columns, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::tests::seeded;

    fn users() -> Database {
        seeded(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Cleo');",
        )
    }

    #[test]
    fn limit_caps_rows_but_not_total() {
        let db = users();
        let page = load_rows(&db, "users", RowLimit::from_count(2)).unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total_rows, 3);
        assert_eq!(page.columns, vec!["id", "name"]);

        let all = load_rows(&db, "users", RowLimit::Unlimited).unwrap();
        assert_eq!(all.rows.len(), 3);
    }

    #[test]
    fn rows_carry_primary_key_values() {
        let db = users();
        let page = load_rows(&db, "users", RowLimit::Unlimited).unwrap();
        let key = page.rows[1].key.clone().unwrap();
        assert_eq!(
            key,
            RowKey(vec![KeyPart {
                column: "id".into(),
                value: CellValue::Integer(2)
            }])
        );
        assert_eq!(page.find(&key).unwrap().values[1], CellValue::Text("Bob".into()));
    }

    #[test]
    fn keyless_tables_have_no_row_keys() {
        let db = seeded("CREATE TABLE log (msg TEXT); INSERT INTO log VALUES ('x');");
        let page = load_rows(&db, "log", RowLimit::Unlimited).unwrap();
        assert!(page.primary_key.is_empty());
        assert!(page.rows[0].key.is_none());
    }

    #[test]
    fn fetch_by_key_sees_current_values() {
        let db = users();
        let page = load_rows(&db, "users", RowLimit::Unlimited).unwrap();
        let key = page.rows[0].key.clone().unwrap();
        db.run("UPDATE users SET name = 'Alicia' WHERE id = 1", []).unwrap();

        let rec = fetch_by_key(&db, "users", &key).unwrap();
        assert_eq!(rec.get("name"), Some(&CellValue::Text("Alicia".into())));

        db.run("DELETE FROM users WHERE id = 1", []).unwrap();
        let err = fetch_by_key(&db, "users", &key).unwrap_err();
        assert_eq!(err.code(), "ROW_MISSING");
    }

    #[test]
    fn null_key_values_are_addressable() {
        let db = seeded("CREATE TABLE k (code TEXT PRIMARY KEY, v INT); INSERT INTO k VALUES (NULL, 9);");
        let page = load_rows(&db, "k", RowLimit::Unlimited).unwrap();
        let key = page.rows[0].key.clone().unwrap();
        let rec = fetch_by_key(&db, "k", &key).unwrap();
        assert_eq!(rec.get("v"), Some(&CellValue::Integer(9)));
    }
}
