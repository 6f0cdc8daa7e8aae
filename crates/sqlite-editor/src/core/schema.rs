use crate::core::database::Database;
use crate::core::types::{CellValue, ColumnDescriptor};
use crate::error::AppResult;

/// Quotes an identifier for interpolation; SQLite cannot bind identifiers.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn list_tables(db: &Database) -> AppResult<Vec<String>> {
    let r = db.query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        [],
    )?;
    Ok(r.rows
        .into_iter()
        .filter_map(|row| match row.into_iter().next() {
            Some(CellValue::Text(name)) => Some(name),
            _ => None,
        })
        .collect())
}

/// Row count for the sidebar. A table that cannot be counted shows 0.
pub fn row_count(db: &Database, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    match db.query(&sql, []) {
        Ok(r) => match r.rows.first().and_then(|row| row.first()) {
            Some(CellValue::Integer(n)) => *n,
            _ => 0,
        },
        Err(e) => {
            tracing::warn!(table, error = %e, "row count failed");
            0
        }
    }
}

/// Column descriptors in declaration order.
///
/// An introspection failure yields an empty list: callers treat that as an
/// unknown schema rather than an error.
pub fn describe_columns(db: &Database, table: &str) -> Vec<ColumnDescriptor> {
    match try_describe_columns(db, table) {
        Ok(cols) => cols,
        Err(e) => {
            tracing::warn!(table, error = %e, "table_info failed; schema unknown");
            Vec::new()
        }
    }
}

fn try_describe_columns(db: &Database, table: &str) -> AppResult<Vec<ColumnDescriptor>> {
    // cid | name | type | notnull | dflt_value | pk
    let r = db.query(&format!("PRAGMA table_info({})", quote_ident(table)), [])?;
    let cols = r
        .rows
        .into_iter()
        .map(|row| {
            let text = |i: usize| match row.get(i) {
                Some(CellValue::Null) | None => None,
                Some(v) => Some(v.to_string()),
            };
            let int = |i: usize| match row.get(i) {
                Some(CellValue::Integer(n)) => *n,
                _ => 0,
            };
            ColumnDescriptor {
                name: text(1).unwrap_or_default(),
                declared_type: text(2).unwrap_or_default(),
                not_null: int(3) != 0,
                default_value: text(4),
                primary_key: int(5) != 0,
                pk_ordinal: u32::try_from(int(5)).unwrap_or(0),
            }
        })
        .collect();
    Ok(cols)
}

/// Primary-key column names, ordered by their position in the key.
pub fn primary_key_columns(columns: &[ColumnDescriptor]) -> Vec<String> {
    let mut pk: Vec<&ColumnDescriptor> = columns.iter().filter(|c| c.primary_key).collect();
    pk.sort_by_key(|c| c.pk_ordinal);
    pk.into_iter().map(|c| c.name.clone()).collect()
}

pub fn column_or_default(columns: &[ColumnDescriptor], name: &str) -> ColumnDescriptor {
    columns
        .iter()
        .find(|c| c.name == name)
        .cloned()
        .unwrap_or_else(|| ColumnDescriptor::unknown(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::tests::seeded;

    #[test]
    fn quotes_embedded_double_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn lists_user_tables_sorted_without_internal_ones() {
        let db = seeded(
            "CREATE TABLE zeta (id INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE alpha (x);
             INSERT INTO zeta DEFAULT VALUES;",
        );
        assert_eq!(list_tables(&db).unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn describes_flags_and_defaults() {
        let db = seeded(
            "CREATE TABLE items (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                qty INT DEFAULT 3,
                note TEXT DEFAULT 'n/a'
             );",
        );
        let cols = describe_columns(&db, "items");
        assert_eq!(cols.len(), 4);
        assert!(cols[0].primary_key);
        assert!(!cols[0].not_null);
        assert!(cols[1].not_null);
        assert_eq!(cols[2].declared_type, "INT");
        assert_eq!(cols[2].default_value.as_deref(), Some("3"));
        assert_eq!(cols[3].default_value.as_deref(), Some("'n/a'"));
        assert_eq!(primary_key_columns(&cols), vec!["id"]);
    }

    #[test]
    fn composite_key_follows_key_order() {
        let db = seeded("CREATE TABLE m (a TEXT, b TEXT, c TEXT, PRIMARY KEY (c, a));");
        let cols = describe_columns(&db, "m");
        assert_eq!(primary_key_columns(&cols), vec!["c", "a"]);
    }

    #[test]
    fn missing_table_describes_as_empty() {
        let db = seeded("");
        assert!(describe_columns(&db, "nope").is_empty());
        assert_eq!(row_count(&db, "nope"), 0);
    }

    #[test]
    fn quoted_names_are_introspectable() {
        let db = seeded("CREATE TABLE \"odd \"\"name\" (v);  INSERT INTO \"odd \"\"name\" VALUES (1), (2);");
        assert_eq!(row_count(&db, "odd \"name"), 2);
        assert_eq!(describe_columns(&db, "odd \"name")[0].name, "v");
    }
}
