use crate::core::database::Database;
use crate::core::schema;
use crate::core::types::TableSummary;
use crate::error::AppResult;

/// Table summaries sorted by name, internal `sqlite_*` tables excluded.
pub fn list_tables(db: &Database) -> AppResult<Vec<TableSummary>> {
    let names = schema::list_tables(db)?;
    Ok(names
        .into_iter()
        .map(|name| {
            let row_count = schema::row_count(db, &name);
            TableSummary { name, row_count }
        })
        .collect())
}

/// Case-insensitive substring match on table names.
pub fn filter<'a>(tables: &'a [TableSummary], query: &str) -> Vec<&'a TableSummary> {
    let needle = query.to_lowercase();
    tables
        .iter()
        .filter(|t| t.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::tests::seeded;

    fn sample() -> Vec<TableSummary> {
        ["Orders", "order_items", "users"]
            .into_iter()
            .map(|n| TableSummary {
                name: n.into(),
                row_count: 0,
            })
            .collect()
    }

    #[test]
    fn summaries_carry_counts() {
        let db = seeded(
            "CREATE TABLE b (x); CREATE TABLE a (x);
             INSERT INTO b VALUES (1), (2), (3);",
        );
        let t = list_tables(&db).unwrap();
        assert_eq!(
            t,
            vec![
                TableSummary { name: "a".into(), row_count: 0 },
                TableSummary { name: "b".into(), row_count: 3 },
            ]
        );
    }

    #[test]
    fn filter_ignores_case() {
        let tables = sample();
        let hits: Vec<_> = filter(&tables, "ORDER").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(hits, vec!["Orders", "order_items"]);
        assert_eq!(filter(&tables, "").len(), 3);
        assert!(filter(&tables, "zzz").is_empty());
        assert_eq!(tables.len(), 3);
    }
}
