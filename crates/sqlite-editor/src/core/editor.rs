//! Row editor: a schema-driven form plus the SQL it turns into.
//!
//! The editor is either closed or open for one insert or one edit. Saving
//! re-reads the table schema, validates and coerces every field, then issues a
//! single INSERT, a single UPDATE, or (when the primary key itself changed) a
//! DELETE + INSERT pair inside one transaction.

use std::collections::BTreeMap;

use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

use crate::core::database::{self, Database};
use crate::core::grid::key_predicate;
use crate::core::schema::{self, quote_ident};
use crate::core::types::{CellValue, ColumnDescriptor, Record};
use crate::error::{AppError, AppResult};

/// What to do with a value that does not parse as its column's numeric affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Store the raw text and let SQLite's affinity rules decide.
    #[default]
    Lenient,
    /// Reject the save.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub column: String,
    pub declared_type: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub placeholder: &'static str,
    pub value: String,
    /// Blob cells cannot round-trip through a text input; they keep their stored value.
    pub read_only: bool,
    pub missing_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EditorState {
    Closed,
    Insert { fields: Vec<FormField> },
    Edit { fields: Vec<FormField>, original: Record },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    /// The primary key changed: the old row was replaced.
    Rekeyed,
    NothingToUpdate,
}

impl SaveOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SaveOutcome::Inserted => "Row added",
            SaveOutcome::Updated => "Row updated",
            SaveOutcome::Rekeyed => "Row updated (primary key changed)",
            SaveOutcome::NothingToUpdate => "Nothing to update",
        }
    }
}

#[derive(Debug)]
pub struct RowEditor {
    state: EditorState,
    coercion: Coercion,
}

impl RowEditor {
    pub fn new(coercion: Coercion) -> Self {
        Self {
            state: EditorState::Closed,
            coercion,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditorState::Closed)
    }

    pub fn open_for_insert(&mut self, descriptors: &[ColumnDescriptor], columns: &[String]) {
        let fields = build_fields(descriptors, columns, |col| {
            let value = col.default_value.as_deref().map(default_text).unwrap_or_default();
            (value, false)
        });
        self.state = EditorState::Insert { fields };
    }

    pub fn open_for_edit(&mut self, descriptors: &[ColumnDescriptor], original: Record) {
        let fields = build_fields(descriptors, &original.columns, |col| match original.get(&col.name) {
            Some(CellValue::Blob(b)) => (format!("<blob {} bytes>", b.len()), true),
            Some(v) => (v.form_text(), false),
            None => (String::new(), false),
        });
        self.state = EditorState::Edit { fields, original };
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Closed;
    }

    /// Validates the submitted form and writes it. Fields absent from
    /// `submitted` keep the value the form was opened with. On error the
    /// editor stays open and nothing has been written.
    pub fn save(
        &mut self,
        db: &mut Database,
        table: &str,
        submitted: &BTreeMap<String, String>,
    ) -> AppResult<SaveOutcome> {
        let (fields, original) = match &self.state {
            EditorState::Closed => {
                return Err(AppError::InvalidRequest("editor is not open".into()));
            }
            EditorState::Insert { fields } => (fields, None),
            EditorState::Edit { fields, original } => (fields, Some(original)),
        };

        let descriptors = schema::describe_columns(db, table);
        let primary_key = schema::primary_key_columns(&descriptors);
        if original.is_some() && primary_key.is_empty() {
            return Err(no_primary_key(table, "updated"));
        }

        for name in submitted.keys() {
            if !fields.iter().any(|f| &f.column == name) {
                tracing::debug!(column = %name, "ignoring value for a column not in the form");
            }
        }

        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value = match original {
                Some(row) if field.read_only => row.get(&field.column).cloned().unwrap_or(CellValue::Null),
                _ => {
                    let raw = submitted.get(&field.column).unwrap_or(&field.value);
                    // An untouched prefill keeps the stored value and its storage class.
                    match original.and_then(|row| row.get(&field.column)) {
                        Some(kept) if raw == &field.value && !is_null_text(raw) => kept.clone(),
                        _ => {
                            let column = schema::column_or_default(&descriptors, &field.column);
                            coerce(&column, raw, self.coercion)?
                        }
                    }
                }
            };
            values.push((field.column.clone(), value));
        }

        let outcome = match original {
            None => {
                db.run(&insert_sql(table, &values), params_from_iter(values.iter().map(|(_, v)| v)))?;
                SaveOutcome::Inserted
            }
            Some(row) => update(db, table, &primary_key, row, &values)?,
        };

        tracing::info!(table, ?outcome, "row saved");
        self.state = EditorState::Closed;
        Ok(outcome)
    }
}

/// Deletes one row by its key values.
pub fn delete_row(db: &Database, table: &str, primary_key: &[String], key: &Record) -> AppResult<u64> {
    if primary_key.is_empty() {
        return Err(no_primary_key(table, "deleted"));
    }
    let old_key = key_values(primary_key, key)?;
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(table),
        key_predicate(primary_key.iter().map(String::as_str))
    );
    let r = db.run(&sql, params_from_iter(old_key.iter()))?;
    if r.changes == 0 {
        return Err(AppError::RowMissing(table.to_string()));
    }
    tracing::info!(table, "row deleted");
    Ok(r.changes)
}

fn update(
    db: &mut Database,
    table: &str,
    primary_key: &[String],
    original: &Record,
    values: &[(String, CellValue)],
) -> AppResult<SaveOutcome> {
    let old_key = key_values(primary_key, original)?;
    let key_changed = primary_key.iter().zip(&old_key).any(|(pk, old)| {
        values
            .iter()
            .find(|(name, _)| name == pk)
            .is_some_and(|(_, new)| new.to_string() != old.to_string())
    });
    let predicate = key_predicate(primary_key.iter().map(String::as_str));

    if key_changed {
        let delete = format!("DELETE FROM {} WHERE {}", quote_ident(table), predicate);
        let insert = insert_sql(table, values);
        db.transaction(|tx| {
            let removed = database::execute(tx, &delete, params_from_iter(old_key.iter()))?;
            if removed.changes == 0 {
                return Err(AppError::RowMissing(table.to_string()));
            }
            database::execute(tx, &insert, params_from_iter(values.iter().map(|(_, v)| v)))?;
            Ok(())
        })?;
        return Ok(SaveOutcome::Rekeyed);
    }

    let sets: Vec<&(String, CellValue)> = values
        .iter()
        .filter(|(name, _)| !primary_key.contains(name))
        .collect();
    if sets.is_empty() {
        return Ok(SaveOutcome::NothingToUpdate);
    }

    let assignments = sets
        .iter()
        .map(|(name, _)| format!("{} = ?", quote_ident(name)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE {}", quote_ident(table), assignments, predicate);
    let params = sets.iter().map(|(_, v)| v).chain(old_key.iter());
    let r = db.run(&sql, params_from_iter(params))?;
    if r.changes == 0 {
        return Err(AppError::RowMissing(table.to_string()));
    }
    Ok(SaveOutcome::Updated)
}

fn insert_sql(table: &str, values: &[(String, CellValue)]) -> String {
    if values.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    let columns = values
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; values.len()].join(", ");
    format!("INSERT INTO {} ({columns}) VALUES ({placeholders})", quote_ident(table))
}

fn key_values(primary_key: &[String], row: &Record) -> AppResult<Vec<CellValue>> {
    primary_key
        .iter()
        .map(|pk| {
            row.get(pk).cloned().ok_or_else(|| {
                AppError::Policy(format!("row is missing primary key column \"{pk}\""))
            })
        })
        .collect()
}

fn no_primary_key(table: &str, verb: &str) -> AppError {
    AppError::Policy(format!(
        "table \"{table}\" has no primary key; rows cannot be {verb}"
    ))
}

/// Turns a trimmed form value into a cell value using the column's affinity.
pub fn coerce(column: &ColumnDescriptor, raw: &str, mode: Coercion) -> AppResult<CellValue> {
    let value = raw.trim();
    if is_null_text(value) {
        if column.not_null {
            return Err(AppError::required(&column.name));
        }
        return Ok(CellValue::Null);
    }

    let affinity = column.declared_type.to_uppercase();
    let parsed = if affinity.contains("INT") {
        value.parse::<i64>().ok().map(CellValue::Integer)
    } else if ["REAL", "FLOAT", "DOUBLE"].iter().any(|t| affinity.contains(t)) {
        value
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(CellValue::Real)
    } else {
        return Ok(CellValue::Text(value.to_string()));
    };

    match (parsed, mode) {
        (Some(v), _) => Ok(v),
        (None, Coercion::Lenient) => Ok(CellValue::Text(value.to_string())),
        (None, Coercion::Strict) => Err(AppError::Validation {
            column: column.name.clone(),
            reason: format!("expects a {} value, got \"{value}\"", column.declared_type),
        }),
    }
}

fn is_null_text(raw: &str) -> bool {
    let value = raw.trim();
    value.is_empty() || value.eq_ignore_ascii_case("NULL")
}

/// Default expressions come back as SQL text; quoted string literals are unquoted.
fn default_text(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

fn build_fields(
    descriptors: &[ColumnDescriptor],
    columns: &[String],
    prefill: impl Fn(&ColumnDescriptor) -> (String, bool),
) -> Vec<FormField> {
    columns
        .iter()
        .map(|name| {
            let col = schema::column_or_default(descriptors, name);
            let (value, read_only) = prefill(&col);
            FormField {
                missing_required: col.not_null && value.trim().is_empty(),
                placeholder: if col.not_null { "required" } else { "NULL" },
                column: col.name,
                declared_type: col.declared_type,
                primary_key: col.primary_key,
                not_null: col.not_null,
                value,
                read_only,
            }
        })
        .collect()
}
