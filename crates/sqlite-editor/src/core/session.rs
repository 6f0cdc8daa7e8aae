use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::core::browser;
use crate::core::database::Database;
use crate::core::editor::{self, Coercion, EditorState, RowEditor, SaveOutcome};
use crate::core::grid::{self, Page};
use crate::core::limits::RowLimit;
use crate::core::schema;
use crate::core::types::{ColumnDescriptor, Record, RowKey, Tab, TableSummary};
use crate::error::{AppError, AppResult};

const EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub default_limit: RowLimit,
    pub coercion: Coercion,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_limit: RowLimit::from_count(100),
            coercion: Coercion::Lenient,
        }
    }
}

/// A write that has been committed. `refresh_error` is set when the grid or
/// the table list could not be reloaded afterwards; the write still stands.
#[derive(Debug)]
pub struct Committed<T> {
    pub outcome: T,
    pub refresh_error: Option<AppError>,
}

/// The table currently shown. Replaced wholesale on every table switch.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub page: Page,
    pub tab: Tab,
}

/// Everything tied to one loaded file. Dropping it closes the file.
#[derive(Debug)]
pub struct Session {
    db: Database,
    file_name: String,
    tables: Vec<TableSummary>,
    search: String,
    settings: Settings,
    limit: RowLimit,
    selection: Option<Selection>,
    editor: RowEditor,
}

/// Accepts `.db`, `.sqlite` and `.sqlite3` names. The content is not inspected.
pub fn check_file_name(name: &str) -> AppResult<()> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::UnsupportedFile(name.to_string())),
    }
}

impl Session {
    pub fn open(file_name: &str, bytes: &[u8], settings: Settings) -> AppResult<Self> {
        check_file_name(file_name)?;
        let db = Database::open_from_bytes(file_name, bytes)?;
        let mut session = Self {
            db,
            file_name: file_name.to_string(),
            tables: Vec::new(),
            search: String::new(),
            settings,
            limit: settings.default_limit,
            selection: None,
            editor: RowEditor::new(settings.coercion),
        };
        session.refresh_tables()?;
        Ok(session)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn tables(&self) -> &[TableSummary] {
        &self.tables
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn editor_state(&self) -> &EditorState {
        self.editor.state()
    }

    pub fn refresh_tables(&mut self) -> AppResult<&[TableSummary]> {
        self.tables = browser::list_tables(&self.db)?;
        Ok(&self.tables)
    }

    pub fn set_search(&mut self, query: &str) -> Vec<&TableSummary> {
        self.search = query.to_string();
        browser::filter(&self.tables, &self.search)
    }

    /// Switches to `table` with the default row limit and the data tab.
    pub fn select_table(&mut self, table: &str) -> AppResult<&Selection> {
        if self.editor.is_open() {
            tracing::debug!("table switch discards the open editor");
            self.editor.cancel();
        }
        self.limit = self.settings.default_limit;
        let selection = self.load(table, Tab::Data)?;
        tracing::info!(table, rows = selection.page.rows.len(), "table selected");
        Ok(&*self.selection.insert(selection))
    }

    /// Re-reads structure and rows of the selected table, optionally with a new limit.
    pub fn reload(&mut self, limit: Option<RowLimit>) -> AppResult<&Selection> {
        if let Some(limit) = limit {
            self.limit = limit;
        }
        let (table, tab) = {
            let current = self.current()?;
            (current.table.clone(), current.tab)
        };
        let selection = self.load(&table, tab)?;
        Ok(&*self.selection.insert(selection))
    }

    pub fn set_tab(&mut self, tab: Tab) -> AppResult<&Selection> {
        let current = self.selection.as_mut().ok_or_else(no_table)?;
        current.tab = tab;
        Ok(&*current)
    }

    pub fn open_insert(&mut self) -> AppResult<&EditorState> {
        let current = self.current()?;
        let columns = schema::describe_columns(&self.db, &current.table);
        let names = if current.page.columns.is_empty() {
            columns.iter().map(|c| c.name.clone()).collect()
        } else {
            current.page.columns.clone()
        };
        self.editor.open_for_insert(&columns, &names);
        Ok(self.editor.state())
    }

    pub fn open_edit(&mut self, key: &RowKey) -> AppResult<&EditorState> {
        let current = self.current()?;
        if current.page.find(key).is_none() {
            tracing::debug!(table = %current.table, "edited row is not on the loaded page");
        }
        let table = current.table.clone();
        let record = grid::fetch_by_key(&self.db, &table, key)?;
        let columns = schema::describe_columns(&self.db, &table);
        self.editor.open_for_edit(&columns, record);
        Ok(self.editor.state())
    }

    pub fn cancel_edit(&mut self) {
        self.editor.cancel();
    }

    /// Saves the open form, then refreshes the grid and the table list.
    pub fn save(&mut self, values: &BTreeMap<String, String>) -> AppResult<Committed<SaveOutcome>> {
        let table = self.current()?.table.clone();
        let outcome = self.editor.save(&mut self.db, &table, values)?;
        Ok(self.after_write(outcome))
    }

    /// Deletes the row behind `key`. Returns `None` when not confirmed; no SQL
    /// runs in that case.
    pub fn delete(&mut self, key: &RowKey, confirmed: bool) -> AppResult<Option<Committed<u64>>> {
        let table = self.current()?.table.clone();
        let primary_key = schema::primary_key_columns(&schema::describe_columns(&self.db, &table));
        if primary_key.is_empty() {
            return Err(AppError::Policy(format!(
                "table \"{table}\" has no primary key; rows cannot be deleted"
            )));
        }
        if !confirmed {
            return Ok(None);
        }
        let changes = editor::delete_row(&self.db, &table, &primary_key, &Record::from(key))?;
        Ok(Some(self.after_write(changes)))
    }

    pub fn export(&self) -> AppResult<Vec<u8>> {
        self.db.export()
    }

    fn after_write<T>(&mut self, outcome: T) -> Committed<T> {
        let mut refresh_error = self.reload(None).err();
        if let Err(e) = self.refresh_tables() {
            refresh_error.get_or_insert(e);
        }
        if let Some(e) = &refresh_error {
            tracing::warn!(error = %e, "write committed but the view could not be refreshed");
        }
        Committed { outcome, refresh_error }
    }

    fn current(&self) -> AppResult<&Selection> {
        self.selection.as_ref().ok_or_else(no_table)
    }

    fn load(&self, table: &str, tab: Tab) -> AppResult<Selection> {
        let columns = schema::describe_columns(&self.db, table);
        let page = grid::load_rows(&self.db, table, self.limit)?;
        Ok(Selection {
            table: table.to_string(),
            columns,
            page,
            tab,
        })
    }
}

fn no_table() -> AppError {
    AppError::InvalidRequest("select a table first".into())
}
