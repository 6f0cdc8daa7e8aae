use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::editor::EditorState;
use crate::core::feedback::Notice;
use crate::core::grid::Page;
use crate::core::limits::RowLimit;
use crate::core::types::{ColumnDescriptor, RowKey, Tab, TableSummary};
use crate::error::AppResult;

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BridgeRequest {
    pub v: u32,
    pub id: String,
    pub cmd: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct BridgeResponse<T> {
    pub v: u32,
    pub id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl<T> BridgeResponse<T> {
    pub fn ok(v: u32, id: String, data: T, notice: Option<Notice>) -> Self {
        Self {
            v,
            id,
            status: "ok",
            data: Some(data),
            error: None,
            code: None,
            notice,
        }
    }

    pub fn err(v: u32, id: String, code: &'static str, error: String, notice: Option<Notice>) -> Self {
        Self {
            v,
            id,
            status: "error",
            data: None,
            error: Some(error),
            code: Some(code),
            notice,
        }
    }
}

// Payloads

#[derive(Debug, Deserialize)]
pub struct OpenPayload {
    /// File on disk to load.
    #[serde(default)]
    pub path: Option<String>,
    /// Display name; required with `bytes_base64`, defaults to the path's file name.
    #[serde(default)]
    pub name: Option<String>,
    /// File content from a picker or drag-and-drop.
    #[serde(default)]
    pub bytes_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TablesPayload {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectPayload {
    pub table: String,
}

/// Limit selector value: a row count or a word such as `all`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LimitArg {
    Count(usize),
    Text(String),
}

impl LimitArg {
    pub fn to_row_limit(&self) -> AppResult<RowLimit> {
        match self {
            LimitArg::Count(n) => Ok(RowLimit::from_count(*n)),
            LimitArg::Text(s) => RowLimit::parse(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReloadPayload {
    #[serde(default)]
    pub limit: Option<LimitArg>,
}

#[derive(Debug, Deserialize)]
pub struct TabPayload {
    pub tab: Tab,
}

#[derive(Debug, Deserialize)]
pub struct EditPayload {
    pub key: RowKey,
}

#[derive(Debug, Deserialize)]
pub struct SavePayload {
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePayload {
    pub key: RowKey,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportPayload {
    #[serde(default)]
    pub path: Option<String>,
}

// Response data

#[derive(Debug, Serialize)]
pub struct SessionView<'a> {
    pub file_name: &'a str,
    pub tables: &'a [TableSummary],
    pub tables_html: String,
}

#[derive(Debug, Serialize)]
pub struct TablesView<'a> {
    pub query: &'a str,
    pub tables: Vec<&'a TableSummary>,
    pub tables_html: String,
}

#[derive(Debug, Serialize)]
pub struct SelectionView<'a> {
    pub table: &'a str,
    pub tab: Tab,
    pub columns: &'a [ColumnDescriptor],
    pub page: &'a Page,
    pub grid_html: String,
    pub structure_html: String,
    pub tables_html: String,
}

#[derive(Debug, Serialize)]
pub struct EditorView<'a> {
    pub editor: &'a EditorState,
    pub form_html: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteView {
    pub deleted: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ExportView {
    pub file_name: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_base64: Option<String>,
}
