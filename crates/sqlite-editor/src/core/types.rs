use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// A single stored value. Serialized as plain JSON scalars, with blobs as
/// `{"$type":"blob","base64":..,"size":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "serde_json::Value", try_from = "serde_json::Value")]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    /// Text placed in an editor input. NULL becomes an empty field.
    pub fn form_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Real(x) => write!(f, "{x}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(x) => CellValue::Real(x),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(x) => ToSqlOutput::Owned(Value::Real(*x)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<CellValue> for serde_json::Value {
    fn from(v: CellValue) -> Self {
        match v {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Integer(i) => serde_json::Value::from(i),
            CellValue::Real(x) => serde_json::Value::from(x),
            CellValue::Text(s) => serde_json::Value::from(s),
            CellValue::Blob(b) => serde_json::json!({
                "$type": "blob",
                "base64": STANDARD.encode(&b),
                "size": b.len()
            }),
        }
    }
}

impl TryFrom<serde_json::Value> for CellValue {
    type Error = String;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(CellValue::Null),
            serde_json::Value::Bool(b) => Ok(CellValue::Integer(i64::from(b))),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(CellValue::Integer(i)),
                None => n
                    .as_f64()
                    .map(CellValue::Real)
                    .ok_or_else(|| format!("unsupported number: {n}")),
            },
            serde_json::Value::String(s) => Ok(CellValue::Text(s)),
            serde_json::Value::Object(map) => {
                if map.get("$type").and_then(|t| t.as_str()) != Some("blob") {
                    return Err("objects are only accepted as blobs".into());
                }
                let encoded = map
                    .get("base64")
                    .and_then(|b| b.as_str())
                    .ok_or("blob without base64 payload")?;
                STANDARD
                    .decode(encoded)
                    .map(CellValue::Blob)
                    .map_err(|e| format!("invalid blob payload: {e}"))
            }
            serde_json::Value::Array(_) => Err("arrays are not cell values".into()),
        }
    }
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    pub primary_key: bool,
    /// 1-based position inside a composite primary key, 0 when not part of it.
    #[serde(default)]
    pub pk_ordinal: u32,
}

impl ColumnDescriptor {
    /// Stand-in for columns the schema no longer reports.
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declared_type: "TEXT".into(),
            not_null: false,
            default_value: None,
            primary_key: false,
            pk_ordinal: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub row_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPart {
    pub column: String,
    pub value: CellValue,
}

/// Primary-key values captured when a row was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub Vec<KeyPart>);

impl RowKey {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.column.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.0.iter().map(|p| &p.value)
    }
}

/// A full row with its column names, as read back for the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub columns: Vec<String>,
    pub values: Vec<CellValue>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

impl From<&RowKey> for Record {
    fn from(key: &RowKey) -> Self {
        Record {
            columns: key.columns().map(str::to_string).collect(),
            values: key.values().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(default)]
    pub decl_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub changes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Data,
    Structure,
}
