use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported file: {0} (expected .db, .sqlite or .sqlite3)")]
    UnsupportedFile(String),

    #[error("failed to open database: {name}: {source}")]
    DbOpenFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sql error: {0}")]
    SqlError(String),

    #[error("column \"{column}\" {reason}")]
    Validation { column: String, reason: String },

    #[error("{0}")]
    Policy(String),

    #[error("row no longer exists in \"{0}\"")]
    RowMissing(String),

    #[error("no database loaded")]
    NoSession,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::SqlError(e.to_string())
    }
}

impl AppError {
    pub fn required(column: &str) -> Self {
        AppError::Validation {
            column: column.to_string(),
            reason: "cannot be empty".into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::UnsupportedFile(_) => "UNSUPPORTED_FILE",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::SqlError(_) => "SQL_ERROR",
            AppError::Validation { .. } => "VALIDATION",
            AppError::Policy(_) => "POLICY",
            AppError::RowMissing(_) => "ROW_MISSING",
            AppError::NoSession => "NO_SESSION",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Engine-side failures surface as banners; everything else is a toast.
    pub fn is_engine(&self) -> bool {
        matches!(
            self,
            AppError::DbOpenFailed { .. } | AppError::SqlError(_) | AppError::Io(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
