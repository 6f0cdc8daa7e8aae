use serde::Serialize;

use crate::error::AppError;

const TOAST_MS: u64 = 3_000;
const BANNER_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Toast,
    Banner,
}

/// A transient message for the front-end to show and auto-dismiss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub style: Style,
    pub message: String,
    pub dismiss_after_ms: u64,
}

impl Notice {
    fn toast(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            style: Style::Toast,
            message: message.into(),
            dismiss_after_ms: TOAST_MS,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::toast(Level::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::toast(Level::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::toast(Level::Warning, message)
    }

    /// Engine failures become dismissible banners, everything else a toast.
    pub fn from_error(action: &str, e: &AppError) -> Self {
        if e.is_engine() {
            Self {
                level: Level::Error,
                style: Style::Banner,
                message: format!("{action} failed: {e}"),
                dismiss_after_ms: BANNER_MS,
            }
        } else {
            Self::toast(Level::Error, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_are_banners() {
        let n = Notice::from_error("Save", &AppError::SqlError("UNIQUE constraint failed".into()));
        assert_eq!(n.style, Style::Banner);
        assert_eq!(n.dismiss_after_ms, BANNER_MS);
        assert!(n.message.starts_with("Save failed"));
    }

    #[test]
    fn validation_errors_are_toasts() {
        let n = Notice::from_error("Save", &AppError::required("name"));
        assert_eq!(n.style, Style::Toast);
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.message, "column \"name\" cannot be empty");
    }
}
