use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Legacy "all rows" option value still sent by older front-ends.
const UNLIMITED_SENTINEL: usize = 9_999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLimit {
    Limited(NonZeroUsize),
    Unlimited,
}

impl RowLimit {
    pub fn from_count(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(_) if n >= UNLIMITED_SENTINEL => RowLimit::Unlimited,
            Some(n) => RowLimit::Limited(n),
            None => RowLimit::Unlimited,
        }
    }

    /// Parses the limit selector value: a count, `0`, `all` or `unlimited`.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") || raw.eq_ignore_ascii_case("unlimited") {
            return Ok(RowLimit::Unlimited);
        }
        raw.parse::<usize>()
            .map(Self::from_count)
            .map_err(|_| AppError::InvalidRequest(format!("invalid row limit: {raw}")))
    }

    pub fn sql_clause(&self) -> String {
        match self {
            RowLimit::Limited(n) => format!(" LIMIT {n}"),
            RowLimit::Unlimited => String::new(),
        }
    }
}
