use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "sqlite-editor")]
pub struct Args {
    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Rows fetched when a table is selected. 0 means all rows.
    #[arg(long, default_value_t = 100)]
    pub default_limit: usize,

    /// Reject form values that do not parse as the column's numeric affinity
    /// instead of storing them as text.
    #[arg(long)]
    pub strict_types: bool,

    /// Database file to load before reading commands.
    #[arg(long)]
    pub open: Option<PathBuf>,
}
