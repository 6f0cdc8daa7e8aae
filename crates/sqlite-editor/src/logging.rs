use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout is reserved for bridge responses. Colors are only
/// used when a person is watching, not when the webview host captures stderr.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
