use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter variable, parsed like `RUST_LOG`.
pub const LOG_ENV: &str = "RIFT_LOG";
const DEFAULT_FILTER: &str = "warn";

/// `<cache_dir>/rift/rift.log`
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rift")
        .join("rift.log")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Append to `path`, or discard everything when it cannot be opened.
/// The terminal belongs to the UI, so nothing is ever written to stderr.
fn log_writer(path: &Path) -> BoxMakeWriter {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(std::io::sink),
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(path: &Path) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_writer(path))
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
