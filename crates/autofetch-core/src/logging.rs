//! Tracing setup for the CLI.
//!
//! Events go to `autofetch.log` under the XDG state directory. When that file
//! cannot be opened the caller switches to [`init_logging_stderr`].

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,autofetch_core=debug,autofetch=debug";
const LOG_FILE_NAME: &str = "autofetch.log";

/// Per-event sink: a handle on the shared log file, or stderr if the handle
/// could not be duplicated for this event.
enum LogSink {
    File(File),
    Stderr,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct SharedLogFile(File);

impl<'a> MakeWriter<'a> for SharedLogFile {
    type Writer = LogSink;

    fn make_writer(&'a self) -> LogSink {
        match self.0.try_clone() {
            Ok(f) => LogSink::File(f),
            Err(_) => LogSink::Stderr,
        }
    }
}

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_FILTER`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `$XDG_STATE_HOME/autofetch/autofetch.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("autofetch")?;
    Ok(dirs.get_state_home().join("autofetch").join(LOG_FILE_NAME))
}

/// Install the global subscriber writing to [`log_file_path`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(SharedLogFile(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

/// Install the global subscriber writing to stderr. A no-op if one is already set.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
