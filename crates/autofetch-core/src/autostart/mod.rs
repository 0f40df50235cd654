//! Per-user startup registration.
//!
//! A [`StartupNamespace`] is a persistent key-value store whose entries run at
//! the next session start. Opening it yields a [`StartupKey`] that is closed when
//! dropped. [`register_startup`] stores `<launcher> "<path>"` under a fixed name.

mod desktop;

pub use desktop::{XdgAutostart, XdgAutostartKey};

use std::io;
use std::path::Path;

/// Write access to an opened startup namespace. Closed on drop.
pub trait StartupKey {
    fn set_value(&mut self, name: &str, value: &str) -> io::Result<()>;
}

/// A per-user startup-triggered key-value namespace.
pub trait StartupNamespace {
    type Key: StartupKey;

    fn open_for_write(&self) -> io::Result<Self::Key>;

    /// Human-readable location for diagnostics.
    fn describe(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum AutostartError {
    #[error("failed to open startup namespace {location}: {source}")]
    OpenFailed {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to set startup value {name:?}: {source}")]
    WriteFailed {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// `<launcher> "<path>"`. The path must be valid UTF-8; it is never converted lossily.
pub fn startup_command(launcher: &str, path: &Path) -> io::Result<String> {
    let path = path.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path is not valid UTF-8: {}", path.display()),
        )
    })?;
    Ok(format!("{} \"{}\"", launcher, path))
}

/// Store the launch command for `path` under `entry_name`. Returns the stored command.
pub fn register_startup<N: StartupNamespace>(
    namespace: &N,
    entry_name: &str,
    launcher: &str,
    path: &Path,
) -> Result<String, AutostartError> {
    let mut key = namespace
        .open_for_write()
        .map_err(|source| AutostartError::OpenFailed {
            location: namespace.describe(),
            source,
        })?;
    let command = startup_command(launcher, path)
        .and_then(|command| key.set_value(entry_name, &command).map(|()| command))
        .map_err(|source| AutostartError::WriteFailed {
            name: entry_name.to_string(),
            source,
        })?;
    tracing::info!(entry = entry_name, %command, "startup entry registered");
    Ok(command)
}
