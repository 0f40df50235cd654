//! One complete run: resolve path, download, persist, verify, register.

use crate::automation::{AutomationContext, CreateError};
use crate::autostart::{self, AutostartError, StartupNamespace};
use crate::checksum;
use crate::config::AutofetchConfig;
use crate::download::{self, DownloadState};
use crate::dispatch::InvokeError;
use crate::output_path::{self, OutputPathError};
use crate::storage::{self, PersistError};
use crate::variant::Variant;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Fatal run failure.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Environment(#[from] OutputPathError),
    #[error(transparent)]
    Automation(#[from] CreateError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("file does not exist after write: {}", .0.display())]
    Missing(PathBuf),
    #[error("startup registration failed: {0}")]
    Autostart(#[source] AutostartError),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// What a successful run did.
#[derive(Debug)]
pub struct RunReport {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub status: Option<i32>,
    pub download_state: DownloadState,
    /// Invocation errors seen on the way (non-fatal).
    pub invoke_failures: Vec<InvokeError>,
    /// Hex SHA-256 of the artifact, if it could be computed.
    pub sha256: Option<String>,
    /// Stored command, or the value-write failure (reported, not fatal).
    pub autostart: Result<String, AutostartError>,
}

/// Execute one run for `url`.
///
/// `lookup` resolves environment variables; `namespace` receives the startup entry.
pub fn execute<F, N>(
    ctx: &AutomationContext,
    cfg: &AutofetchConfig,
    url: &str,
    lookup: F,
    namespace: &N,
) -> Result<RunReport, RunError>
where
    F: Fn(&str) -> Option<OsString>,
    N: StartupNamespace,
{
    execute_with_writer(ctx, cfg, url, lookup, namespace, storage::persist)
}

/// [`execute`] with a custom payload writer in place of [`storage::persist`].
pub fn execute_with_writer<F, N, W>(
    ctx: &AutomationContext,
    cfg: &AutofetchConfig,
    url: &str,
    lookup: F,
    namespace: &N,
    write: W,
) -> Result<RunReport, RunError>
where
    F: Fn(&str) -> Option<OsString>,
    N: StartupNamespace,
    W: FnOnce(&Variant, &Path) -> Result<u64, PersistError>,
{
    let path = output_path::resolve(lookup, &cfg.base_dir_env, &cfg.file_name)?;
    tracing::debug!(url, path = %path.display(), "starting run");

    let outcome = download::download(ctx, &cfg.prog_id, url)?;
    if !outcome.failures.is_empty() {
        tracing::warn!(
            failures = outcome.failures.len(),
            state = ?outcome.state,
            "request sequence had failures"
        );
    }

    let bytes_written = write(&outcome.body, &path)?;

    verify_exists(&path)?;

    let sha256 = match checksum::sha256_path(&path) {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!("checksum failed: {:#}", e);
            None
        }
    };

    let autostart = match autostart::register_startup(namespace, &cfg.startup_entry, &cfg.launcher, &path) {
        Ok(cmd) => Ok(cmd),
        Err(e @ AutostartError::OpenFailed { .. }) => return Err(RunError::Autostart(e)),
        Err(e) => {
            tracing::warn!("{}", e);
            Err(e)
        }
    };

    Ok(RunReport {
        path,
        bytes_written,
        status: outcome.status,
        download_state: outcome.state,
        invoke_failures: outcome.failures,
        sha256,
        autostart,
    })
}

/// Independent existence check; does not trust the writer's return value.
pub fn verify_exists(path: &Path) -> Result<(), RunError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(RunError::Missing(path.to_path_buf())),
    }
}
