//! Artifact path: `<base dir from environment>/<file name>`, length-checked.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Longest path (in bytes) we are willing to build.
pub const MAX_PATH_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputPathError {
    #[error("environment variable {0} is not set")]
    MissingVar(String),
    #[error("environment variable {var} is not an absolute path: {value}")]
    NotAbsolute { var: String, value: String },
    #[error("environment variable {var} is not valid UTF-8: {value}")]
    NotUnicode { var: String, value: String },
    #[error("invalid artifact file name {0:?}")]
    InvalidFileName(String),
    #[error("artifact path exceeds {limit} bytes ({len})")]
    TooLong { len: usize, limit: usize },
}

/// Resolve the base directory from `var` via `lookup` and join `file_name`.
///
/// The base must be valid UTF-8 so the startup command can name the same bytes
/// that were written.
pub fn resolve<F>(lookup: F, var: &str, file_name: &str) -> Result<PathBuf, OutputPathError>
where
    F: Fn(&str) -> Option<OsString>,
{
    let base = match lookup(var) {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => return Err(OutputPathError::MissingVar(var.to_string())),
    };
    if base.to_str().is_none() {
        return Err(OutputPathError::NotUnicode {
            var: var.to_string(),
            value: base.display().to_string(),
        });
    }
    if !base.is_absolute() {
        return Err(OutputPathError::NotAbsolute {
            var: var.to_string(),
            value: base.display().to_string(),
        });
    }
    build(&base, file_name)
}

/// Join `file_name` onto `base`. The name must be a single normal component.
pub fn build(base: &Path, file_name: &str) -> Result<PathBuf, OutputPathError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(OutputPathError::InvalidFileName(file_name.to_string())),
    }
    let len = base.as_os_str().len() + 1 + file_name.len();
    if len > MAX_PATH_BYTES {
        return Err(OutputPathError::TooLong {
            len,
            limit: MAX_PATH_BYTES,
        });
    }
    Ok(base.join(file_name))
}
