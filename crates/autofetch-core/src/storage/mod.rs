//! Binary payload persistence.
//!
//! Takes a byte-array result, writes the range covered by its declared bounds
//! in a single write, and renames the `.part` temp file into place only when
//! every byte landed. Anything else leaves no file behind.

mod writer;

pub use writer::ArtifactWriter;

use crate::variant::{BoundsError, VarType, Variant};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `checkme.png` → `checkme.png.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("response is not a binary payload (found {0})")]
    NotBinaryPayload(VarType),
    #[error("response is not a binary payload (null array)")]
    NullArray,
    #[error("invalid array bounds: {0}")]
    Bounds(#[from] BoundsError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("short write to {path}: {written} of {expected} bytes")]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },
}

impl PersistError {
    /// True for errors caused by the payload itself rather than the filesystem.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            PersistError::NotBinaryPayload(_) | PersistError::NullArray | PersistError::Bounds(_)
        )
    }
}

/// Write the byte array in `result` to `path`. Returns the number of bytes written.
pub fn persist(result: &Variant, path: &Path) -> Result<u64, PersistError> {
    let array = match result.byte_array() {
        Ok(Some(arr)) => arr,
        Ok(None) => return Err(PersistError::NullArray),
        Err(mismatch) => return Err(PersistError::NotBinaryPayload(mismatch.found)),
    };

    let access = array.access();
    let bytes = access.bytes()?;
    let expected = bytes.len();

    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = ArtifactWriter::create(path).map_err(io_err)?;
    let written = writer.write_once(bytes).map_err(io_err)?;
    if written != expected {
        return Err(PersistError::ShortWrite {
            path: path.to_path_buf(),
            written,
            expected,
        });
    }
    writer.sync().map_err(io_err)?;
    writer.finalize().map_err(io_err)?;

    tracing::info!(bytes = written, path = %path.display(), "artifact written");
    Ok(written as u64)
}
