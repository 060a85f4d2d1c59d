//! Staged module sources.

use std::{
    io::{self, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Module source text materialized as a temporary `.mjs` file.
///
/// The file is exclusively owned by one compile call and must be handed back
/// with [`release`](StagedSource::release) on every exit path.
#[derive(Debug)]
pub(crate) struct StagedSource {
    file: NamedTempFile,
}

impl StagedSource {
    /// Writes the source text to a new file in the scratch directory.
    pub(crate) fn acquire(scratch_dir: &Path, code: &str) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("function-")
            .suffix(".mjs")
            .tempfile_in(scratch_dir)?;
        file.write_all(code.as_bytes())?;
        file.flush()?;
        tracing::debug!(path = %file.path().display(), "module source staged");
        Ok(Self { file })
    }

    /// Returns the path of the staged file.
    #[inline]
    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// Closes and removes the staged file.
    ///
    /// A failed removal is logged and otherwise ignored so that it never masks
    /// the outcome of the compile call.
    pub(crate) fn release(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "module source released"),
            Err(err) => {
                tracing::warn!(path = %path.display(), "fail to release the module source: {err}")
            }
        }
    }
}
