//! Sandboxed file reads.

use std::path::{Path, PathBuf};

use base64::Engine as _;

use crate::types::{FileContent, ToolboxError, ToolboxResult};

/// Default per-read size limit (1 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Reads files that resolve inside a fixed root directory.
#[derive(Debug, Clone)]
pub struct FileReader {
    root: PathBuf,
    max_bytes: u64,
}

impl FileReader {
    /// Create a reader rooted at `root`. The root must exist.
    pub fn new(root: &Path) -> ToolboxResult<Self> {
        let root = root.canonicalize()?;
        Ok(Self {
            root,
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Read `relative` (resolved against the root).
    ///
    /// `limit` can only tighten the reader's own limit, never raise it.
    pub fn read(&self, relative: &str, limit: Option<u64>) -> ToolboxResult<FileContent> {
        let path = self.resolve(relative)?;

        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(ToolboxError::NotAFile(relative.to_string()));
        }

        let max = limit.map_or(self.max_bytes, |l| l.min(self.max_bytes));
        if meta.len() > max {
            return Err(ToolboxError::TooLarge {
                size: meta.len(),
                max,
            });
        }

        let bytes = std::fs::read(&path)?;
        let size = bytes.len() as u64;
        tracing::debug!("Read {size} bytes from {}", path.display());

        Ok(match String::from_utf8(bytes) {
            Ok(text) => FileContent::Utf8 { text, size },
            Err(e) => FileContent::Base64 {
                data: base64::engine::general_purpose::STANDARD.encode(e.into_bytes()),
                size,
            },
        })
    }

    fn resolve(&self, relative: &str) -> ToolboxResult<PathBuf> {
        let joined = self.root.join(relative);
        let resolved = joined.canonicalize()?;
        if !resolved.starts_with(&self.root) {
            return Err(ToolboxError::OutsideRoot(relative.to_string()));
        }
        Ok(resolved)
    }
}
