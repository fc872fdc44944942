//! Core data types shared by the toolbox services.

use serde::{Deserialize, Serialize};

/// Word, line, and character counts for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub words: usize,
    pub lines: usize,
    pub chars: usize,
    pub bytes: usize,
}

/// Contents of a file read through the sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum FileContent {
    /// Valid UTF-8, returned verbatim.
    Utf8 { text: String, size: u64 },
    /// Anything else, base64-encoded.
    Base64 { data: String, size: u64 },
}

impl FileContent {
    pub fn size(&self) -> u64 {
        match self {
            FileContent::Utf8 { size, .. } | FileContent::Base64 { size, .. } => *size,
        }
    }
}

/// Errors raised by toolbox services.
#[derive(thiserror::Error, Debug)]
pub enum ToolboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Path escapes sandbox root: {0}")]
    OutsideRoot(String),

    #[error("File too large: {size} bytes exceeds {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub type ToolboxResult<T> = Result<T, ToolboxError>;
