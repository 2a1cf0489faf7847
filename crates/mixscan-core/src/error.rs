//! Error types for the mixscan-core library.
//!
//! Only structural problems with a container are errors. Content detectors
//! never fail: a detector that cannot make sense of an entry simply declines.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mixscan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all mixscan operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error while reading from a stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed, truncated or inconsistent directory header
    #[error("invalid container header at offset {offset}: {details}")]
    InvalidHeader {
        /// Byte offset where the problem was detected
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A directory record points outside the data area
    #[error(
        "entry {key:08X} at offset {offset} with length {length} exceeds data area of {data_size} bytes"
    )]
    EntryOutOfBounds {
        /// Key of the offending record
        key: u32,
        /// Declared offset, relative to the data area
        offset: u32,
        /// Declared length
        length: u32,
        /// Size of the data area
        data_size: u32,
    },

    /// The same key appears twice in one directory
    #[error("duplicate key {key:08X} in container directory")]
    DuplicateKey {
        /// The repeated key
        key: u32,
    },

    /// Requested key is absent from the directory
    #[error("no entry with key {key:08X}")]
    NotFound {
        /// The key that was looked up
        key: u32,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new header error
    pub fn invalid_header(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidHeader {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new not-found error
    pub fn not_found(key: u32) -> Self {
        Self::NotFound { key }
    }

    /// Returns true if the error describes a malformed container
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader { .. } | Self::EntryOutOfBounds { .. } | Self::DuplicateKey { .. }
        )
    }

    /// Returns true if this is a recoverable error that should be skipped
    ///
    /// A nested entry that fails to open as a container is not fatal for the
    /// surrounding scan.
    pub fn is_recoverable(&self) -> bool {
        self.is_format_error() || matches!(self, Self::NotFound { .. })
    }
}
