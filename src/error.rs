//! Error types and the related `Result<T>`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SziError>;

/// Broad classification of a [`SziError`].
///
/// Lets callers decide what to do (give up on the archive, report a missing
/// tile, retry the transport) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive bytes do not form a valid archive.
    Malformed,
    /// The archive is valid but uses something we don't handle.
    Unsupported,
    /// The requested entry or convention is absent.
    NotFound,
    /// The range source failed to deliver bytes.
    Transport,
    /// The caller cancelled the operation.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SziError {
    /// A cursor read or skip would leave the backing buffer.
    #[error("Read of {delta} bytes at position {position} leaves buffer of length {len}")]
    OutOfBounds {
        position: usize,
        delta: i64,
        len: usize,
    },

    /// A 64-bit field holds a value larger than a file offset can express.
    #[error("Value {0} is too large to be used as a size or offset")]
    ValueTooLarge(u64),

    #[error("No End of Central Directory record found")]
    DirectoryNotFound,

    /// A record did not start with its magic number where one was expected.
    #[error("Unexpected signature for {record} at offset {offset}")]
    UnexpectedSignature { record: &'static str, offset: u64 },

    #[error("Invalid ZIP64 structure: {0}")]
    InvalidZip64(&'static str),

    /// The trailer places the central directory outside the archive.
    #[error("Central directory at {offset} ({size} bytes) runs past the end of the archive")]
    InvalidDirectory { offset: u64, size: u64 },

    #[error("Central directory entry {0} is corrupt")]
    CorruptDirectoryEntry(u64),

    #[error(
        "{filename} is compressed ({compressed_size} bytes, {uncompressed_size} uncompressed); \
         only stored entries are supported"
    )]
    UnsupportedCompression {
        filename: String,
        compressed_size: u64,
        uncompressed_size: u64,
    },

    /// The local header offset lies at or past the central directory.
    #[error("{filename} claims a local header at {offset}, outside the entry area")]
    InvalidEntryOffset { filename: String, offset: u64 },

    #[error("{0} is not present in this archive")]
    EntryNotFound(String),

    #[error("Local header of {0} is corrupt")]
    CorruptLocalHeader(String),

    #[error("Trying to read {expected} but actually got {actual}")]
    FilenameMismatch { expected: String, actual: String },

    #[error("No manifest entry found in archive")]
    ManifestNotFound,

    #[error("Multiple manifest entries found in archive: {0:?}")]
    AmbiguousManifest(Vec<String>),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Range {start}..{end} is outside the source (size {size})")]
    RangeOutOfBounds { start: u64, end: u64, size: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Remote server does not support Range requests")]
    RangeNotSupported,

    #[error("Remote server did not return Content-Length")]
    MissingContentLength,

    #[error("Expected {expected} bytes from source, got {actual}")]
    ShortRead { expected: u64, actual: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SziError {
    pub fn kind(&self) -> ErrorKind {
        use SziError::*;

        match self {
            OutOfBounds { .. }
            | DirectoryNotFound
            | UnexpectedSignature { .. }
            | InvalidZip64(_)
            | InvalidDirectory { .. }
            | CorruptDirectoryEntry(_)
            | InvalidEntryOffset { .. }
            | CorruptLocalHeader(_)
            | FilenameMismatch { .. } => ErrorKind::Malformed,
            ValueTooLarge(_) | UnsupportedCompression { .. } => ErrorKind::Unsupported,
            EntryNotFound(_) | ManifestNotFound | AmbiguousManifest(_) => ErrorKind::NotFound,
            Cancelled => ErrorKind::Cancelled,
            RangeOutOfBounds { .. }
            | Http(_)
            | HttpStatus(_)
            | RangeNotSupported
            | MissingContentLength
            | ShortRead { .. }
            | Io(_) => ErrorKind::Transport,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_archive_entry_and_transport_failures() {
        assert_eq!(SziError::DirectoryNotFound.kind(), ErrorKind::Malformed);
        assert_eq!(
            SziError::EntryNotFound("a/a.dzi".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SziError::HttpStatus(reqwest::StatusCode::NOT_FOUND).kind(),
            ErrorKind::Transport
        );
        assert!(SziError::Cancelled.is_cancelled());
    }

    #[test]
    fn directory_past_the_end_is_not_a_transport_failure() {
        let err = SziError::InvalidDirectory {
            offset: 0x10_0000,
            size: 62,
        };
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(
            SziError::RangeOutOfBounds {
                start: 0,
                end: 10,
                size: 5
            }
            .kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn mismatch_message_names_both_files() {
        let err = SziError::FilenameMismatch {
            expected: "a/a.dzi".into(),
            actual: "b/b.dzi".into(),
        };
        assert_eq!(err.to_string(), "Trying to read a/a.dzi but actually got b/b.dzi");
    }
}
