//! Random access to stored entries of a ZIP archive.
//!
//! ## Architecture
//!
//! - [`cursor`]: bounds-checked little-endian reads over fetched buffers
//! - [`structures`]: layouts of the ZIP records we decode (EOCD, ZIP64, headers)
//! - [`parser`]: locating and decoding the central directory
//! - [`index`]: the name -> byte range table built from the directory
//! - [`reader`]: the high-level [`ArchiveReader`] API
//!
//! ## Why an upper bound and not an exact range
//!
//! A local file header's length depends on its extra field, which can
//! differ from the copy in the central directory. Rather than guess, each
//! entry is fetched from its local header up to the start of whatever
//! follows it in the file, and the body is sliced out once the real header
//! has been read.
//!
//! ## Supported Features
//!
//! - Standard ZIP format and ZIP64 extensions for archives > 4GB
//! - STORED (no compression) entries only; anything else fails on open
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - File names are always decoded as UTF-8, lossily

pub mod cursor;
pub mod index;
pub mod parser;
pub mod reader;
pub mod structures;

pub use cursor::ByteCursor;
pub use index::{ArchiveIndex, ArchiveIndexEntry};
pub use parser::ZipParser;
pub use reader::{ArchiveReader, DEFAULT_MANIFEST_SUFFIX, OpenOptions};
pub use structures::{CentralDirectoryEntry, DirectoryMetadata};
