//! # szi-range
//!
//! Random access to single entries of large ZIP archives, such as `.szi`
//! Deep Zoom image bundles, through byte-range reads alone.
//!
//! Opening an archive costs two or three range requests (tail, optional
//! ZIP64 record, central directory), whatever the archive's size. After
//! that, each entry body is one more request. Sources can be remote
//! (HTTP Range requests), local files, or bytes already in memory.
//!
//! ## Features
//!
//! - ZIP64 archives (sizes and offsets beyond 4GB)
//! - STORED (uncompressed) entries, validated when the archive is opened
//! - Concurrent, independently cancellable entry fetches
//! - Manifest (`X/X.dzi`) and tiles directory (`X/X_files/`) discovery
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use szi_range::{ArchiveReader, HttpRangeSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> szi_range::Result<()> {
//!     let source = Arc::new(HttpRangeSource::new("https://example.com/image.szi".to_string()).await?);
//!     let reader = ArchiveReader::open(source).await?;
//!
//!     let manifest = reader.manifest_entry_name()?.to_string();
//!     let xml = reader.fetch_body(&manifest, &CancellationToken::new()).await?;
//!     println!("{}", String::from_utf8_lossy(&xml));
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{ErrorKind, Result, SziError};
pub use io::{HttpOptions, HttpRangeSource, LocalFileSource, MemorySource, RangeSource};
pub use zip::{ArchiveIndex, ArchiveIndexEntry, ArchiveReader, OpenOptions};
