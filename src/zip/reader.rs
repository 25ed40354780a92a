use log::{debug, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SziError};
use crate::io::RangeSource;

use super::cursor::ByteCursor;
use super::index::{self, ArchiveIndex, ArchiveIndexEntry};
use super::parser::ZipParser;
use super::structures::LocalFileHeader;

/// Suffix of the Deep Zoom manifest inside an `.szi` archive
pub const DEFAULT_MANIFEST_SUFFIX: &str = "dzi";

/// Settings applied when opening an archive
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Suffix of the `X/X.<suffix>` manifest entry
    pub manifest_suffix: String,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            manifest_suffix: DEFAULT_MANIFEST_SUFFIX.to_string(),
        }
    }
}

/// Serves entry bodies of an opened archive.
///
/// The index is built once by [`open`](Self::open) and never changes, so
/// any number of [`fetch_body`](Self::fetch_body) calls may run at once.
pub struct ArchiveReader<R: RangeSource> {
    source: Arc<R>,
    index: ArchiveIndex,
    manifest_suffix: String,
}

impl<R: RangeSource> ArchiveReader<R> {
    /// Open an archive with default options.
    pub async fn open(source: Arc<R>) -> Result<Self> {
        Self::open_with(source, OpenOptions::default(), &CancellationToken::new()).await
    }

    /// Locate the central directory, decode it and build the index.
    pub async fn open_with(
        source: Arc<R>,
        options: OpenOptions,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let parser = ZipParser::new(source);
        let directory = parser.find_directory(cancel).await?;
        let entries = parser.read_central_directory(&directory, cancel).await?;
        let index = ArchiveIndex::build(entries, directory.directory_offset)?;

        info!(
            "Opened {}archive of {} bytes with {} entries",
            if directory.zip64 { "ZIP64 " } else { "" },
            parser.source().size(),
            index.len()
        );

        Ok(Self {
            source: parser.source().clone(),
            index,
            manifest_suffix: options.manifest_suffix,
        })
    }

    /// Fetch the uncompressed body of `filename`.
    ///
    /// # Errors
    ///
    /// [`SziError::EntryNotFound`] without touching the source if the name
    /// is not in the index; [`SziError::CorruptLocalHeader`] or
    /// [`SziError::FilenameMismatch`] if the fetched bytes don't hold the
    /// expected entry; any error from the source, unchanged.
    pub async fn fetch_body(&self, filename: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(filename)
            .ok_or_else(|| SziError::EntryNotFound(filename.to_string()))?;

        debug!(
            "Fetching {} from {}..{}",
            filename, entry.start, entry.max_end
        );
        let buf = self
            .source
            .fetch_range(entry.start, entry.max_end, cancel)
            .await?;

        extract_body(filename, entry, buf)
    }

    /// Name of the single `X/X.<suffix>` manifest entry.
    pub fn manifest_entry_name(&self) -> Result<&str> {
        self.index.find_manifest(&self.manifest_suffix)
    }

    /// Directory of the tiles described by the manifest, `X/X_files/`.
    pub fn tiles_directory(&self) -> Result<String> {
        Ok(index::tiles_directory(self.manifest_entry_name()?))
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn source(&self) -> &Arc<R> {
        &self.source
    }
}

/// Cut the body of `filename` out of the bytes fetched for its entry.
///
/// The extra field length comes from this local header, not the central
/// directory; the two copies need not agree. Anything after the body
/// (data descriptor, padding, the next entry) is dropped.
fn extract_body(filename: &str, entry: &ArchiveIndexEntry, mut buf: Vec<u8>) -> Result<Vec<u8>> {
    let corrupt = |_: SziError| SziError::CorruptLocalHeader(filename.to_string());
    let body_length =
        usize::try_from(entry.body_length).map_err(|_| SziError::ValueTooLarge(entry.body_length))?;

    let body_start = {
        let mut cursor = ByteCursor::new(&buf);
        let header = LocalFileHeader::parse(&mut cursor, entry.start).map_err(corrupt)?;

        if header.filename != filename {
            return Err(SziError::FilenameMismatch {
                expected: filename.to_string(),
                actual: header.filename,
            });
        }

        cursor
            .skip(header.extra_field_length as i64)
            .map_err(corrupt)?;
        let body_start = cursor.position();
        cursor.read_bytes(body_length).map_err(corrupt)?;
        body_start
    };

    buf.truncate(body_start + body_length);
    buf.drain(..body_start);
    Ok(buf)
}
