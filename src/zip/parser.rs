//! Low-level ZIP archive parser.
//!
//! This module locates and decodes the archive's directory structures,
//! reading from any source that implements the [`RangeSource`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Fetch the tail once and search it backwards for the End of Central
//!    Directory (EOCD) record, which may be followed by a comment
//! 2. If the EOCD is saturated, follow the ZIP64 locator that sits just in
//!    front of it to the ZIP64 EOCD record
//! 3. Fetch the whole Central Directory in one request and decode each
//!    file header from it
//!
//! That is two or three range requests regardless of archive size, which
//! keeps opening a multi-gigabyte remote archive cheap.

use log::{debug, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SziError};
use crate::io::RangeSource;

use super::cursor::ByteCursor;
use super::structures::*;

/// Find the EOCD record in a buffer holding the archive's tail.
///
/// Candidates are tried from the back. One is accepted only if its declared
/// comment runs exactly to the end of the buffer, so a stray signature
/// inside the comment text is passed over and the search carries on one
/// byte further back.
///
/// Returns the record and its position in `buf`.
pub fn locate_eocd(buf: &[u8]) -> Option<(usize, EndOfCentralDirectory)> {
    if buf.len() < EndOfCentralDirectory::SIZE {
        return None;
    }

    for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
        if buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
            continue;
        }

        let mut cursor = ByteCursor::new(&buf[i..]);
        match EndOfCentralDirectory::parse(&mut cursor, i as u64) {
            Ok(eocd) if cursor.remaining() == 0 => return Some((i, eocd)),
            _ => debug!("Rejected EOCD candidate at tail offset {}", i),
        }
    }

    None
}

/// Reads the directory structures of an archive.
///
/// Typically used through [`ArchiveReader`](super::ArchiveReader)
/// rather than directly.
pub struct ZipParser<R: RangeSource> {
    /// The underlying data source
    source: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: RangeSource> ZipParser<R> {
    pub fn new(source: Arc<R>) -> Self {
        let size = source.size();
        Self { source, size }
    }

    /// Find where the central directory is and how many entries it holds.
    ///
    /// # Errors
    ///
    /// [`SziError::DirectoryNotFound`] if no valid EOCD record sits in the
    /// tail of the archive, or any error from the ZIP64 records when the
    /// EOCD defers to them.
    pub async fn find_directory(&self, cancel: &CancellationToken) -> Result<DirectoryMetadata> {
        // The EOCD, its comment and a possible ZIP64 locator in front of it
        let search_size = ((EndOfCentralDirectory::SIZE
            + Zip64EocdLocator::SIZE
            + MAX_COMMENT_SIZE) as u64)
            .min(self.size);
        let search_start = self.size - search_size;

        let tail = self
            .source
            .fetch_range(search_start, self.size, cancel)
            .await?;

        let (eocd_pos, eocd) = locate_eocd(&tail).ok_or(SziError::DirectoryNotFound)?;
        debug!(
            "EOCD at offset {} ({} byte comment)",
            search_start + eocd_pos as u64,
            eocd.comment_len
        );

        if !eocd.is_zip64() {
            return Ok(DirectoryMetadata::from(&eocd));
        }

        let locator_pos = eocd_pos
            .checked_sub(Zip64EocdLocator::SIZE)
            .ok_or(SziError::InvalidZip64("no room for locator before EOCD"))?;
        let locator_offset = search_start + locator_pos as u64;

        let mut cursor = ByteCursor::new(&tail[locator_pos..]);
        let locator = Zip64EocdLocator::parse(&mut cursor, locator_offset)?;

        let eocd64 = self.read_zip64_eocd(&locator, locator_offset, cancel).await?;
        Ok(DirectoryMetadata::from(&eocd64))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// The record runs from the offset named by the locator up to the
    /// locator itself, extensible data sector included.
    async fn read_zip64_eocd(
        &self,
        locator: &Zip64EocdLocator,
        locator_offset: u64,
        cancel: &CancellationToken,
    ) -> Result<Zip64Eocd> {
        let start = locator.eocd64_offset;
        if start + Zip64Eocd::MIN_SIZE as u64 > locator_offset {
            return Err(SziError::InvalidZip64("record overlaps its locator"));
        }

        let buf = self
            .source
            .fetch_range(start, locator_offset, cancel)
            .await?;
        let eocd64 = Zip64Eocd::parse(&mut ByteCursor::new(&buf), start)?;
        debug!("ZIP64 EOCD at offset {start}");

        Ok(eocd64)
    }

    /// Fetch the central directory and decode every file header in it.
    ///
    /// Fails with [`SziError::InvalidDirectory`] before fetching anything if
    /// the directory does not fit inside the archive. Otherwise fails on the
    /// first entry that is corrupt or not stored; nothing is returned for
    /// the entries before it.
    pub async fn read_central_directory(
        &self,
        directory: &DirectoryMetadata,
        cancel: &CancellationToken,
    ) -> Result<Vec<CentralDirectoryEntry>> {
        let start = directory.directory_offset;
        let end = start
            .checked_add(directory.directory_size)
            .ok_or(SziError::ValueTooLarge(directory.directory_size))?;
        if end > self.size {
            return Err(SziError::InvalidDirectory {
                offset: start,
                size: directory.directory_size,
            });
        }

        // The whole directory in one request
        let cd_data = self.source.fetch_range(start, end, cancel).await?;

        // Don't trust the declared count for the allocation
        let capacity = directory
            .total_entries
            .min((cd_data.len() / CentralDirectoryEntry::MIN_SIZE) as u64);
        let mut entries = Vec::with_capacity(capacity as usize);
        let mut cursor = ByteCursor::new(&cd_data);

        for index in 0..directory.total_entries {
            entries.push(CentralDirectoryEntry::parse(&mut cursor, index)?);
        }

        info!(
            "Read {} entries from central directory at offset {}",
            entries.len(),
            start
        );

        Ok(entries)
    }

    pub fn source(&self) -> &Arc<R> {
        &self.source
    }
}
