use log::trace;

use super::cursor::ByteCursor;
use crate::error::{Result, SziError};

pub const MAX_U16: u16 = 0xFFFF;
pub const MAX_U32: u32 = 0xFFFF_FFFF;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
pub const MAX_COMMENT_SIZE: usize = MAX_U16 as usize;

/// Header ID of the ZIP64 extended information extra field
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// End of Central Directory (EOCD) - 22 bytes plus comment
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: [u8; 4] = *b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Parse the record and step over its comment.
    ///
    /// `offset` is only used to report where a bad signature was seen.
    pub fn parse(cursor: &mut ByteCursor<'_>, offset: u64) -> Result<Self> {
        if cursor.read_bytes(4)? != Self::SIGNATURE {
            return Err(SziError::UnexpectedSignature {
                record: "End of Central Directory",
                offset,
            });
        }

        let eocd = Self {
            disk_number: cursor.read_u16()?,
            disk_with_cd: cursor.read_u16()?,
            disk_entries: cursor.read_u16()?,
            total_entries: cursor.read_u16()?,
            cd_size: cursor.read_u32()?,
            cd_offset: cursor.read_u32()?,
            comment_len: cursor.read_u16()?,
        };
        cursor.skip(eocd.comment_len as i64)?;

        Ok(eocd)
    }

    /// Whether any field is saturated, deferring to the ZIP64 record.
    pub fn is_zip64(&self) -> bool {
        self.total_entries == MAX_U16 || self.cd_size == MAX_U32 || self.cd_offset == MAX_U32
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone)]
pub struct Zip64EocdLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EocdLocator {
    pub const SIGNATURE: [u8; 4] = *b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn parse(cursor: &mut ByteCursor<'_>, offset: u64) -> Result<Self> {
        if cursor.read_bytes(4)? != Self::SIGNATURE {
            return Err(SziError::UnexpectedSignature {
                record: "ZIP64 End of Central Directory Locator",
                offset,
            });
        }

        Ok(Self {
            disk_with_eocd64: cursor.read_u32()?,
            eocd64_offset: cursor.read_u64()?,
            total_disks: cursor.read_u32()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes plus extensible data
#[derive(Debug, Clone)]
pub struct Zip64Eocd {
    pub record_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64Eocd {
    pub const SIGNATURE: [u8; 4] = *b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;
    /// The stored size excludes the signature and the size field itself.
    const SIZE_FIELD_EXCLUDES: u64 = 12;

    /// Parse the record and step over its extensible data sector.
    pub fn parse(cursor: &mut ByteCursor<'_>, offset: u64) -> Result<Self> {
        let start = cursor.position();
        if cursor.read_bytes(4)? != Self::SIGNATURE {
            return Err(SziError::UnexpectedSignature {
                record: "ZIP64 End of Central Directory",
                offset,
            });
        }

        let record = Self {
            record_size: cursor.read_u64()? + Self::SIZE_FIELD_EXCLUDES,
            version_made_by: cursor.read_u16()?,
            version_needed: cursor.read_u16()?,
            disk_number: cursor.read_u32()?,
            disk_with_cd: cursor.read_u32()?,
            disk_entries: cursor.read_u64()?,
            total_entries: cursor.read_u64()?,
            cd_size: cursor.read_u64()?,
            cd_offset: cursor.read_u64()?,
        };

        // The extensible data sector is reserved by PKWARE; we don't interpret it
        let consumed = (cursor.position() - start) as u64;
        let extensible = record
            .record_size
            .checked_sub(consumed)
            .ok_or(SziError::InvalidZip64("record shorter than its fixed fields"))?;
        cursor.skip(extensible as i64)?;

        Ok(record)
    }
}

/// Where the central directory lives and how many entries it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryMetadata {
    pub total_entries: u64,
    pub directory_offset: u64,
    pub directory_size: u64,
    /// Whether the values came from the ZIP64 record
    pub zip64: bool,
}

impl From<&EndOfCentralDirectory> for DirectoryMetadata {
    fn from(eocd: &EndOfCentralDirectory) -> Self {
        Self {
            total_entries: eocd.total_entries as u64,
            directory_offset: eocd.cd_offset as u64,
            directory_size: eocd.cd_size as u64,
            zip64: false,
        }
    }
}

impl From<&Zip64Eocd> for DirectoryMetadata {
    fn from(eocd64: &Zip64Eocd) -> Self {
        Self {
            total_entries: eocd64.total_entries,
            directory_offset: eocd64.cd_offset,
            directory_size: eocd64.cd_size,
            zip64: true,
        }
    }
}

/// Values from a ZIP64 extended information field.
///
/// Each value is present only when the matching header field is saturated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64ExtendedInfo {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub local_header_offset: Option<u64>,
    pub disk_start: Option<u32>,
}

/// The nominal (32/16-bit) header fields a ZIP64 field may override
#[derive(Debug, Clone, Copy)]
pub struct NominalFields {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub local_header_offset: u32,
    pub disk_start: u16,
}

impl Zip64ExtendedInfo {
    fn parse(data: &[u8], nominal: &NominalFields) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let mut info = Self::default();

        if nominal.uncompressed_size == MAX_U32 {
            info.uncompressed_size = Some(cursor.read_u64()?);
        }
        if nominal.compressed_size == MAX_U32 {
            info.compressed_size = Some(cursor.read_u64()?);
        }
        if nominal.local_header_offset == MAX_U32 {
            info.local_header_offset = Some(cursor.read_u64()?);
        }
        if nominal.disk_start == MAX_U16 {
            info.disk_start = Some(cursor.read_u32()?);
        }

        Ok(info)
    }
}

/// Walk an extra field block, collecting any ZIP64 overrides.
///
/// Sub-fields other than ZIP64 are skipped by their declared length. A
/// trailing fragment too short to hold a sub-field header is ignored.
pub fn scan_extra_fields(block: &[u8], nominal: &NominalFields) -> Result<Zip64ExtendedInfo> {
    let mut cursor = ByteCursor::new(block);
    let mut overrides = Zip64ExtendedInfo::default();

    while cursor.remaining() >= 4 {
        let id = cursor.read_u16()?;
        let len = cursor.read_u16()?;
        let data = cursor.read_bytes(len as usize)?;

        match id {
            ZIP64_EXTRA_FIELD_ID => overrides = Zip64ExtendedInfo::parse(data, nominal)?,
            _ => trace!("Skipping extra field {id:#06x} ({len} bytes)"),
        }
    }

    Ok(overrides)
}

/// Entry metadata taken from a Central Directory File Header (CDFH)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub filename: String,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
    pub disk_start: u32,
}

impl CentralDirectoryEntry {
    pub const SIGNATURE: [u8; 4] = *b"PK\x01\x02";
    pub const MIN_SIZE: usize = 46;

    /// Parse the `index`th header of the central directory.
    ///
    /// Fails with [`SziError::UnsupportedCompression`] unless the entry is
    /// stored, judged on its sizes after ZIP64 overrides.
    pub fn parse(cursor: &mut ByteCursor<'_>, index: u64) -> Result<Self> {
        if cursor.read_bytes(4)? != Self::SIGNATURE {
            return Err(SziError::CorruptDirectoryEntry(index));
        }

        let _version_made_by = cursor.read_u16()?;
        let _version_needed = cursor.read_u16()?;
        let _flags = cursor.read_u16()?;
        let _compression_method = cursor.read_u16()?;
        let _last_mod_time = cursor.read_u16()?;
        let _last_mod_date = cursor.read_u16()?;
        let _crc32 = cursor.read_u32()?;
        let compressed_size = cursor.read_u32()?;
        let uncompressed_size = cursor.read_u32()?;
        let file_name_length = cursor.read_u16()?;
        let extra_field_length = cursor.read_u16()?;
        let file_comment_length = cursor.read_u16()?;
        let disk_start = cursor.read_u16()?;
        let _internal_attrs = cursor.read_u16()?;
        let _external_attrs = cursor.read_u32()?;
        let local_header_offset = cursor.read_u32()?;

        let filename = cursor.read_utf8_lossy(file_name_length as usize)?;

        let nominal = NominalFields {
            uncompressed_size,
            compressed_size,
            local_header_offset,
            disk_start,
        };
        let extra = cursor.read_bytes(extra_field_length as usize)?;
        let overrides = scan_extra_fields(extra, &nominal)?;

        cursor.skip(file_comment_length as i64)?;

        let compressed_size = overrides.compressed_size.unwrap_or(compressed_size as u64);
        let uncompressed_size = overrides
            .uncompressed_size
            .unwrap_or(uncompressed_size as u64);
        if compressed_size != uncompressed_size {
            return Err(SziError::UnsupportedCompression {
                filename,
                compressed_size,
                uncompressed_size,
            });
        }

        Ok(Self {
            filename,
            uncompressed_size,
            local_header_offset: overrides
                .local_header_offset
                .unwrap_or(local_header_offset as u64),
            disk_start: overrides.disk_start.unwrap_or(disk_start as u32),
        })
    }
}

/// The part of a Local File Header (LFH) needed to find the entry's body
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub filename: String,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: [u8; 4] = *b"PK\x03\x04";
    pub const SIZE: usize = 30;
    /// Bytes between the signature and the filename length field
    const FIXED_FIELDS_SIZE: i64 = 22;

    /// Parse the header up to and including the filename.
    ///
    /// The cursor is left at the start of the extra field.
    pub fn parse(cursor: &mut ByteCursor<'_>, offset: u64) -> Result<Self> {
        if cursor.read_bytes(4)? != Self::SIGNATURE {
            return Err(SziError::UnexpectedSignature {
                record: "Local File Header",
                offset,
            });
        }

        cursor.skip(Self::FIXED_FIELDS_SIZE)?;
        let file_name_length = cursor.read_u16()?;
        let extra_field_length = cursor.read_u16()?;
        let filename = cursor.read_utf8_lossy(file_name_length as usize)?;

        Ok(Self {
            filename,
            extra_field_length,
        })
    }
}
