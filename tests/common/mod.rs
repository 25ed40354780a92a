//! Writes small stored archives byte by byte, so tests control every field.

#![allow(dead_code)]

const LFH_SIGNATURE: u32 = 0x04034b50;
const CDFH_SIGNATURE: u32 = 0x02014b50;
const EOCD_SIGNATURE: u32 = 0x06054b50;
const EOCD64_SIGNATURE: u32 = 0x06064b50;
const EOCD64_LOCATOR_SIGNATURE: u32 = 0x07064b50;

pub struct TestEntry {
    pub name: String,
    pub body: Vec<u8>,
    /// Name written into the local header, if different
    pub local_name: Option<String>,
    pub local_extra: Vec<u8>,
    /// Bytes between this body and the next local header
    pub trailing: Vec<u8>,
    /// Compressed size claimed in the central directory, if not the body length
    pub compressed_size: Option<u64>,
}

impl TestEntry {
    pub fn new(name: &str, body: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            body: body.to_vec(),
            local_name: None,
            local_extra: Vec::new(),
            trailing: Vec::new(),
            compressed_size: None,
        }
    }

    pub fn local_extra(mut self, extra: &[u8]) -> Self {
        self.local_extra = extra.to_vec();
        self
    }

    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing = bytes.to_vec();
        self
    }

    pub fn local_name(mut self, name: &str) -> Self {
        self.local_name = Some(name.to_string());
        self
    }

    pub fn compressed_size(mut self, size: u64) -> Self {
        self.compressed_size = Some(size);
        self
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    zip64: bool,
    prefix: Vec<u8>,
}

pub struct BuiltArchive {
    pub bytes: Vec<u8>,
    pub local_offsets: Vec<u64>,
    pub directory_offset: u64,
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn file(self, name: &str, body: &[u8]) -> Self {
        self.entry(TestEntry::new(name, body))
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Saturate every 32/16-bit field and carry the real values in ZIP64
    /// extra fields and records.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    /// Unrelated bytes ahead of the first entry
    pub fn prefix(mut self, bytes: &[u8]) -> Self {
        self.prefix = bytes.to_vec();
        self
    }

    pub fn build(&self) -> BuiltArchive {
        let mut out = self.prefix.clone();
        let mut local_offsets = Vec::new();

        for entry in &self.entries {
            local_offsets.push(out.len() as u64);
            let name = entry.local_name.as_ref().unwrap_or(&entry.name);
            let size = entry.body.len() as u32;

            put32(&mut out, LFH_SIGNATURE);
            put16(&mut out, 20); // version needed
            put16(&mut out, 0); // flags
            put16(&mut out, 0); // method: stored
            put16(&mut out, 0); // time
            put16(&mut out, 0); // date
            put32(&mut out, 0); // crc32, never checked
            put32(&mut out, size);
            put32(&mut out, size);
            put16(&mut out, name.len() as u16);
            put16(&mut out, entry.local_extra.len() as u16);
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&entry.local_extra);
            out.extend_from_slice(&entry.body);
            out.extend_from_slice(&entry.trailing);
        }

        let directory_offset = out.len() as u64;
        for (entry, &offset) in self.entries.iter().zip(&local_offsets) {
            let size = entry.body.len() as u64;
            let compressed = entry.compressed_size.unwrap_or(size);

            // An unrelated extra field first, to be skipped over
            let mut extra = Vec::new();
            put16(&mut extra, 0x5455);
            put16(&mut extra, 5);
            extra.extend_from_slice(&[1, 0, 0, 0, 0]);

            let (size32, compressed32, offset32) = if self.zip64 {
                put16(&mut extra, 0x0001);
                put16(&mut extra, 24);
                put64(&mut extra, size);
                put64(&mut extra, compressed);
                put64(&mut extra, offset);
                (u32::MAX, u32::MAX, u32::MAX)
            } else {
                (size as u32, compressed as u32, offset as u32)
            };

            put32(&mut out, CDFH_SIGNATURE);
            put16(&mut out, 20); // version made by
            put16(&mut out, 20); // version needed
            put16(&mut out, 0); // flags
            put16(&mut out, 0); // method
            put16(&mut out, 0); // time
            put16(&mut out, 0); // date
            put32(&mut out, 0); // crc32
            put32(&mut out, compressed32);
            put32(&mut out, size32);
            put16(&mut out, entry.name.len() as u16);
            put16(&mut out, extra.len() as u16);
            put16(&mut out, 0); // comment length
            put16(&mut out, 0); // disk start
            put16(&mut out, 0); // internal attributes
            put32(&mut out, 0); // external attributes
            put32(&mut out, offset32);
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&extra);
        }
        let directory_size = out.len() as u64 - directory_offset;
        let count = self.entries.len() as u64;

        if self.zip64 {
            let eocd64_offset = out.len() as u64;
            let extensible = [0xEE; 6];

            put32(&mut out, EOCD64_SIGNATURE);
            put64(&mut out, 44 + extensible.len() as u64);
            put16(&mut out, 45);
            put16(&mut out, 45);
            put32(&mut out, 0);
            put32(&mut out, 0);
            put64(&mut out, count);
            put64(&mut out, count);
            put64(&mut out, directory_size);
            put64(&mut out, directory_offset);
            out.extend_from_slice(&extensible);

            put32(&mut out, EOCD64_LOCATOR_SIGNATURE);
            put32(&mut out, 0);
            put64(&mut out, eocd64_offset);
            put32(&mut out, 1);
        }

        let (count16, size32, offset32) = if self.zip64 {
            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (count as u16, directory_size as u32, directory_offset as u32)
        };
        put32(&mut out, EOCD_SIGNATURE);
        put16(&mut out, 0);
        put16(&mut out, 0);
        put16(&mut out, count16);
        put16(&mut out, count16);
        put32(&mut out, size32);
        put32(&mut out, offset32);
        put16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        BuiltArchive {
            bytes: out,
            local_offsets,
            directory_offset,
        }
    }
}
