//! Sequential little-endian reads over a fetched buffer.
//!
//! Every buffer fetched from a [`RangeSource`](crate::io::RangeSource) gets
//! its own [`ByteCursor`]; cursors never outlive the buffer they read.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, SziError};

/// Largest value a 64-bit field may hold and still be used as a size or
/// offset. File offsets are signed on every platform we read from.
pub const MAX_SAFE_VALUE: u64 = i64::MAX as u64;

/// Bounds-checked reader over a byte slice.
///
/// Any read or skip that would move the position before the start or past
/// the end of the buffer fails with [`SziError::OutOfBounds`] and leaves
/// the position unchanged.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Position after moving `delta` bytes, if that stays inside the buffer.
    fn target(&self, delta: i64) -> Result<usize> {
        let out_of_bounds = || SziError::OutOfBounds {
            position: self.pos,
            delta,
            len: self.buf.len(),
        };

        let delta = isize::try_from(delta).map_err(|_| out_of_bounds())?;
        match self.pos.checked_add_signed(delta) {
            Some(target) if target <= self.buf.len() => Ok(target),
            _ => Err(out_of_bounds()),
        }
    }

    /// Move the position by `delta` bytes, backwards if negative.
    pub fn skip(&mut self, delta: i64) -> Result<()> {
        self.pos = self.target(delta)?;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let delta = i64::try_from(len).map_err(|_| SziError::ValueTooLarge(len as u64))?;
        let end = self.target(delta)?;
        let buf = self.buf;
        let bytes = &buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    /// Read a 64-bit size or offset, rejecting values above [`MAX_SAFE_VALUE`].
    pub fn read_u64(&mut self) -> Result<u64> {
        let start = self.pos;
        let value = LittleEndian::read_u64(self.read_bytes(8)?);
        if value > MAX_SAFE_VALUE {
            self.pos = start;
            return Err(SziError::ValueTooLarge(value));
        }
        Ok(value)
    }

    /// Read `len` bytes as UTF-8, replacing invalid sequences with U+FFFD.
    ///
    /// Archive names carry no reliable encoding marker. Lossy decoding keeps
    /// `/`, `_files` and the manifest suffix intact, which is all the
    /// index needs.
    pub fn read_utf8_lossy(&mut self, len: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(self.read_bytes(len)?).into_owned())
    }
}
