use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::{RangeSource, check_range, range_len};
use crate::error::{Result, SziError};

/// Local file source with random access support
pub struct LocalFileSource {
    file: std::fs::File,
    size: u64,
}

impl LocalFileSource {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            self.file.seek_read(buf, offset)
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = (buf, offset);
            Err(std::io::ErrorKind::Unsupported.into())
        }
    }
}

#[async_trait]
impl RangeSource for LocalFileSource {
    fn size(&self) -> u64 {
        self.size
    }

    async fn fetch_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        check_range(start, end, self.size)?;
        if cancel.is_cancelled() {
            return Err(SziError::Cancelled);
        }

        let mut buf = vec![0u8; range_len(start, end)?];
        let mut filled = 0;

        // Positional reads may return short; keep going until the range is full
        while filled < buf.len() {
            let n = self.read_at(&mut buf[filled..], start + filled as u64)?;
            if n == 0 {
                return Err(SziError::ShortRead {
                    expected: buf.len() as u64,
                    actual: filled as u64,
                });
            }
            filled += n;
        }

        Ok(buf)
    }
}
