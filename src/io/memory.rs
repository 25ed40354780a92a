use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{RangeSource, check_range, range_len};
use crate::error::{Result, SziError};

/// Range source over bytes already held in memory.
///
/// Counts the fetches it serves, which makes it handy for checking how
/// many round trips an operation would cost against a remote source.
pub struct MemorySource {
    data: Vec<u8>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of successful range fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn fetch_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        check_range(start, end, self.size())?;
        if cancel.is_cancelled() {
            return Err(SziError::Cancelled);
        }

        let start = range_len(0, start)?;
        let end = range_len(0, end)?;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.data[start..end].to_vec())
    }
}
