mod http;
mod local;
mod memory;

pub use http::{HttpOptions, HttpRangeSource};
pub use local::LocalFileSource;
pub use memory::MemorySource;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SziError};

/// Random access to a fixed-size sequence of bytes, one range at a time.
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Total size of the source in bytes. Fixed for the source's lifetime.
    fn size(&self) -> u64;

    /// Fetch the bytes in `start..end` (end exclusive).
    ///
    /// Fails with [`SziError::RangeOutOfBounds`] if the range does not lie
    /// within the source, and with [`SziError::Cancelled`] if `cancel` fires
    /// before the bytes arrive.
    async fn fetch_range(&self, start: u64, end: u64, cancel: &CancellationToken)
    -> Result<Vec<u8>>;
}

/// Validate `start..end` against a source of `size` bytes.
pub(crate) fn check_range(start: u64, end: u64, size: u64) -> Result<()> {
    if start > size || end > size || start > end {
        return Err(SziError::RangeOutOfBounds { start, end, size });
    }
    Ok(())
}

/// Length of `start..end` as a buffer size.
pub(crate) fn range_len(start: u64, end: u64) -> Result<usize> {
    let len = end - start;
    usize::try_from(len).map_err(|_| SziError::ValueTooLarge(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_checks() {
        assert!(check_range(0, 0, 0).is_ok());
        assert!(check_range(3, 10, 10).is_ok());
        assert!(matches!(
            check_range(11, 11, 10),
            Err(SziError::RangeOutOfBounds { .. })
        ));
        assert!(matches!(
            check_range(0, 11, 10),
            Err(SziError::RangeOutOfBounds { .. })
        ));
        assert!(matches!(
            check_range(5, 4, 10),
            Err(SziError::RangeOutOfBounds { .. })
        ));
    }
}
