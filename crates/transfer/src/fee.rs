use chunkdrop_protocol::Fee;
use chunkdrop_protocol::constants::{FEE_OVERHEAD, FEE_UNIT_BYTES, FREE_WRITE_CEILING};

use crate::chunked::EffectiveSize;

/// Returns the payment the store requires for one chunk write.
///
/// Writes whose effective size is at most `24 KiB - 326` bytes are free.
/// Above that the fee is `floor((size + 326) / 1024 / 24)` units, a
/// non-decreasing step function of the size.
pub fn estimate_cost(size: EffectiveSize) -> Fee {
    // size = total / count, so compare and divide on the scaled values
    // to keep the arithmetic exact.
    let total = u128::from(size.total());
    let count = u128::from(size.count());

    if total <= u128::from(FREE_WRITE_CEILING) * count {
        return Fee::FREE;
    }

    let units = (total + u128::from(FEE_OVERHEAD) * count) / (u128::from(FEE_UNIT_BYTES) * count);
    Fee::from_units(u64::try_from(units).unwrap_or(u64::MAX))
}
