//! Process-wide transaction ID allocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

/// The kernel MAD layer owns the upper 32 bits of the TID.
const TID_MASK: u64 = 0xFFFF_FFFF;

static NEXT_TID: OnceLock<AtomicU64> = OnceLock::new();

/// Allocate the next transaction ID.
///
/// Randomly seeded on first use, then incremented; never returns 0.
pub fn next_transaction_id() -> u64 {
    let counter = NEXT_TID.get_or_init(|| AtomicU64::new(seed()));
    loop {
        let tid = counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & TID_MASK;
        if tid != 0 {
            trace!(tid, "allocated transaction id");
            return tid;
        }
    }
}

fn seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ ((std::process::id() as u64) << 16)
}
