//! Opaque wall-clock timestamps.
//!
//! Grounded on `examples/original_source/miner.go`'s use of `time.Now().String()`:
//! the protocol never parses a transaction's or block header's `timestamp`
//! field back into a structured time, so this only needs to produce a
//! string that's stable to serialize and distinct call-to-call. No calendar
//! crate is pulled in for it.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds and nanoseconds since the Unix epoch, rendered as `"<secs>.<nanos>"`.
pub fn now_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:09}", now.as_secs(), now.subsec_nanos())
}
