//! Millisecond wall-clock helpers.
//!
//! Frames and peer advertisements carry milliseconds since the Unix epoch
//! as signed 64-bit values.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Milliseconds elapsed since `then_ms`, saturating at zero.
pub fn millis_since(then_ms: i64) -> i64 {
    (now_millis() - then_ms).max(0)
}
