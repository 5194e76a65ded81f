//! Small shared helpers that don't belong to any one module.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, per the wire format's timestamp unit.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}
