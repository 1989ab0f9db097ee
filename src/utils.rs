//! Time helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Current unix time in seconds
pub fn now_secs() -> u64 {
    now_millis() / 1000
}

/// Whether a value last updated at `last_updated` (ms) is older than `stale_time` (ms)
pub fn is_stale(last_updated: u64, stale_time: u64) -> bool {
    last_updated == 0 || now_millis().saturating_sub(last_updated) > stale_time
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stale() {
        assert!(is_stale(0, 15_000));
        assert!(!is_stale(now_millis(), 15_000));
        assert!(is_stale(now_millis() - 20_000, 15_000));
    }
}
