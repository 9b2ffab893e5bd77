use std::time::{Duration, UNIX_EPOCH};

/// The time since the unix epoch.
pub fn epoch() -> Duration {
    UNIX_EPOCH
        .elapsed()
        .expect("current time is before unix epoch")
}

/// The time since the unix epoch in whole milliseconds, truncated to 64 bits.
pub fn epoch_ms() -> u64 {
    u64::try_from(epoch().as_millis()).expect("epoch overflows u64 milliseconds")
}
