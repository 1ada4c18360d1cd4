use backon::{BackoffBuilder, ExponentialBuilder};

use std::time::Duration;

/// Backoff iterator for feed reconnection.
/// 1s → 2s → 4s → ... → 20s max, jittered, unlimited retries; the stream
/// loop re-sends the last session selection once the dial succeeds.
pub fn reconnect_backoff() -> impl Iterator<Item = Duration> {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(20))
        .with_jitter()
        .without_max_times()
        .build()
}
