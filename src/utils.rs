use std::time::{Duration, Instant};

/// Logs the time spent in `l_step` since `prev` and returns the new elapsed mark.
pub(crate) fn trace(profile: bool, l_type: &str, l_step: &str, start: Instant, prev: Duration) -> Duration {
    let elapsed = start.elapsed();
    if profile {
        log::info!("{} | Total={:.2?} | {}={:.2?}", l_type, elapsed, l_step, elapsed - prev);
    }
    else {
        log::trace!("{} | Total={:.2?} | {}={:.2?}", l_type, elapsed, l_step, elapsed - prev);
    }
    elapsed
}
