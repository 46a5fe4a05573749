//! Time source abstraction providing the clock and the delays required by the
//! decoder poll loop, receive timeouts and packet timestamps.
use embassy_time::{Duration, Instant};

/// Timer trait abstraction; shared between the session tasks, so it only takes `&self`.
pub trait LinkTimer {
    /// Current instant of the monotonic clock.
    fn now(&self) -> Instant;
    /// Asynchronously wait for `duration`.
    fn delay<'a>(&'a self, duration: Duration) -> impl core::future::Future<Output = ()> + 'a;
}
