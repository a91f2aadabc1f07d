//! Environment abstraction for deterministic testing.
//!
//! Decouples the link engine from the system clock, so engine unit tests can
//! drive `tick`/`handle_frame` with arbitrary, reproducible instants instead
//! of racing a real timer.

use std::time::Duration;

/// Abstract environment providing monotonic time and async sleep.
///
/// # Safety
///
/// Implementations MUST guarantee `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments may use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the only async method in the trait. Only driver code (not the
    /// engine core) calls it.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Production [`Environment`] backed by `std::time::Instant` and
/// `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
