//! [`Pacer`] – the cadence controller.
//!
//! Governs the interval between scheduler ticks.  [`Pacer::wait`] suspends
//! for `1/rate_hz` seconds unless the skip flag has been raised since the
//! last wait, in which case it returns immediately and clears the flag.
//! Any input source (or the scheduler itself) may raise the flag through a
//! cloned [`SkipFlag`][cortex_types::SkipFlag] handle – "more input is
//! already buffered, don't wait".
//!
//! The flag is a single persistent boolean, not a queue: raising it twice
//! skips one wait.  There are no cancellation semantics beyond process
//! shutdown.

use std::time::Duration;

use cortex_types::SkipFlag;

/// Tick-rate governor with back-pressure skip.
pub struct Pacer {
    period: Duration,
    skip: SkipFlag,
}

impl Pacer {
    /// `rate_hz` is clamped to a sane floor so a zero/negative configured
    /// rate cannot produce an unbounded sleep.
    pub fn new(rate_hz: f32, skip: SkipFlag) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.001 {
            rate_hz
        } else {
            0.001
        };
        Self {
            period: Duration::from_secs_f32(1.0 / rate),
            skip,
        }
    }

    /// The configured inter-tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// A handle sources use to request a skipped wait.
    pub fn skip_flag(&self) -> SkipFlag {
        self.skip.clone()
    }

    /// Sleep one period, or return immediately (clearing the flag) when a
    /// skip was requested since the last wait.
    pub async fn wait(&self) {
        if self.skip.consume() {
            return;
        }
        tokio::time::sleep(self.period).await;
    }
}
