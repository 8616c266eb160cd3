//! Drift-free one-second clock.
//!
//! The clock is armed once and never re-armed: deadlines are always computed
//! from the instant it was armed, so a late wakeup never shifts later
//! ticks. When the loop was busy (e.g. playing audio) for several periods, the
//! next `wait()` reports all of them at once and the caller catches up.

use tokio::time::{sleep_until, Duration, Instant};

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Periodic clock reporting whole elapsed periods.
#[derive(Debug, Clone)]
pub struct TickClock {
    origin: Instant,
    period: Duration,
    /// Periods already reported
    consumed: u64,
}

impl TickClock {
    /// Arms a clock with the first expiry one `period` from now.
    pub fn start(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    /// Arms a clock counting from `origin`.
    pub fn starting_at(origin: Instant, period: Duration) -> Self {
        Self {
            origin,
            period: period.max(Duration::from_nanos(1)),
            consumed: 0,
        }
    }

    fn offset(&self, periods: u64) -> Duration {
        let nanos = self.period.as_nanos().saturating_mul(u128::from(periods));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Instant of the next unreported expiry.
    pub fn next_deadline(&self) -> Instant {
        self.origin + self.offset(self.consumed + 1)
    }

    /// Periods elapsed at `now` that have not been reported yet.
    pub fn expirations_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        let total = u64::try_from(elapsed / self.period.as_nanos()).unwrap_or(u64::MAX);
        total.saturating_sub(self.consumed)
    }

    /// Marks the periods elapsed at `now` as reported and returns their count.
    pub fn consume_at(&mut self, now: Instant) -> u64 {
        let expirations = self.expirations_at(now);
        self.consumed += expirations;
        expirations
    }

    /// Waits for the next expiry and returns how many periods elapsed (≥ 1).
    ///
    /// Cancel safe: nothing is consumed unless the wait completes.
    pub async fn wait(&mut self) -> u64 {
        sleep_until(self.next_deadline()).await;
        self.consume_at(Instant::now()).max(1)
    }

    /// Total periods reported so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}
