//! Randomised inter-cycle delay.

use std::time::Duration;

use rand::Rng;

use crate::config::ScheduleConfig;

/// Closed interval from which each inter-cycle delay is drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    min_seconds: u64,
    max_seconds: u64,
}

impl PollSchedule {
    /// Build a schedule; bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds: min_seconds.min(max_seconds),
            max_seconds: min_seconds.max(max_seconds),
        }
    }

    /// Lower bound in seconds.
    #[must_use]
    pub fn min_seconds(&self) -> u64 {
        self.min_seconds
    }

    /// Upper bound in seconds.
    #[must_use]
    pub fn max_seconds(&self) -> u64 {
        self.max_seconds
    }

    /// Draw the next delay from `rng`.
    pub fn next_delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_seconds..=self.max_seconds))
    }

    /// Draw the next delay from the thread-local generator.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        self.next_delay_with(&mut rand::thread_rng())
    }
}

impl From<&ScheduleConfig> for PollSchedule {
    fn from(config: &ScheduleConfig) -> Self {
        Self::new(config.min_delay_seconds, config.max_delay_seconds)
    }
}
