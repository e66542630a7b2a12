//! Retry knob for the idempotent listing read.

use std::time::Duration;

use rand::Rng;

/// How often, and with what jittered spacing, a failed listing is retried.
///
/// The default is zero retries: one request, failure surfaced as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay range in milliseconds between attempts (min, max)
    pub delay_ms: (u64, u64),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay_ms: (0, 0),
        }
    }

    /// Draw one delay per allowed retry.
    ///
    /// Computed upfront so no `ThreadRng` is held across an await.
    pub fn delays(&self) -> Vec<Duration> {
        let (min, max) = if self.delay_ms.0 <= self.delay_ms.1 {
            self.delay_ms
        } else {
            (self.delay_ms.1, self.delay_ms.0)
        };

        let mut rng = rand::thread_rng();
        (0..self.max_retries)
            .map(|_| Duration::from_millis(rng.gen_range(min..=max)))
            .collect()
    }
}
