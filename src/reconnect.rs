use std::time::Duration;

/// Longest wait between two connection attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const BACKOFF_FACTOR: f64 = 1.5;

/// Backoff bookkeeping for reconnecting the telemetry source.
///
/// Attempts never stop; only the spacing grows. A success puts the delay
/// back to the base interval.
#[derive(Clone, Debug)]
pub struct ReconnectState {
    base_delay: Duration,
    current_delay: Duration,
    /// Consecutive failures since the last success.
    pub failures: u32,
    /// All attempts since startup, successful or not.
    pub total_attempts: u64,
    pub successes: u64,
}

impl ReconnectState {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            current_delay: base_delay,
            failures: 0,
            total_attempts: 0,
            successes: 0,
        }
    }

    /// How long to wait before the next check.
    pub fn delay(&self) -> Duration {
        self.current_delay
    }

    pub fn record_failure(&mut self, source: &str, reason: &dyn std::fmt::Display) {
        self.failures += 1;
        self.total_attempts += 1;

        let cap = MAX_RETRY_DELAY.max(self.base_delay);
        self.current_delay = Duration::from_secs_f64(
            (self.current_delay.as_secs_f64() * BACKOFF_FACTOR).min(cap.as_secs_f64()),
        );

        // Only the first failure of a streak is interesting at info level.
        if self.failures == 1 {
            log::info!("Waiting for {}: {}", source, reason);
        } else {
            log::debug!(
                "{} still unavailable after {} attempts, next retry in {:.1}s",
                source,
                self.failures,
                self.current_delay.as_secs_f64()
            );
        }
    }

    pub fn record_success(&mut self, source: &str) {
        self.total_attempts += 1;
        self.successes += 1;
        if self.failures > 0 {
            log::info!("{} reconnected after {} failed attempt(s)", source, self.failures);
        }
        self.failures = 0;
        self.current_delay = self.base_delay;
    }

    pub fn status(&self) -> String {
        if self.failures == 0 {
            "connected".to_string()
        } else {
            format!(
                "retrying (attempt {}, next in {:.1}s)",
                self.failures + 1,
                self.current_delay.as_secs_f64()
            )
        }
    }
}
