use std::time::Duration;

/// Trait for controlling reconnection pacing
///
/// The lifecycle manager asks for a delay before each reconnection attempt;
/// `None` means give up, which transitions the client to its terminal state
/// for the cycle.
pub trait ReconnectStrategy: Send + Sync {
    /// Delay before reconnection attempt `attempt` (0-indexed), or `None`
    /// to stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;
}

/// Exponential backoff with a bounded maximum delay
///
/// Delay grows as `initial * 2^attempt`, capped at `max_delay`. Attempts are
/// bounded by `max_attempts`, or unbounded when `None`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }
}

impl ReconnectStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let base = self.initial_delay.as_millis() as u64;
        // Saturate instead of overflowing for absurd attempt counts.
        let scaled = base.checked_shl(attempt.min(u32::MAX as usize) as u32).unwrap_or(u64::MAX);
        let capped = scaled.min(self.max_delay.as_millis() as u64);
        Some(Duration::from_millis(capped))
    }
}

/// Fixed delay between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }
}

/// Never reconnect
///
/// A lost connection leaves the client disconnected; the caller decides
/// whether to `open()` again.
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_growth_is_capped() {
        let strategy = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_secs(2),
            None,
        );

        assert_eq!(strategy.next_delay(0), Some(Duration::from_millis(100)));
        assert_eq!(strategy.next_delay(1), Some(Duration::from_millis(200)));
        assert_eq!(strategy.next_delay(2), Some(Duration::from_millis(400)));
        // 100ms * 2^10 would be ~102s, capped at 2s.
        assert_eq!(strategy.next_delay(10), Some(Duration::from_secs(2)));
        // Far past any realistic attempt count; must not overflow.
        assert_eq!(strategy.next_delay(500), Some(Duration::from_secs(2)));
    }

    #[test]
    fn exponential_respects_attempt_bound() {
        let strategy = ExponentialBackoff::new(
            Duration::from_millis(10),
            Duration::from_secs(1),
            Some(3),
        );

        assert!(strategy.next_delay(0).is_some());
        assert!(strategy.next_delay(2).is_some());
        assert_eq!(strategy.next_delay(3), None);
        assert_eq!(strategy.next_delay(4), None);
    }

    #[test]
    fn fixed_delay_is_constant_until_exhausted() {
        let strategy = FixedDelay::new(Duration::from_millis(250), Some(2));

        assert_eq!(strategy.next_delay(0), Some(Duration::from_millis(250)));
        assert_eq!(strategy.next_delay(1), Some(Duration::from_millis(250)));
        assert_eq!(strategy.next_delay(2), None);
    }

    #[test]
    fn never_reconnect_gives_up_immediately() {
        assert_eq!(NeverReconnect.next_delay(0), None);
    }
}
