//! Fault recovery policy.
//!
//! One counter, one ladder: every playback fault (error events, stalls and
//! rejected play requests alike) goes through [`RecoveryPolicy::on_fault`],
//! and the controller keeps at most one pending [`RecoverySchedule`].

use std::time::Duration;

use crate::config::PlayerConfig;

/// Outcome of evaluating a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reload the source after the delay
    Retry(Duration),
    /// Stop retrying and surface the error
    GiveUp,
}

/// Bounded linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RecoveryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.max_retries, config.retry_base_delay())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide what to do about the `fault_count`-th consecutive fault
    ///
    /// `fault_count` includes the fault being evaluated, so the first fault
    /// of a session is evaluated with a count of 1.
    pub fn on_fault(&self, fault_count: u32) -> RetryDecision {
        if fault_count <= self.max_retries {
            RetryDecision::Retry(self.delay(fault_count))
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Delay before retry number `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default())
    }
}

/// What a pending timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Reload the source once the backoff delay elapses
    Retry,
    /// Raise a stall fault if buffering has not resolved
    StallCheck,
}

/// Identifies one scheduled timer
///
/// A token is only honoured while its generation is current and it is still
/// the pending timer of its kind. Anything else is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub generation: u64,
    pub sequence: u64,
    pub kind: TimerKind,
}

/// A timer the host must run and report back through the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub token: TimerToken,
    pub delay: Duration,
}

/// The single pending retry of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverySchedule {
    pub attempt: u32,
    pub delay: Duration,
    pub token: TimerToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_up_to_ceiling_then_gives_up() {
        let policy = RecoveryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.on_fault(1), RetryDecision::Retry(Duration::from_secs(1)));
        assert_eq!(policy.on_fault(2), RetryDecision::Retry(Duration::from_secs(2)));
        assert_eq!(policy.on_fault(3), RetryDecision::Retry(Duration::from_secs(3)));
        assert_eq!(policy.on_fault(4), RetryDecision::GiveUp);
    }

    #[test]
    fn test_delay_is_monotonic() {
        let policy = RecoveryPolicy::new(10, Duration::from_millis(250));
        for attempt in 1..10 {
            assert!(policy.delay(attempt) <= policy.delay(attempt + 1));
        }
    }

    #[test]
    fn test_zero_ceiling_never_retries() {
        let policy = RecoveryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.on_fault(1), RetryDecision::GiveUp);
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RecoveryPolicy::new(u32::MAX, Duration::MAX);
        assert_eq!(policy.delay(2), Duration::MAX);
    }
}
