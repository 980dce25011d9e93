//! Per-invocation settings shared by every reconcile flow.

use declarative::{
    Clock, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, Differ, EquivalenceTable, SystemClock,
    WaitCallback,
};
use std::time::Duration;

/// How long and how often to poll after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Overall budget per wait
    pub timeout: Duration,
    /// Delay between polls
    pub interval: Duration,
}

impl WaitConfig {
    /// Create a wait config.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Replace the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_MAX_WAIT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Context passed to every reconcile flow.
pub struct ApplyContext<'a> {
    /// Report what would happen without issuing writes
    pub check_mode: bool,
    /// Waiter settings
    pub wait: WaitConfig,
    /// Differ (and its equivalence table)
    pub differ: Differ,
    /// Time source for the waiter
    pub clock: &'a dyn Clock,
    /// Optional waiter progress callback
    pub callback: Option<&'a dyn WaitCallback>,
}

impl<'a> ApplyContext<'a> {
    /// Context with defaults: writes enabled, wall clock, platform table.
    pub fn new() -> Self {
        Self {
            check_mode: false,
            wait: WaitConfig::default(),
            differ: Differ::default(),
            clock: &SystemClock,
            callback: None,
        }
    }

    /// Enable or disable check mode.
    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Replace the wait settings.
    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Replace the equivalence table.
    pub fn with_table(mut self, table: EquivalenceTable) -> Self {
        self.differ = Differ::new(table);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a progress callback.
    pub fn with_callback(mut self, callback: &'a dyn WaitCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl Default for ApplyContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Equivalence, ManualClock};

    #[test]
    fn test_defaults() {
        let ctx = ApplyContext::new();
        assert!(!ctx.check_mode);
        assert_eq!(ctx.wait.timeout, Duration::from_secs(900));
        assert_eq!(ctx.wait.interval, Duration::from_secs(15));
        assert_eq!(
            ctx.differ.table().strategy("aws:ec2:vpc", "Subnets"),
            Equivalence::Subset
        );
    }

    #[test]
    fn test_builders() {
        let clock = ManualClock::new();
        let ctx = ApplyContext::new()
            .with_check_mode(true)
            .with_wait(WaitConfig::default().with_timeout(Duration::from_secs(30)))
            .with_table(EquivalenceTable::empty())
            .with_clock(&clock);
        assert!(ctx.check_mode);
        assert_eq!(ctx.wait.timeout, Duration::from_secs(30));
        assert!(ctx.differ.table().is_empty());
    }
}
