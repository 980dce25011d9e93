//! Completion waiter: poll a resource until it satisfies a predicate.
//!
//! Mutations on the remote platform are asynchronous, so after issuing one the
//! orchestration layer blocks here until the change is observable. The poll
//! loop is a small state machine:
//!
//! ```text
//! Polling --predicate holds--> Satisfied
//! Polling --fatal fetch error--> Failed
//! Polling --elapsed >= max_wait--> TimedOut
//! Polling --otherwise: sleep(interval)--> Polling
//! ```
//!
//! Transient fetch errors (rate limiting) are swallowed but still count
//! against the time budget. Time is read through a [`Clock`] so tests can run
//! the loop without sleeping.

use std::cell::Cell;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Default overall time budget.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(900);

/// Source of time for the poll loop.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Clock that only moves when slept on or advanced explicitly.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
    sleeps: Cell<u32>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }

    /// Move time forward without counting a sleep.
    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of times [`Clock::sleep`] was called.
    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

/// States of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Still polling.
    Polling,
    /// Predicate held; terminal.
    Satisfied,
    /// Budget exhausted; terminal.
    TimedOut,
    /// Non-transient fetch error; terminal.
    Failed,
}

impl WaitState {
    /// Whether the loop has stopped.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Polling)
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Polling => "polling",
            Self::Satisfied => "satisfied",
            Self::TimedOut => "timed out",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A named test over an observed value.
pub struct Predicate<T> {
    name: String,
    test: Box<dyn Fn(&T) -> bool>,
}

impl<T: 'static> Predicate<T> {
    /// Create a predicate with a human-readable name.
    pub fn new(name: impl Into<String>, test: impl Fn(&T) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            test: Box::new(test),
        }
    }

    /// Both predicates must hold.
    pub fn and(self, other: Self) -> Self {
        let name = format!("{} and {}", self.name, other.name);
        let (left, right) = (self.test, other.test);
        Self {
            name,
            test: Box::new(move |value: &T| left(value) && right(value)),
        }
    }
}

impl<T> Predicate<T> {
    /// Evaluate the predicate.
    pub fn matches(&self, value: &T) -> bool {
        (self.test)(value)
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

/// Everything the poll loop needs to know, reusable across resource kinds.
pub struct WaitPolicy<T, E> {
    /// Delay between polls.
    pub interval: Duration,
    /// Overall time budget, measured from the first poll.
    pub max_wait: Duration,
    /// Condition that ends the wait successfully.
    pub predicate: Predicate<T>,
    /// Returns `true` for fetch errors that should be ignored.
    pub is_transient: fn(&E) -> bool,
}

impl<T, E> WaitPolicy<T, E> {
    /// Policy with the default 15s interval.
    pub fn new(max_wait: Duration, predicate: Predicate<T>, is_transient: fn(&E) -> bool) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait,
            predicate,
            is_transient,
        }
    }

    /// Override the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl<T, E> fmt::Debug for WaitPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitPolicy")
            .field("interval", &self.interval)
            .field("max_wait", &self.max_wait)
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

/// Why a wait did not succeed.
#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The predicate never held within the budget.
    #[error("timed out after {}s waiting for {predicate} ({polls} polls)", .elapsed.as_secs())]
    TimedOut {
        /// Name of the predicate that was not satisfied
        predicate: String,
        /// Time spent polling
        elapsed: Duration,
        /// Number of fetches performed
        polls: u32,
    },

    /// A fetch failed with a non-transient error.
    #[error(transparent)]
    Failed(E),
}

impl<E> WaitError<E> {
    /// Terminal state this error corresponds to.
    pub fn state(&self) -> WaitState {
        match self {
            Self::TimedOut { .. } => WaitState::TimedOut,
            Self::Failed(_) => WaitState::Failed,
        }
    }
}

/// Receives poll loop notifications.
pub trait WaitCallback {
    /// Called after every fetch that did not end the wait.
    fn on_poll(&self, predicate: &str, attempt: u32, elapsed: Duration);

    /// Called when a transient error was swallowed.
    fn on_transient_error(&self, _attempt: u32, _error: &dyn fmt::Display) {}

    /// Called once when the loop reaches a terminal state.
    fn on_finish(&self, _state: WaitState, _elapsed: Duration) {}
}

/// Callback that does nothing.
pub struct NoCallback;

impl WaitCallback for NoCallback {
    fn on_poll(&self, _predicate: &str, _attempt: u32, _elapsed: Duration) {}
}

/// Poll `fetch` until the policy's predicate holds.
///
/// Returns the first observed value that satisfies the predicate. There is
/// no rollback: on timeout, whatever mutation preceded the wait stays issued.
pub fn wait_for<T, E, F, C>(
    policy: &WaitPolicy<T, E>,
    clock: &C,
    callback: Option<&dyn WaitCallback>,
    mut fetch: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
    C: Clock + ?Sized,
{
    let started = clock.now();
    let predicate = policy.predicate.name();
    let mut attempt: u32 = 0;

    let finish = |state: WaitState, elapsed: Duration| {
        if let Some(cb) = callback {
            cb.on_finish(state, elapsed);
        }
    };

    loop {
        attempt += 1;

        match fetch() {
            Ok(observed) if policy.predicate.matches(&observed) => {
                let elapsed = clock.now().saturating_duration_since(started);
                log::info!("Condition '{predicate}' satisfied after {attempt} poll(s)");
                finish(WaitState::Satisfied, elapsed);
                return Ok(observed);
            }
            Ok(_) => {
                log::debug!("Poll {attempt}: waiting for '{predicate}'");
            }
            Err(e) if (policy.is_transient)(&e) => {
                log::warn!("Poll {attempt}: ignoring transient error: {e}");
                if let Some(cb) = callback {
                    cb.on_transient_error(attempt, &e);
                }
            }
            Err(e) => {
                let elapsed = clock.now().saturating_duration_since(started);
                log::debug!("Poll {attempt}: fetch failed: {e}");
                finish(WaitState::Failed, elapsed);
                return Err(WaitError::Failed(e));
            }
        }

        let elapsed = clock.now().saturating_duration_since(started);
        if elapsed >= policy.max_wait {
            log::info!("Gave up waiting for '{predicate}' after {}s", elapsed.as_secs());
            finish(WaitState::TimedOut, elapsed);
            return Err(WaitError::TimedOut {
                predicate: predicate.to_string(),
                elapsed,
                polls: attempt,
            });
        }

        if let Some(cb) = callback {
            cb.on_poll(predicate, attempt, elapsed);
        }

        clock.sleep(policy.interval);
    }
}

/// Poll with the wall clock and no callback.
pub fn wait_for_simple<T, E, F>(policy: &WaitPolicy<T, E>, fetch: F) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
{
    wait_for(policy, &SystemClock, None, fetch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    enum FetchError {
        Throttled,
        Denied,
    }

    impl fmt::Display for FetchError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Throttled => write!(f, "Throttling: rate exceeded"),
                Self::Denied => write!(f, "AccessDenied"),
            }
        }
    }

    fn is_throttled(e: &FetchError) -> bool {
        *e == FetchError::Throttled
    }

    fn policy(max_wait_secs: u64, predicate: Predicate<u32>) -> WaitPolicy<u32, FetchError> {
        WaitPolicy::new(Duration::from_secs(max_wait_secs), predicate, is_throttled)
    }

    #[test]
    fn test_satisfied_on_first_poll() {
        let clock = ManualClock::new();
        let policy = policy(30, Predicate::new("ready", |v: &u32| *v == 1));
        let result = wait_for(&policy, &clock, None, || Ok::<_, FetchError>(1));
        assert_eq!(result.unwrap(), 1);
        assert_eq!(clock.sleeps(), 0);
    }

    #[test]
    fn test_satisfied_after_transitions() {
        let clock = ManualClock::new();
        let polls = Cell::new(0u32);
        let policy = policy(900, Predicate::new("value is 3", |v: &u32| *v == 3));

        let result = wait_for(&policy, &clock, None, || {
            polls.set(polls.get() + 1);
            Ok::<_, FetchError>(polls.get())
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(clock.sleeps(), 2);
        assert_eq!(clock.elapsed(), Duration::from_secs(30));
    }

    #[test]
    fn test_timeout_after_at_most_three_polls() {
        let clock = ManualClock::new();
        let polls = Cell::new(0u32);
        let policy = policy(30, Predicate::new("never", |_: &u32| false));

        let result = wait_for(&policy, &clock, None, || {
            polls.set(polls.get() + 1);
            Ok::<_, FetchError>(0)
        });

        match result {
            Err(WaitError::TimedOut { polls: n, elapsed, .. }) => {
                assert_eq!(n, 3);
                assert_eq!(elapsed, Duration::from_secs(30));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(polls.get(), 3);
    }

    #[test]
    fn test_zero_budget_polls_once() {
        let clock = ManualClock::new();
        let policy = policy(0, Predicate::new("never", |_: &u32| false));
        let result = wait_for(&policy, &clock, None, || Ok::<_, FetchError>(0));
        assert!(matches!(result, Err(WaitError::TimedOut { polls: 1, .. })));
    }

    #[test]
    fn test_transient_errors_are_ignored_but_consume_budget() {
        let clock = ManualClock::new();
        let polls = Cell::new(0u32);
        let policy = policy(30, Predicate::new("any", |_: &u32| true));

        let result = wait_for(&policy, &clock, None, || {
            polls.set(polls.get() + 1);
            Err::<u32, _>(FetchError::Throttled)
        });

        let err = result.unwrap_err();
        assert_eq!(err.state(), WaitState::TimedOut);
        assert_eq!(polls.get(), 3);
    }

    #[test]
    fn test_transient_error_then_success() {
        let clock = ManualClock::new();
        let polls = Cell::new(0u32);
        let policy = policy(900, Predicate::new("any", |_: &u32| true));

        let result = wait_for(&policy, &clock, None, || {
            polls.set(polls.get() + 1);
            if polls.get() < 3 {
                Err(FetchError::Throttled)
            } else {
                Ok(7)
            }
        });

        assert_eq!(result.unwrap(), 7);
        assert_eq!(clock.elapsed(), Duration::from_secs(30));
    }

    #[test]
    fn test_fatal_error_propagates_immediately() {
        let clock = ManualClock::new();
        let polls = Cell::new(0u32);
        let policy = policy(900, Predicate::new("any", |_: &u32| true));

        let result = wait_for(&policy, &clock, None, || {
            polls.set(polls.get() + 1);
            Err::<u32, _>(FetchError::Denied)
        });

        match result {
            Err(WaitError::Failed(e)) => assert_eq!(e, FetchError::Denied),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(polls.get(), 1);
        assert_eq!(clock.sleeps(), 0);
    }

    #[test]
    fn test_predicate_and_combines_names_and_tests() {
        let p = Predicate::new("even", |v: &u32| v % 2 == 0).and(Predicate::new("big", |v: &u32| *v > 10));
        assert_eq!(p.name(), "even and big");
        assert!(p.matches(&12));
        assert!(!p.matches(&8));
        assert!(!p.matches(&13));
    }

    #[test]
    fn test_callback_receives_polls_and_finish() {
        struct Recorder(RefCell<Vec<String>>);
        impl WaitCallback for Recorder {
            fn on_poll(&self, predicate: &str, attempt: u32, _elapsed: Duration) {
                self.0.borrow_mut().push(format!("poll {attempt} {predicate}"));
            }
            fn on_transient_error(&self, attempt: u32, _error: &dyn fmt::Display) {
                self.0.borrow_mut().push(format!("transient {attempt}"));
            }
            fn on_finish(&self, state: WaitState, _elapsed: Duration) {
                self.0.borrow_mut().push(format!("finish {state}"));
            }
        }

        let clock = ManualClock::new();
        let recorder = Recorder(RefCell::new(Vec::new()));
        let polls = Cell::new(0u32);
        let policy = policy(900, Predicate::new("two", |v: &u32| *v == 2));

        let _ = wait_for(&policy, &clock, Some(&recorder), || {
            polls.set(polls.get() + 1);
            match polls.get() {
                1 => Err(FetchError::Throttled),
                n => Ok(n),
            }
        });

        assert_eq!(
            recorder.0.into_inner(),
            vec!["transient 1", "poll 1 two", "finish satisfied"]
        );
    }

    #[test]
    fn test_custom_interval() {
        let clock = ManualClock::new();
        let policy = policy(10, Predicate::new("never", |_: &u32| false))
            .with_interval(Duration::from_secs(5));
        let result = wait_for(&policy, &clock, None, || Ok::<_, FetchError>(0));
        assert!(matches!(result, Err(WaitError::TimedOut { polls: 3, .. })));
    }
}
