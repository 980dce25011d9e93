//! Spinner shown on stderr while the waiter polls.

use declarative::{WaitCallback, WaitState};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Draws one spinner per wait; hidden when quiet.
pub struct WaitSpinner {
    quiet: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl WaitSpinner {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = slot.get_or_insert_with(|| spinner(self.quiet));
        f(bar);
    }
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

impl WaitCallback for WaitSpinner {
    fn on_poll(&self, predicate: &str, attempt: u32, _elapsed: Duration) {
        self.with_bar(|bar| bar.set_message(format!("Waiting for {predicate} (poll {attempt})")));
    }

    fn on_transient_error(&self, attempt: u32, error: &dyn fmt::Display) {
        self.with_bar(|bar| bar.set_message(format!("Retrying after poll {attempt}: {error}")));
    }

    fn on_finish(&self, state: WaitState, elapsed: Duration) {
        let finished = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(bar) = finished {
            bar.finish_and_clear();
        }
        log::debug!("Wait {state} after {}s", elapsed.as_secs());
    }
}
