//! # Declarative
//!
//! Core of a declarative reconciler for remotely hosted resources.
//!
//! A caller declares the desired attributes of a resource and a target state
//! (present or absent). This crate decides what has to happen to converge,
//! waits for asynchronous mutations to become observable, and selects stale
//! artifacts for cleanup. It performs no I/O of its own: fetching and
//! mutating live resources belongs to the orchestration layer.
//!
//! ## Core Concepts
//!
//! - **Decision**: create / update / delete / noop plus the detected changes
//! - **Differ**: compares a [`DesiredSpec`] with an [`ObservedResource`]
//! - **EquivalenceTable**: per-option rules for when an observed option
//!   setting already satisfies a desired one
//! - **Waiter**: polls until a [`Predicate`] holds, with a time budget
//! - **Retention**: age and count based selection of stale versions
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{decide, Action, TargetState};
//!
//! let decision = decide(&desired, observed.as_ref(), TargetState::Present);
//! match decision.action {
//!     Action::Create => client.create(&desired)?,
//!     Action::Update => client.update(&desired)?,
//!     Action::Delete | Action::Noop => {}
//! }
//! ```
//!
//! ## Injected Time
//!
//! The waiter reads time through the [`Clock`] trait and retention takes
//! `now` as an argument, so both are deterministic under test.

pub mod diff;
pub mod resource;
pub mod retention;
pub mod settings;
pub mod types;
pub mod wait;

// Re-export main types at crate root
pub use diff::{Differ, decide};
pub use resource::{DesiredSpec, Field, ObservedResource};
pub use retention::{
    DeployedSet, RetentionPolicy, VersionRecord, select_by_age, select_by_count,
    select_for_cleanup,
};
pub use settings::{Equivalence, EquivalenceTable, OptionSetting, diff_settings, find_duplicate};
pub use types::{Action, Change, Decision, NEW_VALUE, TargetState};
pub use wait::{
    Clock, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, ManualClock, NoCallback, Predicate,
    SystemClock, WaitCallback, WaitError, WaitPolicy, WaitState, wait_for, wait_for_simple,
};
