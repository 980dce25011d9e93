//! Retention selection for versioned artifacts
//!
//! Picks stale versions for deletion under an age limit, a count limit, or
//! both. Anything referenced by a live deployment is never selected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Labels currently referenced by a live deployment
pub type DeployedSet = BTreeSet<String>;

/// A versioned artifact as seen by the retention selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Version label, unique within an application
    pub label: String,
    /// When the version was created
    pub date_created: DateTime<Utc>,
    /// When the version was last updated
    pub date_updated: DateTime<Utc>,
    /// Where the backing artifact lives, if known
    pub source_location: Option<String>,
}

/// Age and/or count limits; at least one is always set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep versions updated within the last N days
    Age { days_to_store: u32 },
    /// Keep the newest N versions
    Count { files_to_store: u32 },
    /// Apply both limits, using whichever selects fewer versions
    Both { days_to_store: u32, files_to_store: u32 },
}

impl RetentionPolicy {
    /// Build a policy from optional limits
    ///
    /// Returns `None` when neither limit is set; cleanup is then a no-op.
    pub fn new(days_to_store: Option<u32>, files_to_store: Option<u32>) -> Option<Self> {
        match (days_to_store, files_to_store) {
            (Some(days_to_store), Some(files_to_store)) => Some(Self::Both {
                days_to_store,
                files_to_store,
            }),
            (Some(days_to_store), None) => Some(Self::Age { days_to_store }),
            (None, Some(files_to_store)) => Some(Self::Count { files_to_store }),
            (None, None) => None,
        }
    }

    /// Age limit in days, if any
    pub fn days_to_store(&self) -> Option<u32> {
        match self {
            Self::Age { days_to_store } | Self::Both { days_to_store, .. } => Some(*days_to_store),
            Self::Count { .. } => None,
        }
    }

    /// Count limit, if any
    pub fn files_to_store(&self) -> Option<u32> {
        match self {
            Self::Count { files_to_store } | Self::Both { files_to_store, .. } => {
                Some(*files_to_store)
            }
            Self::Age { .. } => None,
        }
    }
}

/// Versions not referenced by a deployment, newest update first
fn candidates<'a>(versions: &'a [VersionRecord], deployed: &DeployedSet) -> Vec<&'a VersionRecord> {
    let mut remaining: Vec<&VersionRecord> = versions
        .iter()
        .filter(|v| !deployed.contains(&v.label))
        .collect();
    remaining.sort_by(|a, b| b.date_updated.cmp(&a.date_updated));
    remaining
}

/// Undeployed versions last updated more than `days_to_store` days before `now`
pub fn select_by_age<'a>(
    versions: &'a [VersionRecord],
    deployed: &DeployedSet,
    days_to_store: u32,
    now: DateTime<Utc>,
) -> Vec<&'a VersionRecord> {
    let cutoff = now - Duration::days(i64::from(days_to_store));
    candidates(versions, deployed)
        .into_iter()
        .filter(|v| v.date_updated < cutoff)
        .collect()
}

/// Undeployed versions beyond the newest `files_to_store`
pub fn select_by_count<'a>(
    versions: &'a [VersionRecord],
    deployed: &DeployedSet,
    files_to_store: u32,
) -> Vec<&'a VersionRecord> {
    let keep = usize::try_from(files_to_store).unwrap_or(usize::MAX);
    candidates(versions, deployed)
        .into_iter()
        .skip(keep)
        .collect()
}

/// Select versions to delete under `policy`
///
/// With both limits set, each is evaluated on its own and the smaller
/// selection wins (the count-based one on a tie). Returns `None` when nothing
/// is eligible.
pub fn select_for_cleanup(
    versions: &[VersionRecord],
    deployed: &DeployedSet,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Option<Vec<VersionRecord>> {
    let selected = match policy {
        RetentionPolicy::Age { days_to_store } => {
            select_by_age(versions, deployed, days_to_store, now)
        }
        RetentionPolicy::Count { files_to_store } => {
            select_by_count(versions, deployed, files_to_store)
        }
        RetentionPolicy::Both {
            days_to_store,
            files_to_store,
        } => {
            let by_age = select_by_age(versions, deployed, days_to_store, now);
            let by_count = select_by_count(versions, deployed, files_to_store);
            log::debug!(
                "Retention candidates: {} by age, {} by count",
                by_age.len(),
                by_count.len()
            );
            if by_age.len() < by_count.len() {
                by_age
            } else {
                by_count
            }
        }
    };

    if selected.is_empty() {
        None
    } else {
        Some(selected.into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn version(label: &str, days_old: i64) -> VersionRecord {
        let at = now() - Duration::days(days_old);
        VersionRecord {
            label: label.to_string(),
            date_created: at,
            date_updated: at,
            source_location: Some(format!("s3://artifacts/{label}.zip")),
        }
    }

    fn labels(selected: &[VersionRecord]) -> Vec<&str> {
        selected.iter().map(|v| v.label.as_str()).collect()
    }

    fn deployed(labels: &[&str]) -> DeployedSet {
        labels.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_policy_requires_a_limit() {
        assert_eq!(RetentionPolicy::new(None, None), None);
        assert_eq!(
            RetentionPolicy::new(Some(7), None),
            Some(RetentionPolicy::Age { days_to_store: 7 })
        );
        let both = RetentionPolicy::new(Some(7), Some(3)).unwrap();
        assert_eq!(both.days_to_store(), Some(7));
        assert_eq!(both.files_to_store(), Some(3));
    }

    #[test]
    fn test_count_keeps_newest_and_selects_rest() {
        let versions = vec![
            version("v5", 1),
            version("v4", 2),
            version("v3", 3),
            version("v2", 4),
            version("v1", 5),
        ];
        let policy = RetentionPolicy::new(None, Some(3)).unwrap();
        let selected = select_for_cleanup(&versions, &DeployedSet::new(), policy, now()).unwrap();
        assert_eq!(labels(&selected), vec!["v2", "v1"]);
    }

    #[test]
    fn test_count_sorts_by_date_updated() {
        let mut old_but_touched = version("v1", 30);
        old_but_touched.date_updated = now();
        let versions = vec![version("v3", 3), old_but_touched, version("v2", 10)];

        let selected = select_by_count(&versions, &DeployedSet::new(), 1);
        let selected: Vec<_> = selected.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(selected, vec!["v3", "v2"]);
    }

    #[test]
    fn test_count_never_selects_deployed() {
        let versions = vec![
            version("v5", 1),
            version("v4", 2),
            version("v3", 3),
            version("v2", 4),
            version("v1", 5),
        ];
        let policy = RetentionPolicy::new(None, Some(3)).unwrap();
        let selected = select_for_cleanup(&versions, &deployed(&["v1"]), policy, now()).unwrap();
        assert!(!labels(&selected).contains(&"v1"));
        assert_eq!(labels(&selected), vec!["v2"]);
    }

    #[test]
    fn test_age_selects_strictly_older_than_cutoff() {
        let versions = vec![version("fresh", 1), version("edge", 10), version("stale", 11)];
        let policy = RetentionPolicy::new(Some(10), None).unwrap();
        let selected = select_for_cleanup(&versions, &DeployedSet::new(), policy, now()).unwrap();
        assert_eq!(labels(&selected), vec!["stale"]);
    }

    #[test]
    fn test_age_never_selects_deployed() {
        let versions = vec![version("a", 40), version("b", 50)];
        let policy = RetentionPolicy::new(Some(30), None).unwrap();
        let selected = select_for_cleanup(&versions, &deployed(&["a"]), policy, now()).unwrap();
        assert_eq!(labels(&selected), vec!["b"]);
    }

    #[test]
    fn test_both_returns_smaller_selection() {
        // by age: {A, B, C}; by count (keep 2 of D, A, B, C): {B, C}
        let versions = vec![
            version("D", 1),
            version("A", 40),
            version("B", 50),
            version("C", 60),
        ];
        let policy = RetentionPolicy::new(Some(30), Some(2)).unwrap();
        let selected = select_for_cleanup(&versions, &DeployedSet::new(), policy, now()).unwrap();
        assert_eq!(labels(&selected), vec!["B", "C"]);
    }

    #[test]
    fn test_both_prefers_age_when_stricter() {
        let versions = vec![
            version("v4", 1),
            version("v3", 2),
            version("v2", 3),
            version("v1", 40),
        ];
        let policy = RetentionPolicy::new(Some(30), Some(1)).unwrap();
        let selected = select_for_cleanup(&versions, &DeployedSet::new(), policy, now()).unwrap();
        assert_eq!(labels(&selected), vec!["v1"]);
    }

    #[test]
    fn test_both_with_one_empty_dimension_selects_nothing() {
        let versions = vec![version("v2", 1), version("v1", 2)];
        let policy = RetentionPolicy::new(Some(30), Some(1)).unwrap();
        assert_eq!(
            select_for_cleanup(&versions, &DeployedSet::new(), policy, now()),
            None
        );
    }

    #[test]
    fn test_nothing_eligible_is_none() {
        let versions = vec![version("v1", 1)];
        let policy = RetentionPolicy::new(None, Some(5)).unwrap();
        assert_eq!(
            select_for_cleanup(&versions, &DeployedSet::new(), policy, now()),
            None
        );
        assert_eq!(select_for_cleanup(&[], &DeployedSet::new(), policy, now()), None);
    }

    #[test]
    fn test_keep_zero_selects_all_undeployed() {
        let versions = vec![version("v2", 1), version("v1", 2)];
        let selected = select_by_count(&versions, &deployed(&["v2"]), 0);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].label, "v1");
    }

    fn arb_versions() -> impl Strategy<Value = Vec<VersionRecord>> {
        prop::collection::vec(0i64..120, 0..20).prop_map(|ages| {
            ages.into_iter()
                .enumerate()
                .map(|(i, age)| version(&format!("v{i}"), age))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_deployed_never_selected(
            versions in arb_versions(),
            days in prop::option::of(0u32..90),
            files in prop::option::of(0u32..10),
            deployed_mask in prop::collection::vec(any::<bool>(), 20),
        ) {
            let deployed: DeployedSet = versions
                .iter()
                .zip(&deployed_mask)
                .filter(|(_, d)| **d)
                .map(|(v, _)| v.label.clone())
                .collect();

            if let Some(policy) = RetentionPolicy::new(days, files)
                && let Some(selected) = select_for_cleanup(&versions, &deployed, policy, now())
            {
                prop_assert!(!selected.is_empty());
                for v in &selected {
                    prop_assert!(!deployed.contains(&v.label));
                }
            }
        }

        #[test]
        fn prop_both_never_exceeds_either_dimension(
            versions in arb_versions(),
            days in 0u32..90,
            files in 0u32..10,
        ) {
            let deployed = DeployedSet::new();
            let by_age = select_by_age(&versions, &deployed, days, now()).len();
            let by_count = select_by_count(&versions, &deployed, files).len();
            let policy = RetentionPolicy::new(Some(days), Some(files)).unwrap();
            let both = select_for_cleanup(&versions, &deployed, policy, now())
                .map_or(0, |s| s.len());
            prop_assert!(both <= by_age);
            prop_assert!(both <= by_count);
        }
    }
}
