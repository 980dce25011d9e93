//! Option-settings reconciliation
//!
//! Option settings are namespaced key/value pairs attached to environments and
//! configuration templates. Diffing them is additive: a desired setting is
//! either new, changed, or already satisfied by the observed set. Settings that
//! are only present in the observed set are never reported.
//!
//! Whether an observed value satisfies a desired one is decided per
//! `(Namespace, OptionName)` by an [`EquivalenceTable`]. Most options need an
//! exact match; list-valued options such as security groups and subnets are
//! satisfied when every desired token is already configured.

use crate::types::{Change, NEW_VALUE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// A namespaced configuration option
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSetting {
    /// Option namespace (e.g. `aws:autoscaling:launchconfiguration`)
    pub namespace: String,
    /// Option name within the namespace
    pub option_name: String,
    /// Option value
    pub value: String,
}

impl OptionSetting {
    /// Create a new option setting
    pub fn new(
        namespace: impl Into<String>,
        option_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            option_name: option_name.into(),
            value: value.into(),
        }
    }

    /// The `Namespace:OptionName` key used in change reports
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace, self.option_name)
    }

    /// Whether this setting addresses the same option as `other`
    pub fn same_option(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.option_name == other.option_name
    }
}

impl fmt::Display for OptionSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key(), self.value)
    }
}

/// Return the first setting whose `(Namespace, OptionName)` was already seen
pub fn find_duplicate(settings: &[OptionSetting]) -> Option<&OptionSetting> {
    let mut seen = HashSet::new();
    settings
        .iter()
        .find(|s| !seen.insert((s.namespace.as_str(), s.option_name.as_str())))
}

/// How an observed value is compared against a desired value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equivalence {
    /// Values must be byte-for-byte equal
    #[default]
    Exact,
    /// Desired comma-separated tokens must all appear in the observed value
    Subset,
}

impl Equivalence {
    /// Whether `observed` already satisfies `desired`
    pub fn is_satisfied(self, desired: &str, observed: &str) -> bool {
        if desired == observed {
            return true;
        }
        match self {
            Self::Exact => false,
            Self::Subset => tokens(desired).is_subset(&tokens(observed)),
        }
    }
}

fn tokens(value: &str) -> BTreeSet<&str> {
    value.split(',').map(str::trim).collect()
}

const SUBSET_NAMESPACES: [&str; 2] = ["aws:autoscaling:launchconfiguration", "aws:ec2:vpc"];
const SUBSET_OPTIONS: [&str; 3] = ["SecurityGroups", "ELBSubnets", "Subnets"];

/// Maps `(Namespace, OptionName)` to an [`Equivalence`] strategy
///
/// Options without a rule compare exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceTable {
    rules: BTreeMap<(String, String), Equivalence>,
}

impl EquivalenceTable {
    /// A table with no rules; every option compares exactly
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// The platform's built-in rules for list-valued network options
    pub fn platform_defaults() -> Self {
        let mut table = Self::empty();
        for namespace in SUBSET_NAMESPACES {
            for option in SUBSET_OPTIONS {
                table.insert(namespace, option, Equivalence::Subset);
            }
        }
        table
    }

    /// Add or replace a rule
    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        option_name: impl Into<String>,
        strategy: Equivalence,
    ) {
        self.rules
            .insert((namespace.into(), option_name.into()), strategy);
    }

    /// Builder form of [`EquivalenceTable::insert`]
    pub fn with_rule(
        mut self,
        namespace: impl Into<String>,
        option_name: impl Into<String>,
        strategy: Equivalence,
    ) -> Self {
        self.insert(namespace, option_name, strategy);
        self
    }

    /// Strategy for an option
    pub fn strategy(&self, namespace: &str, option_name: &str) -> Equivalence {
        self.rules
            .get(&(namespace.to_string(), option_name.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Number of explicit rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no explicit rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for EquivalenceTable {
    fn default() -> Self {
        Self::platform_defaults()
    }
}

/// Diff desired option settings against the observed ones
///
/// Changes come out in `desired` order. A repeated `(Namespace, OptionName)`
/// in `desired` is only considered once (first occurrence wins).
pub fn diff_settings(
    desired: &[OptionSetting],
    observed: &[OptionSetting],
    table: &EquivalenceTable,
) -> Vec<Change> {
    let mut seen = HashSet::new();
    let mut changes = Vec::new();

    for setting in desired {
        if !seen.insert((setting.namespace.as_str(), setting.option_name.as_str())) {
            log::warn!("Ignoring repeated option setting {}", setting.key());
            continue;
        }

        match observed.iter().find(|o| o.same_option(setting)) {
            Some(current) => {
                let strategy = table.strategy(&setting.namespace, &setting.option_name);
                if !strategy.is_satisfied(&setting.value, &current.value) {
                    changes.push(Change::new(
                        setting.key(),
                        current.value.clone(),
                        setting.value.clone(),
                    ));
                }
            }
            None => changes.push(Change::new(setting.key(), NEW_VALUE, setting.value.clone())),
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sg(value: &str) -> OptionSetting {
        OptionSetting::new("aws:autoscaling:launchconfiguration", "SecurityGroups", value)
    }

    #[test]
    fn test_subset_security_groups_unchanged() {
        let changes = diff_settings(
            &[sg("sg-1")],
            &[sg("sg-1,sg-2")],
            &EquivalenceTable::default(),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_subset_not_satisfied_reports_change() {
        let changes = diff_settings(
            &[sg("sg-1,sg-3")],
            &[sg("sg-1,sg-2")],
            &EquivalenceTable::default(),
        );
        assert_eq!(changes, vec![Change::new(sg("").key(), "sg-1,sg-2", "sg-1,sg-3")]);
    }

    #[test]
    fn test_subset_compares_against_observed_not_itself() {
        // The desired set must be checked against what is configured.
        let desired = OptionSetting::new("aws:ec2:vpc", "Subnets", "subnet-9");
        let observed = OptionSetting::new("aws:ec2:vpc", "Subnets", "subnet-1,subnet-2");
        let changes = diff_settings(&[desired], &[observed], &EquivalenceTable::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, "subnet-1,subnet-2");
    }

    #[test]
    fn test_subset_tokens_are_trimmed() {
        let desired = OptionSetting::new("aws:ec2:vpc", "ELBSubnets", "subnet-2, subnet-1");
        let observed = OptionSetting::new("aws:ec2:vpc", "ELBSubnets", "subnet-1,subnet-2");
        assert!(diff_settings(&[desired], &[observed], &EquivalenceTable::default()).is_empty());
    }

    #[test]
    fn test_new_setting_uses_sentinel() {
        let desired = OptionSetting::new("aws:elasticbeanstalk:application:environment", "PARAM1", "bar");
        let changes = diff_settings(&[desired], &[], &EquivalenceTable::default());
        assert_eq!(
            changes,
            vec![Change::new(
                "aws:elasticbeanstalk:application:environment:PARAM1",
                NEW_VALUE,
                "bar"
            )]
        );
    }

    #[test]
    fn test_plain_option_requires_exact_match() {
        let desired = OptionSetting::new("aws:autoscaling:asg", "MaxSize", "4");
        let observed = OptionSetting::new("aws:autoscaling:asg", "MaxSize", "2");
        let changes = diff_settings(&[desired], &[observed], &EquivalenceTable::default());
        assert_eq!(changes, vec![Change::new("aws:autoscaling:asg:MaxSize", "2", "4")]);
    }

    #[test]
    fn test_plain_option_is_not_subset_matched() {
        // Same shape of value, but the option is not in the subset table.
        let desired = OptionSetting::new("aws:autoscaling:asg", "Availability Zones", "a");
        let observed = OptionSetting::new("aws:autoscaling:asg", "Availability Zones", "a,b");
        assert_eq!(
            diff_settings(&[desired], &[observed], &EquivalenceTable::default()).len(),
            1
        );
    }

    #[test]
    fn test_observed_only_settings_are_ignored() {
        let observed = OptionSetting::new("aws:autoscaling:asg", "MinSize", "1");
        assert!(diff_settings(&[], &[observed], &EquivalenceTable::default()).is_empty());
    }

    #[test]
    fn test_changes_follow_desired_order() {
        let desired = vec![
            OptionSetting::new("ns", "b", "2"),
            OptionSetting::new("ns", "a", "1"),
        ];
        let keys: Vec<_> = diff_settings(&desired, &[], &EquivalenceTable::empty())
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(keys, vec!["ns:b", "ns:a"]);
    }

    #[test]
    fn test_repeated_desired_key_reported_once() {
        let desired = vec![
            OptionSetting::new("ns", "a", "1"),
            OptionSetting::new("ns", "a", "2"),
        ];
        let changes = diff_settings(&desired, &[], &EquivalenceTable::empty());
        assert_eq!(changes, vec![Change::new("ns:a", NEW_VALUE, "1")]);
        assert_eq!(find_duplicate(&desired).map(|s| s.value.as_str()), Some("2"));
    }

    #[test]
    fn test_custom_rule_extends_table() {
        let table = EquivalenceTable::empty().with_rule("custom:ns", "Hosts", Equivalence::Subset);
        assert_eq!(table.strategy("custom:ns", "Hosts"), Equivalence::Subset);
        assert_eq!(table.strategy("custom:ns", "Other"), Equivalence::Exact);

        let desired = OptionSetting::new("custom:ns", "Hosts", "a");
        let observed = OptionSetting::new("custom:ns", "Hosts", "a,b");
        assert!(diff_settings(&[desired], &[observed], &table).is_empty());
    }

    #[test]
    fn test_platform_defaults_cover_network_options() {
        let table = EquivalenceTable::platform_defaults();
        assert_eq!(table.len(), 6);
        assert_eq!(table.strategy("aws:ec2:vpc", "SecurityGroups"), Equivalence::Subset);
        assert_eq!(
            table.strategy("aws:autoscaling:launchconfiguration", "ELBSubnets"),
            Equivalence::Subset
        );
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let desired = vec![sg("sg-1")];
        let observed = vec![sg("sg-2")];
        let before = (desired.clone(), observed.clone());
        let _ = diff_settings(&desired, &observed, &EquivalenceTable::default());
        assert_eq!((desired, observed), before);
    }
}
