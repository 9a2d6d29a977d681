//! Plan snapshots and diff algebra.
//!
//! A snapshot is a partial mapping from variable name to value. Absence means
//! "unknown/unchanged"; zero is an explicit value. The target plan is stored
//! as a sparse diff over current, so the plan a user actually sees is always
//! `current.overlay(target)`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Partial mapping of plan variable to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<f64>>",
    into = "BTreeMap<String, f64>"
)]
pub struct PlanSnapshot {
    values: BTreeMap<String, f64>,
}

/// A snapshot holding only the entries a caller intends to change.
pub type PlanDiff = PlanSnapshot;

impl PlanSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Set a value. Non-finite values are ignored.
    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.values.insert(key.into(), value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<f64> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns a new snapshot with `other` layered on top (other wins per key).
    pub fn overlay(&self, other: &PlanSnapshot) -> PlanSnapshot {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// Layer `other` onto this snapshot in place.
    pub fn merge_from(&mut self, other: &PlanSnapshot) {
        for (key, value) in other.iter() {
            self.values.insert(key.to_string(), value);
        }
    }

    /// Insert `value` only when `key` is absent. Returns whether it was inserted.
    pub fn backfill(&mut self, key: &str, value: f64) -> bool {
        if self.contains(key) || !value.is_finite() {
            return false;
        }
        self.values.insert(key.to_string(), value);
        true
    }

    /// Entries with a non-zero value.
    pub fn non_zero(&self) -> PlanSnapshot {
        self.iter().filter(|(_, v)| *v != 0.0).collect()
    }

    /// Entries worth sending to the backend as a deliberate change: every
    /// non-zero value, plus zeros whose key appears in `explicit`.
    pub fn sendable(&self, explicit: &BTreeSet<String>) -> PlanDiff {
        self.iter()
            .filter(|(k, v)| *v != 0.0 || explicit.contains(*k))
            .collect()
    }

    /// Keys of this snapshot that `other` lacks or holds a different value for.
    pub fn differing_keys(&self, other: &PlanSnapshot) -> Vec<String> {
        self.iter()
            .filter(|(k, v)| other.get(k) != Some(*v))
            .map(|(k, _)| k.to_string())
            .collect()
    }
}

/// The plan shown to the user: current with the target diff on top.
pub fn effective_plan(current: &PlanSnapshot, target: &PlanSnapshot) -> PlanSnapshot {
    current.overlay(target)
}

impl From<BTreeMap<String, Option<f64>>> for PlanSnapshot {
    fn from(raw: BTreeMap<String, Option<f64>>) -> Self {
        raw.into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }
}

impl From<PlanSnapshot> for BTreeMap<String, f64> {
    fn from(snapshot: PlanSnapshot) -> Self {
        snapshot.values
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PlanSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut snapshot = PlanSnapshot::new();
        for (key, value) in iter {
            snapshot.set(key, value);
        }
        snapshot
    }
}

impl<const N: usize> From<[(&str, f64); N]> for PlanSnapshot {
    fn from(entries: [(&str, f64); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_target_wins() {
        let current = PlanSnapshot::from([("cardio", 10.0), ("water", 1500.0)]);
        let target = PlanSnapshot::from([("cardio", 20.0)]);
        let effective = effective_plan(&current, &target);
        assert_eq!(effective.get("cardio"), Some(20.0));
        assert_eq!(effective.get("water"), Some(1500.0));
    }

    #[test]
    fn test_zero_is_distinct_from_absent() {
        let current = PlanSnapshot::from([("alcohol", 5.0)]);
        let target = PlanSnapshot::from([("alcohol", 0.0)]);
        assert_eq!(effective_plan(&current, &target).get("alcohol"), Some(0.0));
        assert_eq!(effective_plan(&current, &PlanSnapshot::new()).get("alcohol"), Some(5.0));
    }

    #[test]
    fn test_backfill_never_overwrites() {
        let mut plan = PlanSnapshot::from([("age", 40.0)]);
        assert!(!plan.backfill("age", 30.0));
        assert!(plan.backfill("gender", 0.0));
        assert_eq!(plan.get("age"), Some(40.0));
        assert_eq!(plan.get("gender"), Some(0.0));
    }

    #[test]
    fn test_sendable_keeps_explicit_zeros_only() {
        let plan = PlanSnapshot::from([("a", 0.0), ("b", 5.0), ("refined_sugar", 0.0)]);
        let explicit: BTreeSet<String> = ["refined_sugar".to_string()].into();
        let diff = plan.sendable(&explicit);
        assert!(!diff.contains("a"));
        assert_eq!(diff.get("b"), Some(5.0));
        assert_eq!(diff.get("refined_sugar"), Some(0.0));
    }

    #[test]
    fn test_non_finite_values_are_dropped() {
        let mut plan = PlanSnapshot::new();
        plan.set("cardio", f64::NAN);
        plan.set("water", f64::INFINITY);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_deserialize_skips_nulls() {
        let plan: PlanSnapshot =
            serde_json::from_str(r#"{"cardio": 12.5, "water": null, "alcohol": 0}"#).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get("alcohol"), Some(0.0));
        assert!(!plan.contains("water"));
    }

    #[test]
    fn test_differing_keys() {
        let local = PlanSnapshot::from([("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let remote = PlanSnapshot::from([("a", 1.0), ("b", 9.0)]);
        assert_eq!(
            local.differing_keys(&remote),
            vec!["b".to_string(), "c".to_string()]
        );
        assert_eq!(remote.differing_keys(&local), vec!["b".to_string()]);
    }
}
