//! Plan table editing and the save-all protocol.

use crate::error::ClientError;
use crate::store::{PlanStore, SyncOutcome};
use mety_core::variables::{self, PlanVariable, VariableGroup};
use mety_core::{PlanDiff, PlanSnapshot, ValidationError};
use std::collections::BTreeSet;

const SAVE_FAILED: &str = "Failed to save. Please try again.";
const APPLY_FAILED: &str = "Failed to apply change. Please try again.";
const RECOMMENDED_FAILED: &str = "Failed to apply recommended plan. Please try again.";

const GROUP_ORDER: [VariableGroup; 3] = [
    VariableGroup::Supplements,
    VariableGroup::Diet,
    VariableGroup::Exercise,
];

/// Editable copy of the plan table. Tracks which fields the user touched so
/// a deliberate zero can be told apart from an untouched one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanForm {
    values: PlanSnapshot,
    touched: BTreeSet<String>,
}

impl PlanForm {
    /// Seed the form with the plan the user currently sees.
    pub fn from_plan(effective: &PlanSnapshot) -> Self {
        Self {
            values: effective.clone(),
            touched: BTreeSet::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ValidationError> {
        if !variables::is_known(name) {
            return Err(ValidationError::InvalidValue {
                field: "variable",
                reason: format!("unknown plan variable {name}"),
            });
        }
        if !value.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: "value",
                reason: format!("{value} is not a number"),
            });
        }
        self.values.set(name, value);
        self.touched.insert(name.to_string());
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name)
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// The diff to send on save: every non-zero stored target value, then the
    /// form's non-zero values and touched zeros on top.
    pub fn build_diff(&self, stored_target: &PlanSnapshot) -> PlanDiff {
        let mut diff = stored_target.non_zero();
        diff.merge_from(&self.values.sendable(&self.touched));
        diff
    }
}

/// One row of the plan table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRow {
    pub variable: &'static PlanVariable,
    pub optimal: Option<f64>,
    pub current: Option<f64>,
    pub target: Option<f64>,
}

/// Rows for the plan table: prediction inputs first, each part grouped as
/// supplements, diet, exercise.
pub fn plan_rows(current: &PlanSnapshot, target: &PlanSnapshot, optimal: &PlanSnapshot) -> Vec<PlanRow> {
    let effective = current.overlay(target);
    let ordered = [true, false].into_iter().flat_map(|prediction| {
        GROUP_ORDER.into_iter().flat_map(move |group| {
            variables::plan_variables()
                .filter(move |v| v.group == group && v.prediction_input == prediction)
        })
    });
    ordered
        .map(|variable| PlanRow {
            variable,
            optimal: optimal.get(variable.name).or(variable.optimal),
            current: current.get(variable.name),
            target: effective.get(variable.name),
        })
        .collect()
}

#[derive(Clone)]
pub struct PlanEditor {
    store: PlanStore,
}

impl PlanEditor {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }

    pub async fn form(&self) -> PlanForm {
        PlanForm::from_plan(&self.store.read().await.effective_plan())
    }

    pub async fn rows(&self) -> Vec<PlanRow> {
        let state = self.store.read().await;
        plan_rows(state.current_plan(), state.target_plan(), state.optimal_plan())
    }

    /// Persist the whole table as the new current plan: update target,
    /// reload, fold target into current, reload, then clear the local target.
    pub async fn save_all(&self, form: &PlanForm) -> Result<(), ClientError> {
        let diff = {
            let state = self.store.read().await;
            state.active_user()?;
            form.build_diff(state.target_plan())
        };
        tracing::info!(keys = diff.len(), "saving plan");

        let result = async {
            self.store.update_target_plan(diff).await?;
            self.store.load_plans().await?;
            self.store.commit_target().await?;
            self.store.load_plans().await?;
            Ok::<(), ClientError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.store.write().await.clear_target();
                Ok(())
            }
            Err(err) => {
                self.store.alert(SAVE_FAILED).await;
                Err(err)
            }
        }
    }

    /// Set a single variable on the target and reload.
    pub async fn apply_single(&self, name: &str, value: f64) -> Result<(), ClientError> {
        let mut form = PlanForm::default();
        form.set(name, value)?;
        self.apply_diff(form.values, APPLY_FAILED).await
    }

    /// Apply the diff the last chat reply detected. Returns false when there was none.
    pub async fn apply_latest_extracted(&self) -> Result<bool, ClientError> {
        let diff = self.store.read().await.latest_chat().diff_detected.clone();
        match diff.filter(|d| !d.is_empty()) {
            Some(diff) => self.apply_diff(diff, APPLY_FAILED).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Apply the plan the last chat reply suggested. Returns false when there was none.
    pub async fn apply_latest_recommended(&self) -> Result<bool, ClientError> {
        let suggested = self.store.read().await.latest_chat().suggested_plan.clone();
        let Some(suggested) = suggested.filter(|d| !d.is_empty()) else {
            return Ok(false);
        };
        match self.store.apply_recommended_locally(&suggested).await? {
            SyncOutcome::Synced => {
                if let Err(err) = self.store.load_plans().await {
                    self.store.alert(RECOMMENDED_FAILED).await;
                    return Err(err);
                }
                Ok(true)
            }
            SyncOutcome::Pending(err) => {
                self.store.alert(RECOMMENDED_FAILED).await;
                Err(err.into())
            }
        }
    }

    pub async fn reset_to_optimal(&self) {
        self.store.reset_target_to_optimal().await;
    }

    async fn apply_diff(&self, diff: PlanDiff, failure: &str) -> Result<(), ClientError> {
        let result = async {
            self.store.update_target_plan(diff).await?;
            self.store.load_plans().await?;
            Ok::<(), ClientError>(())
        }
        .await;
        if let Err(err) = result {
            self.store.alert(failure).await;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_zero_does_not_override_stored_target() {
        let form = PlanForm::from_plan(&PlanSnapshot::from([("cardio", 0.0)]));
        let diff = form.build_diff(&PlanSnapshot::from([("cardio", 30.0)]));
        assert_eq!(diff.get("cardio"), Some(30.0));
    }

    #[test]
    fn test_touched_zero_is_sent() {
        let mut form = PlanForm::from_plan(&PlanSnapshot::from([("alcohol", 3.0)]));
        form.set("alcohol", 0.0).unwrap();
        let diff = form.build_diff(&PlanSnapshot::from([("alcohol", 3.0)]));
        assert_eq!(diff.get("alcohol"), Some(0.0));
    }

    #[test]
    fn test_form_values_win_over_stored_target() {
        let form = PlanForm::from_plan(&PlanSnapshot::from([("water", 2500.0)]));
        let diff = form.build_diff(&PlanSnapshot::from([("water", 2000.0), ("cardio", 10.0)]));
        assert_eq!(diff.get("water"), Some(2500.0));
        assert_eq!(diff.get("cardio"), Some(10.0));
    }

    #[test]
    fn test_form_rejects_unknown_and_nan() {
        let mut form = PlanForm::default();
        assert!(form.set("not_a_variable", 1.0).is_err());
        assert!(form.set("water", f64::NAN).is_err());
        assert!(!form.is_touched("water"));
    }

    #[test]
    fn test_rows_put_prediction_variables_first() {
        let rows = plan_rows(&PlanSnapshot::new(), &PlanSnapshot::new(), &PlanSnapshot::new());
        assert_eq!(rows.len(), variables::plan_variables().count());
        let first_non_prediction = rows
            .iter()
            .position(|r| !r.variable.prediction_input)
            .unwrap();
        assert!(rows[first_non_prediction..]
            .iter()
            .all(|r| !r.variable.prediction_input));
        assert_eq!(rows[0].variable.group, VariableGroup::Supplements);
    }

    #[test]
    fn test_row_target_shows_effective_value() {
        let current = PlanSnapshot::from([("water", 1500.0), ("cardio", 10.0)]);
        let target = PlanSnapshot::from([("water", 2000.0)]);
        let rows = plan_rows(&current, &target, &PlanSnapshot::new());
        let water = rows.iter().find(|r| r.variable.name == "water").unwrap();
        assert_eq!(water.current, Some(1500.0));
        assert_eq!(water.target, Some(2000.0));
        let cardio = rows.iter().find(|r| r.variable.name == "cardio").unwrap();
        assert_eq!(cardio.target, Some(10.0));
        assert_eq!(cardio.optimal, Some(35.4955));
    }
}
