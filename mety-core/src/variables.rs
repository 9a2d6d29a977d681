//! Static catalog of plan variables.
//!
//! The catalog is process-wide configuration: every variable the backend
//! understands, its display unit, its group, and whether the prediction
//! service consumes it. Nothing here is mutated at runtime.

use crate::plan::PlanSnapshot;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the age variable (also a profile field).
pub const AGE: &str = "age";

/// Name of the gender variable (also a profile field, 0 = male, 1 = female).
pub const GENDER: &str = "gender";

/// Grouping used for plan tables and adherence breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableGroup {
    Supplements,
    Diet,
    Exercise,
    Demographics,
}

/// One entry of the plan variable catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanVariable {
    pub name: &'static str,
    pub unit: &'static str,
    pub group: VariableGroup,
    /// Consumed by the remote prediction service.
    pub prediction_input: bool,
    /// 0/1 coded (No/Yes).
    pub categorical: bool,
    /// Value in the static fallback optimal plan.
    pub optimal: Option<f64>,
}

const fn var(
    name: &'static str,
    unit: &'static str,
    group: VariableGroup,
    prediction_input: bool,
    optimal: f64,
) -> PlanVariable {
    PlanVariable {
        name,
        unit,
        group,
        prediction_input,
        categorical: false,
        optimal: Some(optimal),
    }
}

const fn flag(name: &'static str, group: VariableGroup, prediction_input: bool, optimal: f64) -> PlanVariable {
    PlanVariable {
        name,
        unit: "Yes/No",
        group,
        prediction_input,
        categorical: true,
        optimal: Some(optimal),
    }
}

use VariableGroup::{Demographics, Diet, Exercise, Supplements};

/// Every plan variable, in plan-table order (supplements, diet, exercise).
pub static PLAN_VARIABLES: &[PlanVariable] = &[
    // Supplements
    flag("multi_vitamins", Supplements, true, 1.0),
    var("dietary_fiber", "g/day", Supplements, true, 60.0),
    var("protein_supplements", "g/day", Supplements, false, 0.0),
    var("magnesium", "mg/day", Supplements, false, 0.0),
    var("vitamin_a", "mcg/day", Supplements, false, 0.0),
    var("vitamin_k", "mcg/day", Supplements, false, 0.0),
    var("vitamin_d", "IU/day", Supplements, false, 0.0),
    var("folic_acid", "mcg/day", Supplements, false, 0.0),
    var("vitamin_b6", "mg/day", Supplements, false, 0.0),
    var("vitamin_b12", "mcg/day", Supplements, false, 0.0),
    var("vitamin_e", "mg/day", Supplements, true, 1000.0),
    var("zinc", "mg/day", Supplements, false, 0.0),
    var("calcium", "mg/day", Supplements, false, 0.0),
    var("iron", "mg/day", Supplements, false, 0.0),
    var("olive_oil", "g/day", Supplements, true, 50.0),
    var("fish_oil_omega_3", "g/day", Supplements, true, 1.8869),
    var("green_tea", "ml/day", Supplements, true, 1116.753),
    var("vitamin_c", "mg/day", Supplements, false, 0.0),
    // Diet
    var("alcohol", "drinks/week", Diet, true, 0.0),
    var("dairy", "servings/day", Diet, true, 3.7126),
    var("grain_refined", "servings/day", Diet, true, 0.0),
    var("grain_unrefined", "servings/day", Diet, true, 2.8861),
    var("fruits_and_veggies", "servings/day", Diet, true, 8.4319),
    var("legumes", "servings/day", Diet, true, 6.0511),
    var("meat_processed", "servings/week", Diet, true, 0.0),
    var("meat_unprocessed", "servings/week", Diet, true, 0.0),
    var("meat_poultry", "servings/week", Diet, true, 0.0),
    var("refined_sugar", "g/day", Diet, true, 0.0),
    var("artificial_sweetener", "mg/day", Diet, true, 0.0),
    flag("calorie_restriction", Diet, true, 1.0),
    var("fat_trans", "g/day", Diet, true, 0.0),
    // Exercise & lifestyle
    var("cardio", "MET-Hr/week", Exercise, true, 35.4955),
    var("strength_training", "min/week", Exercise, true, 96.4597),
    var("sauna_duration", "mins/session", Exercise, true, 38.2),
    var("sauna_frequency", "times/week", Exercise, true, 3.034),
    var("water", "ml/day", Exercise, true, 1901.2292),
    var("sleep_duration", "hours/day", Exercise, true, 7.0),
    // Demographics (profile-backed, required by predictions)
    PlanVariable {
        name: AGE,
        unit: "years",
        group: Demographics,
        prediction_input: true,
        categorical: false,
        optimal: None,
    },
    PlanVariable {
        name: GENDER,
        unit: "0=male/1=female",
        group: Demographics,
        prediction_input: true,
        categorical: true,
        optimal: None,
    },
];

static INDEX: Lazy<HashMap<&'static str, &'static PlanVariable>> =
    Lazy::new(|| PLAN_VARIABLES.iter().map(|v| (v.name, v)).collect());

/// Look up a catalog entry by name.
pub fn lookup(name: &str) -> Option<&'static PlanVariable> {
    INDEX.get(name).copied()
}

/// Whether `name` is a known plan variable.
pub fn is_known(name: &str) -> bool {
    INDEX.contains_key(name)
}

/// Whether the prediction service consumes `name`.
pub fn is_prediction_variable(name: &str) -> bool {
    lookup(name).is_some_and(|v| v.prediction_input)
}

/// Display unit of a variable, if known.
pub fn unit(name: &str) -> Option<&'static str> {
    lookup(name).map(|v| v.unit)
}

/// Names of all prediction-service inputs, in catalog order.
pub fn prediction_variables() -> impl Iterator<Item = &'static str> {
    PLAN_VARIABLES
        .iter()
        .filter(|v| v.prediction_input)
        .map(|v| v.name)
}

/// Variables a user can plan for (everything except demographics).
pub fn plan_variables() -> impl Iterator<Item = &'static PlanVariable> {
    PLAN_VARIABLES
        .iter()
        .filter(|v| v.group != VariableGroup::Demographics)
}

/// The static fallback optimal plan used when the backend supplies none.
pub fn default_optimal_plan() -> PlanSnapshot {
    PLAN_VARIABLES
        .iter()
        .filter_map(|v| v.optimal.map(|value| (v.name.to_string(), value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = PLAN_VARIABLES.iter().map(|v| v.name).collect();
        assert_eq!(names.len(), PLAN_VARIABLES.len());
    }

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(plan_variables().count(), 37);
        assert_eq!(prediction_variables().count(), 27);
    }

    #[test]
    fn test_age_and_gender_are_prediction_inputs() {
        assert!(is_prediction_variable(AGE));
        assert!(is_prediction_variable(GENDER));
        assert!(!is_prediction_variable("calcium"));
        assert!(!is_prediction_variable("not_a_variable"));
    }

    #[test]
    fn test_default_optimal_plan_covers_plan_variables() {
        let optimal = default_optimal_plan();
        assert_eq!(optimal.len(), 37);
        assert_eq!(optimal.get("cardio"), Some(35.4955));
        assert_eq!(optimal.get("alcohol"), Some(0.0));
        assert!(optimal.get(AGE).is_none());
    }

    #[test]
    fn test_units() {
        assert_eq!(unit("water"), Some("ml/day"));
        assert_eq!(unit("multi_vitamins"), Some("Yes/No"));
        assert_eq!(unit("nope"), None);
    }
}
