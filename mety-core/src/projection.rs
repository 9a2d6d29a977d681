//! Lifespan projections returned by the prediction service.

use serde::{Deserialize, Serialize};

/// Conditions the prediction model reports a relative risk for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Cancer,
    Cardiovascular,
    Diabetes,
    Stroke,
    Depression,
}

impl Condition {
    pub fn all() -> &'static [Condition] {
        &[
            Condition::Cancer,
            Condition::Cardiovascular,
            Condition::Diabetes,
            Condition::Stroke,
            Condition::Depression,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            Condition::Cancer => "Cancer",
            Condition::Cardiovascular => "Cardiovascular",
            Condition::Diabetes => "Diabetes",
            Condition::Stroke => "Stroke",
            Condition::Depression => "Depression",
        }
    }
}

/// Predicted lifespan plus relative-risk multipliers.
///
/// Inline projections attached to chat turns may be partial, so every field
/// is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifespanProjection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_cause_mortality_predicted_lifespan: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancer_predicted_rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardio_vascular_disease_predicted_rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depression_predicted_rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diabetes_predicted_rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_predicted_rr: Option<f64>,
}

impl LifespanProjection {
    pub fn lifespan_years(&self) -> Option<f64> {
        self.all_cause_mortality_predicted_lifespan
    }

    pub fn relative_risk(&self, condition: Condition) -> Option<f64> {
        match condition {
            Condition::Cancer => self.cancer_predicted_rr,
            Condition::Cardiovascular => self.cardio_vascular_disease_predicted_rr,
            Condition::Diabetes => self.diabetes_predicted_rr,
            Condition::Stroke => self.stroke_predicted_rr,
            Condition::Depression => self.depression_predicted_rr,
        }
    }

    /// Lifespan formatted to one decimal, e.g. `"84.3 years"`.
    pub fn lifespan_display(&self) -> Option<String> {
        self.lifespan_years().map(|years| format!("{years:.1} years"))
    }

    /// Conditions with a known risk, paired with their signed percent change.
    pub fn risk_changes(&self) -> Vec<(Condition, i64)> {
        Condition::all()
            .iter()
            .filter_map(|c| self.relative_risk(*c).map(|rr| (*c, risk_percent(rr))))
            .collect()
    }
}

/// Convert a relative-risk multiplier into a signed percentage change.
/// `0.85` becomes `-15`, `1.2` becomes `20`.
pub fn risk_percent(relative_risk: f64) -> i64 {
    ((relative_risk - 1.0) * 100.0).round() as i64
}

/// Three-state projection slot: nothing yet, a request in flight, or a result.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProjectionSlot {
    #[default]
    Empty,
    Loading,
    Ready(LifespanProjection),
}

impl ProjectionSlot {
    pub fn is_loading(&self) -> bool {
        matches!(self, ProjectionSlot::Loading)
    }

    pub fn projection(&self) -> Option<&LifespanProjection> {
        match self {
            ProjectionSlot::Ready(projection) => Some(projection),
            _ => None,
        }
    }
}
