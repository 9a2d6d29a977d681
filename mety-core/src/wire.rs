//! Request and response bodies exchanged with the plan, chat and prediction services.

use crate::adherence::Adherence;
use crate::chat::ChatAction;
use crate::plan::{PlanDiff, PlanSnapshot};
use crate::profile::UserProfile;
use crate::projection::LifespanProjection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PLAN SERVICE
// ============================================================================

/// `GET /plan/get?user_id=<id>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetPlanResponse {
    pub user_id: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub current_plan: Option<PlanSnapshot>,
    #[serde(default)]
    pub target_plan: Option<PlanSnapshot>,
    #[serde(default)]
    pub optimal_plan: Option<PlanSnapshot>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// `POST /plan/update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlanRequest {
    pub user_id: String,
    pub diff: PlanDiff,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlanResponse {
    pub ok: bool,
    #[serde(default)]
    pub new_target_plan: PlanSnapshot,
    #[serde(default)]
    pub applied_diff: PlanDiff,
}

/// Bare `{ "ok": bool }` acknowledgement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Onboarding pages, tagged with the exact names the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnboardingPage {
    #[serde(rename = "About Me")]
    AboutMe,
    #[serde(rename = "My Supplements")]
    Supplements,
    #[serde(rename = "My Diet")]
    Diet,
    #[serde(rename = "My Exercise")]
    Exercise,
}

impl fmt::Display for OnboardingPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OnboardingPage::AboutMe => "About Me",
            OnboardingPage::Supplements => "My Supplements",
            OnboardingPage::Diet => "My Diet",
            OnboardingPage::Exercise => "My Exercise",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnboardingPayload {
    Profile(UserProfile),
    Plan(PlanSnapshot),
}

/// `POST /onboarding/submit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingSubmitRequest {
    pub user_id: String,
    pub page: OnboardingPage,
    pub payload: OnboardingPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingSubmitResponse {
    pub ok: bool,
    #[serde(default)]
    pub saved_doc: String,
}

/// `POST /log/submit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSubmitRequest {
    pub user_id: String,
    pub log: PlanSnapshot,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSubmitResponse {
    pub ok: bool,
    #[serde(default)]
    pub log_id: String,
    pub adherence: Adherence,
}

// ============================================================================
// CHAT SERVICE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub auto_apply_extracted_vars: bool,
}

/// `POST /chat`. Only the latest message is sent; the backend owns history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    pub options: ChatOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub assistant_message: String,
    #[serde(default)]
    pub suggested_plan: Option<PlanDiff>,
    #[serde(default)]
    pub diff_detected: Option<PlanDiff>,
    #[serde(default)]
    pub vars_extracted: Option<PlanSnapshot>,
    #[serde(default)]
    pub unknown_keys: Vec<String>,
    #[serde(default)]
    pub lifespan_projection: Option<LifespanProjection>,
    #[serde(default)]
    pub actions: Vec<ChatAction>,
}

impl ChatResponse {
    /// `diff_detected`, only when it carries at least one entry.
    pub fn detected_diff(&self) -> Option<&PlanDiff> {
        self.diff_detected.as_ref().filter(|d| !d.is_empty())
    }

    /// `suggested_plan`, only when it carries at least one entry.
    pub fn suggested_diff(&self) -> Option<&PlanDiff> {
        self.suggested_plan.as_ref().filter(|d| !d.is_empty())
    }
}

// ============================================================================
// PREDICTION SERVICE
// ============================================================================

/// Flat mapping of variable name to value. Only known values, no defaults.
pub type PredictionInput = PlanSnapshot;
