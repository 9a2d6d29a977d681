//! Seams to the remote services.
//!
//! The client talks to each remote collaborator through one of these traits,
//! so the reconciliation logic can run against the HTTP implementations in
//! `mety-client` or the in-memory fakes in `mety-test-utils`.

use crate::error::ServiceResult;
use crate::projection::LifespanProjection;
use crate::wire::{
    AckResponse, ChatRequest, ChatResponse, GetPlanResponse, LogSubmitRequest, LogSubmitResponse,
    OnboardingSubmitRequest, OnboardingSubmitResponse, PredictionInput, UpdatePlanRequest,
    UpdatePlanResponse,
};
use async_trait::async_trait;

/// CRUD backend holding profile, plans, logs and chat history.
#[async_trait]
pub trait PlanService: Send + Sync {
    /// Fetch profile and the current, target and optimal plans.
    async fn get_plan(&self, user_id: &str) -> ServiceResult<GetPlanResponse>;

    /// Submit a target diff; the response carries the resulting target plan.
    async fn update_plan(&self, request: &UpdatePlanRequest) -> ServiceResult<UpdatePlanResponse>;

    /// Commit the target diff onto the current plan.
    async fn apply_target_to_current(&self, user_id: &str) -> ServiceResult<AckResponse>;

    async fn submit_onboarding(
        &self,
        request: &OnboardingSubmitRequest,
    ) -> ServiceResult<OnboardingSubmitResponse>;

    async fn submit_log(&self, request: &LogSubmitRequest) -> ServiceResult<LogSubmitResponse>;

    async fn clear_chat_history(&self, user_id: &str) -> ServiceResult<AckResponse>;
}

/// Conversational assistant that can extract and suggest plan changes.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> ServiceResult<ChatResponse>;
}

/// Pure function from plan variables to a lifespan projection. May be slow.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, input: &PredictionInput) -> ServiceResult<LifespanProjection>;
}
