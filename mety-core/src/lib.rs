//! METY Core - Plan Types
//!
//! Data types shared by the health-plan client: the plan variable catalog,
//! plan snapshots and their diff algebra, profile, chat and projection types,
//! the wire format of the remote services, and the service traits.

pub mod adherence;
pub mod chat;
pub mod error;
pub mod plan;
pub mod profile;
pub mod projection;
pub mod service;
pub mod variables;
pub mod wire;

pub use adherence::{as_percent, Adherence};
pub use chat::{ChatAction, ChatActionKind, ChatMessage, ChatRole, TurnId};
pub use error::{ServiceError, ServiceResult, ValidationError};
pub use plan::{effective_plan, PlanDiff, PlanSnapshot};
pub use profile::{Gender, UserProfile};
pub use projection::{risk_percent, Condition, LifespanProjection, ProjectionSlot};
pub use service::{ChatService, PlanService, PredictionService};
pub use variables::{PlanVariable, VariableGroup, AGE, GENDER, PLAN_VARIABLES};
pub use wire::{
    AckResponse, ChatOptions, ChatRequest, ChatResponse, GetPlanResponse, LogSubmitRequest,
    LogSubmitResponse, OnboardingPage, OnboardingPayload, OnboardingSubmitRequest,
    OnboardingSubmitResponse, PredictionInput, UpdatePlanRequest, UpdatePlanResponse,
};
