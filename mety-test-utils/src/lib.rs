//! METY Test Utilities
//!
//! Shared test infrastructure for the METY workspace:
//! - In-memory plan, chat and prediction services with scriptable failures
//! - Gates that hold a service call until the test releases it
//! - Proptest generators for plans, profiles and chat replies
//! - Fixtures for common scenarios
//! - Assertions for plan snapshots

pub use mety_core::{
    Adherence, AckResponse, ChatAction, ChatActionKind, ChatRequest, ChatResponse, ChatService,
    Gender, GetPlanResponse, LifespanProjection, LogSubmitRequest, LogSubmitResponse,
    OnboardingPayload, OnboardingSubmitRequest, OnboardingSubmitResponse, PlanDiff, PlanService,
    PlanSnapshot, PredictionInput, PredictionService, ServiceError, ServiceResult,
    UpdatePlanRequest, UpdatePlanResponse, UserProfile,
};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Semaphore;

// ============================================================================
// GATES
// ============================================================================

/// Holds one service call until [`Gate::open`] is called.
#[derive(Debug, Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn open(&self) {
        self.0.add_permits(1);
    }
}

/// Per-call queues of gates. Each call consumes the next gate queued for it.
#[derive(Debug)]
struct Gates<K> {
    queued: Mutex<HashMap<K, VecDeque<Gate>>>,
}

impl<K> Default for Gates<K> {
    fn default() -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash> Gates<K> {
    fn push(&self, call: K) -> Gate {
        let gate = Gate(Arc::new(Semaphore::new(0)));
        self.queued
            .lock()
            .unwrap()
            .entry(call)
            .or_default()
            .push_back(gate.clone());
        gate
    }

    async fn pass(&self, call: &K) {
        let gate = self
            .queued
            .lock()
            .unwrap()
            .get_mut(call)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            if let Ok(permit) = gate.0.acquire().await {
                permit.forget();
            }
        }
    }
}

// ============================================================================
// MOCK PLAN SERVICE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanCall {
    GetPlan,
    UpdatePlan,
    ApplyTarget,
    Onboarding,
    SubmitLog,
    ClearChat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    GetPlan(String),
    UpdatePlan(UpdatePlanRequest),
    ApplyTarget(String),
    Onboarding(OnboardingSubmitRequest),
    SubmitLog(LogSubmitRequest),
    ClearChat(String),
}

impl RecordedCall {
    pub fn kind(&self) -> PlanCall {
        match self {
            RecordedCall::GetPlan(_) => PlanCall::GetPlan,
            RecordedCall::UpdatePlan(_) => PlanCall::UpdatePlan,
            RecordedCall::ApplyTarget(_) => PlanCall::ApplyTarget,
            RecordedCall::Onboarding(_) => PlanCall::Onboarding,
            RecordedCall::SubmitLog(_) => PlanCall::SubmitLog,
            RecordedCall::ClearChat(_) => PlanCall::ClearChat,
        }
    }
}

/// Server-side record of one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockUser {
    pub profile: Option<UserProfile>,
    pub current: PlanSnapshot,
    pub target: PlanSnapshot,
    pub optimal: PlanSnapshot,
    pub logs: Vec<LogSubmitRequest>,
    pub chat_cleared: usize,
}

/// In-memory plan backend.
///
/// `update_plan` merges the diff into the stored target, and
/// `apply_target_to_current` folds the target into current and clears it.
#[derive(Debug, Clone, Default)]
pub struct MockPlanService {
    users: Arc<RwLock<HashMap<String, MockUser>>>,
    failures: Arc<RwLock<HashMap<PlanCall, ServiceError>>>,
    rejections: Arc<RwLock<HashMap<PlanCall, bool>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    gates: Arc<Gates<PlanCall>>,
    adherence: Arc<RwLock<Adherence>>,
}

impl MockPlanService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: &str, user: MockUser) -> Self {
        self.put_user(user_id, user);
        self
    }

    pub fn put_user(&self, user_id: &str, user: MockUser) {
        self.users.write().unwrap().insert(user_id.to_string(), user);
    }

    pub fn user(&self, user_id: &str) -> Option<MockUser> {
        self.users.read().unwrap().get(user_id).cloned()
    }

    /// Mutate a stored user, creating it if absent.
    pub fn edit_user(&self, user_id: &str, edit: impl FnOnce(&mut MockUser)) {
        let mut users = self.users.write().unwrap();
        edit(users.entry(user_id.to_string()).or_default());
    }

    /// Make every `call` fail with `error` until [`MockPlanService::recover`].
    pub fn fail(&self, call: PlanCall, error: ServiceError) {
        self.failures.write().unwrap().insert(call, error);
    }

    /// Make every `call` answer with `ok: false`.
    pub fn reject(&self, call: PlanCall) {
        self.rejections.write().unwrap().insert(call, true);
    }

    pub fn recover(&self, call: PlanCall) {
        self.failures.write().unwrap().remove(&call);
        self.rejections.write().unwrap().remove(&call);
    }

    /// Hold the next `call` until the returned gate is opened.
    pub fn gate_next(&self, call: PlanCall) -> Gate {
        self.gates.push(call)
    }

    pub fn set_adherence(&self, adherence: Adherence) {
        *self.adherence.write().unwrap() = adherence;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self, call: PlanCall) -> usize {
        self.calls.read().unwrap().iter().filter(|c| c.kind() == call).count()
    }

    pub fn update_requests(&self) -> Vec<UpdatePlanRequest> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                RecordedCall::UpdatePlan(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Yield until at least `count` calls of `call` have arrived.
    pub async fn wait_for_calls(&self, call: PlanCall, count: usize) {
        while self.call_count(call) < count {
            tokio::task::yield_now().await;
        }
    }

    fn record(&self, call: RecordedCall) -> ServiceResult<()> {
        let kind = call.kind();
        self.calls.write().unwrap().push(call);
        match self.failures.read().unwrap().get(&kind) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn ok(&self, call: PlanCall) -> bool {
        !self.rejections.read().unwrap().contains_key(&call)
    }
}

#[async_trait]
impl PlanService for MockPlanService {
    async fn get_plan(&self, user_id: &str) -> ServiceResult<GetPlanResponse> {
        let outcome = self.record(RecordedCall::GetPlan(user_id.to_string()));
        let user = self.user(user_id).unwrap_or_default();
        self.gates.pass(&PlanCall::GetPlan).await;
        outcome?;
        Ok(GetPlanResponse {
            user_id: user_id.to_string(),
            profile: user.profile,
            current_plan: Some(user.current),
            target_plan: Some(user.target),
            optimal_plan: Some(user.optimal),
            last_updated: Some(chrono::Utc::now().to_rfc3339()),
        })
    }

    async fn update_plan(&self, request: &UpdatePlanRequest) -> ServiceResult<UpdatePlanResponse> {
        let outcome = self.record(RecordedCall::UpdatePlan(request.clone()));
        self.gates.pass(&PlanCall::UpdatePlan).await;
        outcome?;
        if !self.ok(PlanCall::UpdatePlan) {
            return Ok(UpdatePlanResponse::default());
        }
        let mut users = self.users.write().unwrap();
        let user = users.entry(request.user_id.clone()).or_default();
        user.target.merge_from(&request.diff);
        Ok(UpdatePlanResponse {
            ok: true,
            new_target_plan: user.target.clone(),
            applied_diff: request.diff.clone(),
        })
    }

    async fn apply_target_to_current(&self, user_id: &str) -> ServiceResult<AckResponse> {
        let outcome = self.record(RecordedCall::ApplyTarget(user_id.to_string()));
        self.gates.pass(&PlanCall::ApplyTarget).await;
        outcome?;
        if !self.ok(PlanCall::ApplyTarget) {
            return Ok(AckResponse { ok: false });
        }
        self.edit_user(user_id, |user| {
            let target = std::mem::take(&mut user.target);
            user.current.merge_from(&target);
        });
        Ok(AckResponse { ok: true })
    }

    async fn submit_onboarding(
        &self,
        request: &OnboardingSubmitRequest,
    ) -> ServiceResult<OnboardingSubmitResponse> {
        let outcome = self.record(RecordedCall::Onboarding(request.clone()));
        self.gates.pass(&PlanCall::Onboarding).await;
        outcome?;
        if !self.ok(PlanCall::Onboarding) {
            return Ok(OnboardingSubmitResponse::default());
        }
        self.edit_user(&request.user_id, |user| match &request.payload {
            OnboardingPayload::Profile(profile) => {
                user.profile.get_or_insert_with(UserProfile::default).merge(profile);
            }
            OnboardingPayload::Plan(values) => user.current.merge_from(values),
        });
        Ok(OnboardingSubmitResponse {
            ok: true,
            saved_doc: format!("{}/{}", request.user_id, request.page),
        })
    }

    async fn submit_log(&self, request: &LogSubmitRequest) -> ServiceResult<LogSubmitResponse> {
        let outcome = self.record(RecordedCall::SubmitLog(request.clone()));
        self.gates.pass(&PlanCall::SubmitLog).await;
        outcome?;
        if !self.ok(PlanCall::SubmitLog) {
            return Ok(LogSubmitResponse::default());
        }
        let log_id = {
            let mut users = self.users.write().unwrap();
            let user = users.entry(request.user_id.clone()).or_default();
            user.logs.push(request.clone());
            format!("log-{}", user.logs.len())
        };
        Ok(LogSubmitResponse {
            ok: true,
            log_id,
            adherence: *self.adherence.read().unwrap(),
        })
    }

    async fn clear_chat_history(&self, user_id: &str) -> ServiceResult<AckResponse> {
        let outcome = self.record(RecordedCall::ClearChat(user_id.to_string()));
        self.gates.pass(&PlanCall::ClearChat).await;
        outcome?;
        if !self.ok(PlanCall::ClearChat) {
            return Ok(AckResponse { ok: false });
        }
        self.edit_user(user_id, |user| user.chat_cleared += 1);
        Ok(AckResponse { ok: true })
    }
}

// ============================================================================
// MOCK CHAT SERVICE
// ============================================================================

/// Chat service answering from a script. When the script runs out it echoes.
#[derive(Debug, Clone, Default)]
pub struct MockChatService {
    script: Arc<Mutex<VecDeque<ServiceResult<ChatResponse>>>>,
    requests: Arc<RwLock<Vec<ChatRequest>>>,
    gates: Arc<Gates<()>>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, response: ChatResponse) -> &Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail_next(&self, error: ServiceError) -> &Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn gate_next(&self) -> Gate {
        self.gates.push(())
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.read().unwrap().clone()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.read().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ChatService for MockChatService {
    async fn send_message(&self, request: &ChatRequest) -> ServiceResult<ChatResponse> {
        self.requests.write().unwrap().push(request.clone());
        let scripted = self.script.lock().unwrap().pop_front();
        self.gates.pass(&()).await;
        scripted.unwrap_or_else(|| Ok(fixtures::chat_reply(&format!("You said: {}", request.message))))
    }
}

// ============================================================================
// MOCK PREDICTION SERVICE
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockPredictionService {
    result: Arc<RwLock<ServiceResult<LifespanProjection>>>,
    inputs: Arc<RwLock<Vec<PredictionInput>>>,
    gates: Arc<Gates<()>>,
}

impl Default for MockPredictionService {
    fn default() -> Self {
        Self::returning(fixtures::projection())
    }
}

impl MockPredictionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(projection: LifespanProjection) -> Self {
        Self {
            result: Arc::new(RwLock::new(Ok(projection))),
            inputs: Arc::new(RwLock::new(Vec::new())),
            gates: Arc::new(Gates::default()),
        }
    }

    pub fn set_result(&self, result: ServiceResult<LifespanProjection>) {
        *self.result.write().unwrap() = result;
    }

    pub fn gate_next(&self) -> Gate {
        self.gates.push(())
    }

    pub fn inputs(&self) -> Vec<PredictionInput> {
        self.inputs.read().unwrap().clone()
    }

    pub async fn wait_for_inputs(&self, count: usize) {
        while self.inputs.read().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PredictionService for MockPredictionService {
    async fn predict(&self, input: &PredictionInput) -> ServiceResult<LifespanProjection> {
        self.inputs.write().unwrap().push(input.clone());
        let result = self.result.read().unwrap().clone();
        self.gates.pass(&()).await;
        result
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for METY types.

    use super::*;
    use mety_core::variables;
    use proptest::prelude::*;

    /// A plannable (non-demographic) variable name.
    pub fn arb_plan_variable() -> impl Strategy<Value = &'static str> {
        prop::sample::select(variables::plan_variables().map(|v| v.name).collect::<Vec<_>>())
    }

    /// Plan values, zero included with a fair weight.
    pub fn arb_value() -> impl Strategy<Value = f64> {
        prop_oneof![
            1 => Just(0.0),
            1 => Just(1.0),
            3 => 0.0f64..5000.0,
        ]
    }

    pub fn arb_plan() -> impl Strategy<Value = PlanSnapshot> {
        prop::collection::btree_map(arb_plan_variable(), arb_value(), 0..12)
            .prop_map(|entries| entries.into_iter().collect::<PlanSnapshot>())
    }

    /// Non-empty diff.
    pub fn arb_diff() -> impl Strategy<Value = PlanDiff> {
        prop::collection::btree_map(arb_plan_variable(), arb_value(), 1..6)
            .prop_map(|entries| entries.into_iter().collect::<PlanSnapshot>())
    }

    pub fn arb_gender() -> impl Strategy<Value = Gender> {
        prop_oneof![Just(Gender::Male), Just(Gender::Female)]
    }

    pub fn arb_profile() -> impl Strategy<Value = UserProfile> {
        (
            prop::option::of(1u32..110),
            prop::option::of(arb_gender()),
            prop::option::of("[A-Z][a-z]{1,10}"),
        )
            .prop_map(|(age, gender, name)| UserProfile { name, age, gender })
    }

    pub fn arb_relative_risk() -> impl Strategy<Value = f64> {
        0.1f64..3.0
    }

    pub fn arb_projection() -> impl Strategy<Value = LifespanProjection> {
        (
            prop::option::of(40.0f64..110.0),
            prop::option::of(arb_relative_risk()),
            prop::option::of(arb_relative_risk()),
        )
            .prop_map(|(lifespan, cancer, stroke)| LifespanProjection {
                all_cause_mortality_predicted_lifespan: lifespan,
                cancer_predicted_rr: cancer,
                stroke_predicted_rr: stroke,
                ..LifespanProjection::default()
            })
    }

    pub fn arb_chat_response() -> impl Strategy<Value = ChatResponse> {
        (
            "[a-z ]{1,40}",
            prop::option::of(arb_plan()),
            prop::option::of(arb_plan()),
            prop::option::of(arb_diff()),
            prop::option::of(arb_projection()),
        )
            .prop_map(|(message, diff, suggested, action, projection)| ChatResponse {
                assistant_message: message,
                diff_detected: diff,
                suggested_plan: suggested,
                lifespan_projection: projection,
                actions: action
                    .map(|payload| ChatAction {
                        kind: ChatActionKind::AskApplyChange,
                        payload,
                    })
                    .into_iter()
                    .collect(),
                ..ChatResponse::default()
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made values for common scenarios.

    use super::*;
    use mety_core::variables;

    pub fn profile() -> UserProfile {
        UserProfile {
            name: Some("Ada".to_string()),
            age: Some(45),
            gender: Some(Gender::Female),
        }
    }

    pub fn current_plan() -> PlanSnapshot {
        PlanSnapshot::from([
            ("cardio", 10.0),
            ("water", 1500.0),
            ("sleep_duration", 6.5),
            ("alcohol", 4.0),
            ("vitamin_d", 1000.0),
        ])
    }

    /// A user with a profile, a current plan, an empty target and the
    /// catalog's optimal plan.
    pub fn seeded_user() -> MockUser {
        MockUser {
            profile: Some(profile()),
            current: current_plan(),
            target: PlanSnapshot::new(),
            optimal: variables::default_optimal_plan(),
            ..MockUser::default()
        }
    }

    pub fn projection() -> LifespanProjection {
        LifespanProjection {
            all_cause_mortality_predicted_lifespan: Some(84.3),
            cancer_predicted_rr: Some(0.85),
            cardio_vascular_disease_predicted_rr: Some(0.9),
            depression_predicted_rr: Some(1.0),
            diabetes_predicted_rr: Some(0.8),
            stroke_predicted_rr: Some(1.2),
        }
    }

    pub fn chat_reply(text: &str) -> ChatResponse {
        ChatResponse {
            assistant_message: text.to_string(),
            ..ChatResponse::default()
        }
    }

    pub fn reply_with_detected(text: &str, diff: PlanDiff) -> ChatResponse {
        ChatResponse {
            diff_detected: Some(diff),
            ..chat_reply(text)
        }
    }

    pub fn reply_with_suggestion(text: &str, suggested: PlanDiff) -> ChatResponse {
        ChatResponse {
            suggested_plan: Some(suggested),
            ..chat_reply(text)
        }
    }

    pub fn reply_with_action(text: &str, payload: PlanDiff) -> ChatResponse {
        ChatResponse {
            actions: vec![ChatAction {
                kind: ChatActionKind::AskApplyChange,
                payload,
            }],
            ..chat_reply(text)
        }
    }

    pub fn server_error(service: &'static str) -> ServiceError {
        ServiceError::Http {
            service,
            status: 500,
            body: "internal error".to_string(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for plan snapshots.

    use super::*;

    /// Assert that `plan[key] == expected`.
    #[track_caller]
    pub fn assert_plan_value(plan: &PlanSnapshot, key: &str, expected: f64) {
        assert_eq!(
            plan.get(key),
            Some(expected),
            "expected {key} = {expected} in {plan:?}"
        );
    }

    /// Assert that `key` is absent from `plan`.
    #[track_caller]
    pub fn assert_plan_lacks(plan: &PlanSnapshot, key: &str) {
        assert!(!plan.contains(key), "expected no {key} in {plan:?}");
    }

    /// Assert that every entry of `diff` appears in `plan` with the same value.
    #[track_caller]
    pub fn assert_contains_diff(plan: &PlanSnapshot, diff: &PlanDiff) {
        for (key, value) in diff.iter() {
            assert_eq!(
                plan.get(key),
                Some(value),
                "expected {key} = {value} from diff in {plan:?}"
            );
        }
    }

    /// Assert that a service result failed with an HTTP status.
    #[track_caller]
    pub fn assert_http_status<T: std::fmt::Debug>(result: &ServiceResult<T>, status: u16) {
        match result {
            Err(ServiceError::Http { status: got, .. }) => assert_eq!(*got, status),
            other => panic!("Expected HTTP {status} error, got: {other:?}"),
        }
    }
}
