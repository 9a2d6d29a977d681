//! Plan reconciliation store.
//!
//! Single source of truth for the active user's profile, current, target and
//! optimal plans, the lifespan projection slot and the chat state. Every read
//! and write of plan data on the plan backend goes through [`PlanStore`].
//!
//! The store is a cloneable handle over `Arc<RwLock<StoreState>>`. The lock is
//! never held across an await: each operation takes a fence [`Ticket`], drops
//! the lock, calls the service, then re-acquires the lock and applies the
//! response only if the ticket is still current.

use crate::error::ClientError;
use crate::fence::{Operation, RequestFence, Ticket};
use crate::logbook::LogEntry;
use crate::notifications::{Notification, NotificationLevel};
use crate::persistence::PersistedState;
use mety_core::variables;
use mety_core::{
    ChatAction, ChatMessage, ChatResponse, ChatRole, GetPlanResponse, LifespanProjection,
    LogSubmitRequest, LogSubmitResponse, OnboardingSubmitRequest, OnboardingSubmitResponse,
    PlanDiff, PlanService, PlanSnapshot, ProjectionSlot, ServiceError, TurnId, UpdatePlanRequest,
    UpdatePlanResponse, UserProfile, AGE, GENDER,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const PLAN_SERVICE: &str = "plan service";
const CHAT_SERVICE: &str = "chat service";

// ============================================================================
// STATE
// ============================================================================

/// Chat history and the artifacts derived from assistant turns.
#[derive(Debug, Clone)]
pub struct ChatState {
    history: Vec<ChatMessage>,
    next_turn: TurnId,
    suggested_plans: BTreeMap<TurnId, PlanSnapshot>,
    inline_projections: BTreeMap<TurnId, LifespanProjection>,
    expanded: BTreeSet<TurnId>,
    pending_action: Option<ChatAction>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            next_turn: TurnId(1),
            suggested_plans: BTreeMap::new(),
            inline_projections: BTreeMap::new(),
            expanded: BTreeSet::new(),
            pending_action: None,
        }
    }
}

impl ChatState {
    pub fn from_history(history: Vec<ChatMessage>) -> Self {
        let next_turn = history
            .iter()
            .map(|m| m.turn_id)
            .max()
            .map_or(TurnId(1), TurnId::next);
        Self {
            history,
            next_turn,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn suggested_plan(&self, turn: TurnId) -> Option<&PlanSnapshot> {
        self.suggested_plans.get(&turn)
    }

    pub fn inline_projection(&self, turn: TurnId) -> Option<&LifespanProjection> {
        self.inline_projections.get(&turn)
    }

    pub fn is_expanded(&self, turn: TurnId) -> bool {
        self.expanded.contains(&turn)
    }

    pub fn pending_action(&self) -> Option<&ChatAction> {
        self.pending_action.as_ref()
    }

    fn push(&mut self, user_id: &str, role: ChatRole, text: impl Into<String>) -> TurnId {
        let turn_id = self.next_turn;
        self.next_turn = turn_id.next();
        self.history.push(ChatMessage {
            turn_id,
            user_id: user_id.to_string(),
            role,
            text: text.into(),
            timestamp: chrono::Utc::now(),
        });
        turn_id
    }

    /// Toggle the expanded view of a suggested plan. Returns the new state.
    pub fn toggle_expanded(&mut self, turn: TurnId) -> bool {
        if !self.expanded.remove(&turn) {
            self.expanded.insert(turn);
            return true;
        }
        false
    }

    fn clear(&mut self) {
        self.history.clear();
        self.suggested_plans.clear();
        self.inline_projections.clear();
        self.expanded.clear();
        self.pending_action = None;
    }
}

/// The diffs carried by the most recent chat response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestChatResponse {
    pub diff_detected: Option<PlanDiff>,
    pub suggested_plan: Option<PlanDiff>,
}

/// Result of a plan reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// False when a newer reload superseded this one.
    pub applied: bool,
    /// Keys whose unsynced local value the server overrode.
    pub diverged: Vec<String>,
}

/// Result of a local-first target change.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Synced,
    /// Applied locally but the backend did not acknowledge it.
    Pending(ServiceError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSwitch {
    Unchanged,
    Switched(ReloadReport),
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    user_id: Option<String>,
    profile: UserProfile,
    current_plan: PlanSnapshot,
    target_plan: PlanSnapshot,
    optimal_plan: PlanSnapshot,
    projection: ProjectionSlot,
    /// Last projection that settled as ready; survives overlapping requests.
    last_ready: Option<LifespanProjection>,
    chat: ChatState,
    latest_chat: LatestChatResponse,
    log_book: Vec<LogEntry>,
    /// Locally applied values not yet acknowledged by the backend.
    sync_pending: BTreeMap<String, f64>,
    in_flight: usize,
    error: Option<String>,
    notifications: Vec<Notification>,
    fence: RequestFence,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn active_user(&self) -> Result<&str, ClientError> {
        self.user_id.as_deref().ok_or(ClientError::NoActiveUser)
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn current_plan(&self) -> &PlanSnapshot {
        &self.current_plan
    }

    pub fn target_plan(&self) -> &PlanSnapshot {
        &self.target_plan
    }

    pub fn optimal_plan(&self) -> &PlanSnapshot {
        &self.optimal_plan
    }

    /// Current plan with the target diff on top.
    pub fn effective_plan(&self) -> PlanSnapshot {
        self.current_plan.overlay(&self.target_plan)
    }

    pub fn projection(&self) -> &ProjectionSlot {
        &self.projection
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatState {
        &mut self.chat
    }

    pub fn latest_chat(&self) -> &LatestChatResponse {
        &self.latest_chat
    }

    pub fn log_book(&self) -> &[LogEntry] {
        &self.log_book
    }

    pub fn sync_pending(&self) -> &BTreeMap<String, f64> {
        &self.sync_pending
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    // ------------------------------------------------------------------------
    // Synchronous operations
    // ------------------------------------------------------------------------

    /// Make `user_id` the active user. Switching to a different id drops all
    /// per-user state and invalidates in-flight requests. Returns whether the
    /// user changed.
    pub fn switch_user(&mut self, user_id: &str) -> bool {
        if self.user_id.as_deref() == Some(user_id) {
            return false;
        }
        self.fence.advance_epoch();
        self.user_id = Some(user_id.to_string());
        self.profile = UserProfile::default();
        self.current_plan.clear();
        self.target_plan.clear();
        self.optimal_plan.clear();
        self.projection = ProjectionSlot::Empty;
        self.last_ready = None;
        self.chat.clear();
        self.latest_chat = LatestChatResponse::default();
        self.log_book.clear();
        self.sync_pending.clear();
        self.in_flight = 0;
        self.error = None;
        true
    }

    /// Replace the target with the optimal plan. No network call.
    pub fn reset_target_to_optimal(&mut self) {
        self.target_plan = self.optimal_plan.clone();
    }

    /// Replace all three plans at once.
    pub fn set_plans(
        &mut self,
        current: PlanSnapshot,
        target: PlanSnapshot,
        optimal: PlanSnapshot,
    ) {
        self.current_plan = current;
        self.target_plan = target;
        self.optimal_plan = optimal;
    }

    pub fn clear_target(&mut self) {
        self.target_plan.clear();
    }

    pub fn merge_profile(&mut self, profile: &UserProfile) {
        self.profile.merge(profile);
    }

    /// Append a message to the active user's chat history.
    pub fn record_chat_message(
        &mut self,
        role: ChatRole,
        text: impl Into<String>,
    ) -> Result<TurnId, ClientError> {
        let user_id = self.active_user()?.to_string();
        Ok(self.chat.push(&user_id, role, text))
    }

    pub fn set_latest_chat_response(
        &mut self,
        diff_detected: Option<PlanDiff>,
        suggested_plan: Option<PlanDiff>,
    ) {
        self.latest_chat = LatestChatResponse {
            diff_detected,
            suggested_plan,
        };
    }

    pub fn set_lifespan_projection(&mut self, projection: Option<LifespanProjection>) {
        self.last_ready = projection.clone();
        self.projection = match projection {
            Some(projection) => ProjectionSlot::Ready(projection),
            None => ProjectionSlot::Empty,
        };
    }

    pub fn take_pending_action(&mut self) -> Option<ChatAction> {
        self.chat.pending_action.take()
    }

    pub fn push_log_entry(&mut self, entry: LogEntry) {
        self.log_book.push(entry);
    }

    pub fn notify(&mut self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::warn!(message = %notification.message, "user alert")
            }
            _ => tracing::debug!(message = %notification.message, "user notification"),
        }
        self.notifications.push(notification);
    }

    /// Queue a blocking error alert.
    pub fn alert(&mut self, message: impl Into<String>) {
        self.notify(Notification::alert(message));
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ------------------------------------------------------------------------
    // Request lifecycle
    // ------------------------------------------------------------------------

    /// Start an asynchronous operation: raise the loading flag, clear the
    /// previous error and issue a fence ticket.
    pub fn begin(&mut self, operation: Operation) -> Ticket {
        self.in_flight += 1;
        self.error = None;
        self.fence.issue(operation)
    }

    fn finish(&mut self, ticket: Ticket) {
        if self.fence.same_user(ticket) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
    }

    /// Record a failed request. Failures for a user no longer active are ignored.
    pub fn fail(&mut self, ticket: Ticket, err: &ServiceError) {
        self.finish(ticket);
        if !self.fence.same_user(ticket) {
            tracing::debug!(operation = ?ticket.operation, "ignoring failure for previous user");
            return;
        }
        self.error = Some(err.to_string());
    }

    /// Close a request that produced nothing to apply.
    pub fn complete(&mut self, ticket: Ticket) {
        self.finish(ticket);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.fence.is_current(ticket)
    }

    pub fn is_same_user(&self, ticket: Ticket) -> bool {
        self.fence.same_user(ticket)
    }

    /// Replace the plans with a server snapshot. The server wins over any
    /// unsynced local edit; overridden keys are reported.
    pub fn apply_plans(&mut self, ticket: Ticket, response: GetPlanResponse) -> ReloadReport {
        self.finish(ticket);
        if !self.fence.is_current(ticket) {
            tracing::debug!(generation = ticket.generation, "dropping stale plan reload");
            return ReloadReport::default();
        }

        if let Some(profile) = &response.profile {
            self.profile.merge(profile);
        }
        let mut current = response.current_plan.unwrap_or_default();
        let mut target = response.target_plan.unwrap_or_default();
        let optimal = response
            .optimal_plan
            .filter(|plan| !plan.is_empty())
            .unwrap_or_else(variables::default_optimal_plan);
        for plan in [&mut current, &mut target] {
            if let Some(age) = self.profile.age_value() {
                plan.backfill(AGE, age);
            }
            if let Some(gender) = self.profile.gender_value() {
                plan.backfill(GENDER, gender);
            }
        }

        let diverged = self
            .sync_pending
            .iter()
            .map(|(key, value)| (key.as_str(), *value))
            .collect::<PlanSnapshot>()
            .differing_keys(&target);
        if !diverged.is_empty() {
            tracing::warn!(
                user_id = self.user_id.as_deref().unwrap_or_default(),
                keys = ?diverged,
                "server plan overrode unsynced local changes"
            );
        }
        self.sync_pending.clear();

        self.current_plan = current;
        self.target_plan = target;
        self.optimal_plan = optimal;
        ReloadReport {
            applied: true,
            diverged,
        }
    }

    /// Merge the target returned by the backend after an update.
    pub fn apply_target_update(
        &mut self,
        ticket: Ticket,
        sent: &PlanDiff,
        response: &UpdatePlanResponse,
    ) -> bool {
        self.finish(ticket);
        if !self.fence.same_user(ticket) {
            return false;
        }
        self.acknowledge(sent);
        if !self.fence.is_current(ticket) {
            tracing::debug!(generation = ticket.generation, "dropping stale target update");
            return false;
        }
        self.target_plan.merge_from(&response.new_target_plan);
        true
    }

    /// Merge `diff` into the target ahead of persisting it, marking every
    /// entry as awaiting acknowledgement. Returns the active user id.
    pub fn merge_target_locally(&mut self, diff: &PlanDiff) -> Result<String, ClientError> {
        let user_id = self.active_user()?.to_string();
        self.target_plan.merge_from(diff);
        for (key, value) in diff.iter() {
            self.sync_pending.insert(key.to_string(), value);
        }
        Ok(user_id)
    }

    /// Clear sync markers whose value the backend has now stored.
    pub fn acknowledge(&mut self, sent: &PlanDiff) {
        for (key, value) in sent.iter() {
            if self.sync_pending.get(key) == Some(&value) {
                self.sync_pending.remove(key);
            }
        }
    }

    /// Apply an assistant reply. Returns the assistant turn id, or `None`
    /// when the user changed while the request was in flight.
    pub fn complete_chat_turn(
        &mut self,
        ticket: Ticket,
        response: &ChatResponse,
        auto_apply_extracted: bool,
    ) -> Option<TurnId> {
        self.finish(ticket);
        if !self.fence.same_user(ticket) {
            tracing::debug!("dropping chat reply for previous user");
            return None;
        }
        let user_id = self.user_id.clone().unwrap_or_default();
        let turn = self
            .chat
            .push(&user_id, ChatRole::Assistant, response.assistant_message.clone());

        if let Some(suggested) = response.suggested_diff() {
            let full_plan = self.effective_plan().overlay(suggested);
            self.chat.suggested_plans.insert(turn, full_plan);
        }
        if let Some(projection) = &response.lifespan_projection {
            self.chat.inline_projections.insert(turn, projection.clone());
        }

        if self.fence.is_current(ticket) {
            self.set_latest_chat_response(
                response.detected_diff().cloned(),
                response.suggested_diff().cloned(),
            );
            self.chat.pending_action = if auto_apply_extracted {
                None
            } else {
                response.actions.first().cloned()
            };
        } else {
            tracing::debug!(%turn, "chat reply superseded; keeping message only");
        }
        Some(turn)
    }

    pub fn clear_chat(&mut self, ticket: Ticket) -> bool {
        self.finish(ticket);
        if !self.fence.same_user(ticket) {
            return false;
        }
        self.chat.clear();
        true
    }

    /// Move the projection slot to loading. Returns the last settled
    /// projection, which a failed request restores.
    pub fn begin_projection(&mut self) -> ProjectionSlot {
        self.projection = ProjectionSlot::Loading;
        match &self.last_ready {
            Some(projection) => ProjectionSlot::Ready(projection.clone()),
            None => ProjectionSlot::Empty,
        }
    }

    /// Settle a loading projection slot, unless a newer request owns it.
    pub fn settle_projection(&mut self, ticket: Ticket, slot: ProjectionSlot) -> bool {
        if !self.fence.is_current(ticket) {
            tracing::debug!(generation = ticket.generation, "dropping stale projection");
            return false;
        }
        match &slot {
            ProjectionSlot::Ready(projection) => self.last_ready = Some(projection.clone()),
            ProjectionSlot::Empty => self.last_ready = None,
            ProjectionSlot::Loading => {}
        }
        self.projection = slot;
        true
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn restore(&mut self, persisted: PersistedState) {
        self.fence.advance_epoch();
        let history = persisted
            .chat_history
            .into_iter()
            .filter(|message| persisted.user_id.as_deref() == Some(message.user_id.as_str()))
            .collect();
        self.user_id = persisted.user_id;
        self.profile = persisted.profile;
        self.target_plan = persisted.target_plan;
        self.chat = ChatState::from_history(history);
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            user_id: self.user_id.clone(),
            profile: self.profile.clone(),
            target_plan: self.target_plan.clone(),
            chat_history: self.chat.history.clone(),
        }
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Shared handle to the store and the plan backend.
#[derive(Clone)]
pub struct PlanStore {
    state: Arc<RwLock<StoreState>>,
    plans: Arc<dyn PlanService>,
}

impl PlanStore {
    pub fn new(plans: Arc<dyn PlanService>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::new())),
            plans,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().await
    }

    /// Owned copy of the whole state, for rendering.
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Set the active user. A different id clears per-user state and reloads.
    pub async fn set_user(&self, user_id: &str) -> Result<UserSwitch, ClientError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(mety_core::ValidationError::RequiredFieldMissing { field: "user_id" }.into());
        }
        let switched = self.state.write().await.switch_user(user_id);
        if !switched {
            return Ok(UserSwitch::Unchanged);
        }
        tracing::info!(user_id, "active user changed");
        let report = self.load_plans().await?;
        Ok(UserSwitch::Switched(report))
    }

    /// Fetch plans for the active user and replace local plan state.
    pub async fn load_plans(&self) -> Result<ReloadReport, ClientError> {
        let (user_id, ticket) = {
            let mut state = self.state.write().await;
            let user_id = state.active_user()?.to_string();
            (user_id, state.begin(Operation::LoadPlans))
        };
        tracing::debug!(%user_id, generation = ticket.generation, "loading plans");

        let result = self.plans.get_plan(&user_id).await;
        let mut state = self.state.write().await;
        match result {
            Ok(response) => Ok(state.apply_plans(ticket, response)),
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "failed to load plans");
                state.fail(ticket, &err);
                Err(err.into())
            }
        }
    }

    /// Send a diff to the backend and merge the returned target plan.
    /// Returns false when the response was superseded.
    pub async fn update_target_plan(&self, diff: PlanDiff) -> Result<bool, ClientError> {
        let (user_id, ticket) = {
            let mut state = self.state.write().await;
            let user_id = state.active_user()?.to_string();
            (user_id, state.begin(Operation::UpdateTarget))
        };
        tracing::debug!(%user_id, keys = diff.len(), "updating target plan");

        let request = UpdatePlanRequest { user_id, diff };
        let result = self
            .plans
            .update_plan(&request)
            .await
            .and_then(|response| accepted(PLAN_SERVICE, response.ok, response));
        let mut state = self.state.write().await;
        match result {
            Ok(response) => Ok(state.apply_target_update(ticket, &request.diff, &response)),
            Err(err) => {
                tracing::warn!(user_id = %request.user_id, error = %err, "failed to update target plan");
                state.fail(ticket, &err);
                Err(err.into())
            }
        }
    }

    /// Ask the backend to fold the target into the current plan.
    pub async fn commit_target(&self) -> Result<(), ClientError> {
        let (user_id, ticket) = {
            let mut state = self.state.write().await;
            let user_id = state.active_user()?.to_string();
            (user_id, state.begin(Operation::UpdateTarget))
        };
        let result = self
            .plans
            .apply_target_to_current(&user_id)
            .await
            .and_then(|ack| accepted(PLAN_SERVICE, ack.ok, ack));
        let mut state = self.state.write().await;
        match result {
            Ok(_) => {
                state.complete(ticket);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "failed to apply target to current");
                state.fail(ticket, &err);
                Err(err.into())
            }
        }
    }

    /// Merge a detected diff into the target locally, then persist the same diff.
    pub async fn apply_extracted_locally(&self, diff: &PlanDiff) -> Result<SyncOutcome, ClientError> {
        let user_id = self.state.write().await.merge_target_locally(diff)?;
        Ok(self.persist_local(user_id, diff.clone()).await)
    }

    /// Merge a suggested plan into the target locally, then persist the merged
    /// target. Zeros are only sent for keys the suggestion itself names.
    pub async fn apply_recommended_locally(
        &self,
        suggested: &PlanDiff,
    ) -> Result<SyncOutcome, ClientError> {
        let explicit: BTreeSet<String> = suggested.keys().map(str::to_string).collect();
        let (user_id, outbound) = {
            let mut state = self.state.write().await;
            let user_id = state.merge_target_locally(suggested)?;
            (user_id, state.target_plan.sendable(&explicit))
        };
        Ok(self.persist_local(user_id, outbound).await)
    }

    async fn persist_local(&self, user_id: String, diff: PlanDiff) -> SyncOutcome {
        let request = UpdatePlanRequest { user_id, diff };
        let result = self
            .plans
            .update_plan(&request)
            .await
            .and_then(|response| accepted(PLAN_SERVICE, response.ok, response));
        match result {
            Ok(_) => {
                let mut state = self.state.write().await;
                if state.user_id() == Some(request.user_id.as_str()) {
                    state.acknowledge(&request.diff);
                }
                SyncOutcome::Synced
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %request.user_id,
                    keys = request.diff.len(),
                    error = %err,
                    "local plan change not persisted"
                );
                SyncOutcome::Pending(err)
            }
        }
    }

    pub async fn submit_onboarding(
        &self,
        request: OnboardingSubmitRequest,
    ) -> Result<OnboardingSubmitResponse, ClientError> {
        let ticket = self.state.write().await.begin(Operation::FormSubmit);
        let result = self
            .plans
            .submit_onboarding(&request)
            .await
            .and_then(|response| accepted(PLAN_SERVICE, response.ok, response));
        let mut state = self.state.write().await;
        match result {
            Ok(response) => {
                state.complete(ticket);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(user_id = %request.user_id, page = %request.page, error = %err, "onboarding submit failed");
                state.fail(ticket, &err);
                Err(err.into())
            }
        }
    }

    pub async fn submit_log(&self, request: LogSubmitRequest) -> Result<LogSubmitResponse, ClientError> {
        let ticket = self.state.write().await.begin(Operation::FormSubmit);
        let result = self
            .plans
            .submit_log(&request)
            .await
            .and_then(|response| accepted(PLAN_SERVICE, response.ok, response));
        let mut state = self.state.write().await;
        match result {
            Ok(response) => {
                state.complete(ticket);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(user_id = %request.user_id, error = %err, "log submit failed");
                state.fail(ticket, &err);
                Err(err.into())
            }
        }
    }

    /// Wipe the chat history on the backend, then locally.
    pub async fn clear_chat_history(&self) -> Result<(), ClientError> {
        let (user_id, ticket) = {
            let mut state = self.state.write().await;
            let user_id = state.active_user()?.to_string();
            (user_id, state.begin(Operation::ClearChat))
        };
        let result = self
            .plans
            .clear_chat_history(&user_id)
            .await
            .and_then(|ack| accepted(CHAT_SERVICE, ack.ok, ack));
        let mut state = self.state.write().await;
        match result {
            Ok(_) => {
                state.clear_chat(ticket);
                tracing::info!(%user_id, "chat history cleared");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "failed to clear chat history");
                state.fail(ticket, &err);
                state.alert("Failed to clear chat history. Please try again.");
                Err(err.into())
            }
        }
    }

    pub async fn reset_target_to_optimal(&self) {
        self.state.write().await.reset_target_to_optimal();
    }

    pub async fn set_plans(
        &self,
        current: PlanSnapshot,
        target: PlanSnapshot,
        optimal: PlanSnapshot,
    ) {
        self.state.write().await.set_plans(current, target, optimal);
    }

    pub async fn record_chat_message(
        &self,
        role: ChatRole,
        text: impl Into<String>,
    ) -> Result<TurnId, ClientError> {
        self.state.write().await.record_chat_message(role, text)
    }

    pub async fn set_latest_chat_response(
        &self,
        diff_detected: Option<PlanDiff>,
        suggested_plan: Option<PlanDiff>,
    ) {
        self.state
            .write()
            .await
            .set_latest_chat_response(diff_detected, suggested_plan);
    }

    pub async fn set_lifespan_projection(&self, projection: Option<LifespanProjection>) {
        self.state.write().await.set_lifespan_projection(projection);
    }

    pub async fn alert(&self, message: impl Into<String>) {
        self.state.write().await.alert(message);
    }

    pub async fn notify(&self, notification: Notification) {
        self.state.write().await.notify(notification);
    }

    pub async fn drain_notifications(&self) -> Vec<Notification> {
        self.state.write().await.drain_notifications()
    }

    pub async fn restore(&self, persisted: PersistedState) {
        self.state.write().await.restore(persisted);
    }

    pub async fn to_persisted(&self) -> PersistedState {
        self.state.read().await.to_persisted()
    }
}

/// Turn an `ok: false` body into [`ServiceError::Rejected`].
fn accepted<T>(service: &'static str, ok: bool, value: T) -> Result<T, ServiceError> {
    if ok {
        Ok(value)
    } else {
        Err(ServiceError::Rejected { service })
    }
}
