//! Chat interaction controller.
//!
//! Drives one conversational turn end to end: records the user message,
//! calls the chat service, stores the reply and its artifacts, and applies
//! extracted or recommended plan changes according to the chat settings.

use crate::config::ChatConfig;
use crate::error::ClientError;
use crate::fence::Operation;
use crate::store::{PlanStore, SyncOutcome};
use mety_core::variables;
use mety_core::{ChatOptions, ChatRequest, ChatRole, ChatService, PlanSnapshot, TurnId, ValidationError};
use std::sync::Arc;

pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";
const APPLY_FAILED: &str = "Failed to apply change. Please try again.";

/// What a completed turn produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// `None` when the active user changed before the reply arrived.
    pub assistant_turn: Option<TurnId>,
    pub has_pending_action: bool,
    pub extracted: Option<SyncOutcome>,
    pub recommended: Option<SyncOutcome>,
    pub unknown_keys: Vec<String>,
}

/// One row of a suggested plan as shown under an assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRow {
    pub name: &'static str,
    pub value: f64,
    pub unit: &'static str,
}

/// Non-zero prediction variables of a suggested plan, sorted by name.
pub fn suggestion_rows(plan: &PlanSnapshot) -> Vec<SuggestionRow> {
    let mut rows: Vec<SuggestionRow> = plan
        .iter()
        .filter(|(_, value)| *value != 0.0)
        .filter_map(|(name, value)| {
            variables::lookup(name)
                .filter(|v| v.prediction_input)
                .map(|v| SuggestionRow {
                    name: v.name,
                    value,
                    unit: v.unit,
                })
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(b.name));
    rows
}

#[derive(Clone)]
pub struct ChatController {
    store: PlanStore,
    chat: Arc<dyn ChatService>,
    settings: ChatConfig,
}

impl ChatController {
    pub fn new(store: PlanStore, chat: Arc<dyn ChatService>, settings: ChatConfig) -> Self {
        Self {
            store,
            chat,
            settings,
        }
    }

    pub fn settings(&self) -> ChatConfig {
        self.settings
    }

    pub fn set_settings(&mut self, settings: ChatConfig) {
        self.settings = settings;
    }

    /// Send one user message and process the reply.
    pub async fn send(&self, input: &str) -> Result<TurnOutcome, ClientError> {
        let message = input.trim();
        if message.is_empty() {
            return Err(ValidationError::RequiredFieldMissing { field: "message" }.into());
        }

        let (user_id, ticket) = {
            let mut state = self.store.write().await;
            let user_id = state.active_user()?.to_string();
            state.record_chat_message(ChatRole::User, message)?;
            state.take_pending_action();
            (user_id, state.begin(Operation::ChatTurn))
        };

        let request = ChatRequest {
            user_id,
            message: message.to_string(),
            options: ChatOptions {
                auto_apply_extracted_vars: self.settings.auto_apply_extracted_vars,
            },
        };
        tracing::debug!(user_id = %request.user_id, "sending chat message");

        let response = match self.chat.send_message(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(user_id = %request.user_id, error = %err, "chat request failed");
                let mut state = self.store.write().await;
                if state.is_same_user(ticket) {
                    state.fail(ticket, &err);
                    state.record_chat_message(ChatRole::Assistant, ERROR_REPLY)?;
                } else {
                    state.complete(ticket);
                }
                return Err(err.into());
            }
        };

        if let Some(extracted) = &response.vars_extracted {
            tracing::debug!(keys = extracted.len(), "chat extracted variables");
        }
        if !response.unknown_keys.is_empty() {
            tracing::info!(keys = ?response.unknown_keys, "chat returned unknown plan keys");
        }

        let (assistant_turn, has_pending_action) = {
            let mut state = self.store.write().await;
            let turn = state.complete_chat_turn(
                ticket,
                &response,
                self.settings.auto_apply_extracted_vars,
            );
            (turn, state.chat().pending_action().is_some())
        };
        let mut outcome = TurnOutcome {
            assistant_turn,
            has_pending_action,
            unknown_keys: response.unknown_keys.clone(),
            ..TurnOutcome::default()
        };
        if assistant_turn.is_none() {
            return Ok(outcome);
        }

        if self.settings.auto_apply_extracted_vars {
            if let Some(diff) = response.detected_diff() {
                tracing::info!(keys = diff.len(), "auto-applying extracted variables");
                outcome.extracted = Some(self.store.apply_extracted_locally(diff).await?);
            }
        }
        if self.settings.auto_apply_recommended {
            if let Some(suggested) = response.suggested_diff() {
                tracing::info!(keys = suggested.len(), "auto-applying recommended plan");
                outcome.recommended = Some(self.store.apply_recommended_locally(suggested).await?);
            }
        }
        Ok(outcome)
    }

    /// Apply the held action: persist its payload, then reload plans.
    /// Returns false when nothing was pending.
    pub async fn apply_pending_action(&self) -> Result<bool, ClientError> {
        let Some(action) = self.store.read().await.chat().pending_action().cloned() else {
            return Ok(false);
        };
        let result = async {
            self.store.update_target_plan(action.payload.clone()).await?;
            self.store.load_plans().await?;
            Ok::<(), ClientError>(())
        }
        .await;
        match result {
            Ok(()) => {
                self.store.write().await.take_pending_action();
                tracing::info!(keys = action.payload.len(), "applied pending chat action");
                Ok(true)
            }
            Err(err) => {
                self.store.alert(APPLY_FAILED).await;
                Err(err)
            }
        }
    }

    /// Drop the held action without touching any plan.
    pub async fn ignore_pending_action(&self) -> bool {
        self.store.write().await.take_pending_action().is_some()
    }

    /// Show or hide the full suggested plan under an assistant turn.
    pub async fn toggle_suggestion(&self, turn: TurnId) -> bool {
        self.store.write().await.chat_mut().toggle_expanded(turn)
    }

    pub async fn clear_history(&self) -> Result<(), ClientError> {
        self.store.clear_chat_history().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_rows_filter_and_sort() {
        let plan = PlanSnapshot::from([
            ("water", 2000.0),
            ("cardio", 30.0),
            ("alcohol", 0.0),
            ("vitamin_d", 1000.0),
        ]);
        let rows = suggestion_rows(&plan);
        let names: Vec<_> = rows.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["cardio", "water"]);
        assert_eq!(rows[1].unit, "ml/day");
    }
}
