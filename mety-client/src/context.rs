//! Application context: every controller wired to one shared store.

use crate::api_client::{BackendClient, PredictionClient};
use crate::chat::ChatController;
use crate::commands::{Command, HELP};
use crate::config::{ChatConfig, ClientConfig};
use crate::error::ClientError;
use crate::logbook::AdherenceLogger;
use crate::onboarding::Onboarding;
use crate::plan_editor::PlanEditor;
use crate::projection::ProjectionRequester;
use crate::render;
use crate::store::{PlanStore, UserSwitch};
use mety_core::{ChatService, PlanService, PredictionService, UserProfile};
use std::sync::Arc;

/// Handles to the store and the controllers built on it.
#[derive(Clone)]
pub struct AppContext {
    pub store: PlanStore,
    pub chat: ChatController,
    pub projections: ProjectionRequester,
    pub plan_editor: PlanEditor,
    pub logs: AdherenceLogger,
    pub onboarding: Onboarding,
    backend: Option<BackendClient>,
}

/// Whether the session should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl AppContext {
    pub fn new(
        plans: Arc<dyn PlanService>,
        chat: Arc<dyn ChatService>,
        prediction: Arc<dyn PredictionService>,
        settings: ChatConfig,
    ) -> Self {
        let store = PlanStore::new(plans);
        Self {
            chat: ChatController::new(store.clone(), chat, settings),
            projections: ProjectionRequester::new(store.clone(), prediction),
            plan_editor: PlanEditor::new(store.clone()),
            logs: AdherenceLogger::new(store.clone()),
            onboarding: Onboarding::new(store.clone()),
            store,
            backend: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let backend = BackendClient::new(config)?;
        let prediction = PredictionClient::new(config)?;
        let mut context = Self::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Arc::new(prediction),
            config.chat,
        );
        context.backend = Some(backend);
        Ok(context)
    }

    /// Make `user_id` active, reloading plans even when it already was.
    pub async fn activate_user(&self, user_id: &str) -> Result<(), ClientError> {
        if self.store.set_user(user_id).await? == UserSwitch::Unchanged {
            self.store.load_plans().await?;
        }
        Ok(())
    }

    /// Run one command and return what to print.
    pub async fn execute(&self, command: Command) -> Result<(String, Flow), ClientError> {
        let output = match command {
            Command::Quit => return Ok((String::new(), Flow::Quit)),
            Command::Help => HELP.to_string(),
            Command::User(id) => {
                self.store.set_user(&id).await?;
                format!("Active user: {id}")
            }
            Command::Plan => render::plan_table(&self.plan_editor.rows().await),
            Command::Set { name, value } => {
                self.plan_editor.apply_single(&name, value).await?;
                render::plan_table(&self.plan_editor.rows().await)
            }
            Command::ResetOptimal => {
                self.plan_editor.reset_to_optimal().await;
                render::plan_table(&self.plan_editor.rows().await)
            }
            Command::SaveAll(values) => {
                let mut form = self.plan_editor.form().await;
                for (name, value) in &values {
                    form.set(name, *value)?;
                }
                self.plan_editor.save_all(&form).await?;
                render::plan_table(&self.plan_editor.rows().await)
            }
            Command::Chat(message) => {
                let outcome = self.chat.send(&message).await?;
                let state = self.store.read().await;
                let mut out = render::chat_history(state.chat());
                if !outcome.unknown_keys.is_empty() {
                    out.push_str(&format!(
                        "\n(ignored unknown variables: {})",
                        outcome.unknown_keys.join(", ")
                    ));
                }
                for outcome in [&outcome.extracted, &outcome.recommended].into_iter().flatten() {
                    if !outcome.is_synced() {
                        out.push_str("\n(change applied locally, not yet saved)");
                    }
                }
                out
            }
            Command::ApplyPending => match self.chat.apply_pending_action().await? {
                true => "Change applied.".to_string(),
                false => "Nothing pending.".to_string(),
            },
            Command::IgnorePending => match self.chat.ignore_pending_action().await {
                true => "Change ignored.".to_string(),
                false => "Nothing pending.".to_string(),
            },
            Command::ApplyExtracted => match self.plan_editor.apply_latest_extracted().await? {
                true => render::plan_table(&self.plan_editor.rows().await),
                false => "No detected changes to apply.".to_string(),
            },
            Command::ApplyRecommended => match self.plan_editor.apply_latest_recommended().await? {
                true => render::plan_table(&self.plan_editor.rows().await),
                false => "No recommended plan to apply.".to_string(),
            },
            Command::ToggleSuggestion(turn) => {
                self.chat.toggle_suggestion(turn).await;
                render::chat_history(self.store.read().await.chat())
            }
            Command::History => render::chat_history(self.store.read().await.chat()),
            Command::ClearChat => {
                self.chat.clear_history().await?;
                "Chat history cleared.".to_string()
            }
            Command::Predict => render::projection(&self.projections.recalculate().await?),
            Command::Log { start, end, values } => {
                let mut form = self.logs.new_form().await;
                form.set_period_str(&start, &end)?;
                for (name, value) in &values {
                    form.set(name, *value)?;
                }
                let entry = self.logs.submit(&form).await?;
                render::log_entry(&entry)
            }
            Command::AboutMe { age, gender, name } => {
                let profile = UserProfile {
                    name,
                    age: Some(age),
                    gender: Some(gender),
                };
                let saved = self.onboarding.submit_profile(profile).await?;
                format!("Saved About Me ({saved}).")
            }
            Command::Onboard { page, values } => {
                let saved = self.onboarding.submit_plan_page(page, &values).await?;
                format!("Saved {page} ({saved}).")
            }
            Command::Health => match &self.backend {
                Some(backend) => format!("backend: {}", backend.health().await?.status),
                None => "backend: not configured".to_string(),
            },
        };
        Ok((output, Flow::Continue))
    }
}
