//! Lifespan projection requests.
//!
//! Builds the prediction input from the store's plans and profile, calls the
//! prediction service and keeps the projection slot out of the loading state
//! whatever the outcome.

use crate::error::ClientError;
use crate::fence::Operation;
use crate::store::PlanStore;
use mety_core::variables;
use mety_core::{
    LifespanProjection, PlanSnapshot, PredictionInput, PredictionService, ProjectionSlot,
    UserProfile, ValidationError, AGE, GENDER,
};
use std::sync::Arc;

const AGE_MISSING: &str =
    "Age is required for predictions. Please complete the 'About Me' onboarding step.";
const GENDER_MISSING: &str =
    "Gender is required for predictions. Please complete the 'About Me' onboarding step.";
const PREDICTION_FAILED: &str = "Failed to calculate predictions. Please try again.";

/// Assemble the prediction input for `current` with `target` on top.
///
/// Only prediction variables with a known non-zero value are sent. Age must
/// be non-zero; gender may legitimately be 0. Both are resolved target first,
/// then current, then profile.
pub fn assemble_prediction_input(
    current: &PlanSnapshot,
    target: &PlanSnapshot,
    profile: &UserProfile,
) -> Result<PredictionInput, ValidationError> {
    let mut input = PredictionInput::new();
    for name in variables::prediction_variables() {
        let value = target
            .get(name)
            .filter(|v| *v != 0.0)
            .or_else(|| current.get(name).filter(|v| *v != 0.0));
        if let Some(value) = value {
            input.set(name, value);
        }
    }

    let age = [target.get(AGE), current.get(AGE), profile.age_value()]
        .into_iter()
        .flatten()
        .find(|v| *v != 0.0)
        .ok_or(ValidationError::RequiredFieldMissing { field: AGE })?;
    input.set(AGE, age);

    let gender = [target.get(GENDER), current.get(GENDER), profile.gender_value()]
        .into_iter()
        .flatten()
        .next()
        .ok_or(ValidationError::RequiredFieldMissing { field: GENDER })?;
    input.set(GENDER, gender);

    Ok(input)
}

/// User-facing text for a failed projection.
pub fn failure_message(err: &ClientError) -> String {
    match err {
        ClientError::Validation(ValidationError::RequiredFieldMissing { field: AGE }) => {
            AGE_MISSING.to_string()
        }
        ClientError::Validation(ValidationError::RequiredFieldMissing { field: GENDER }) => {
            GENDER_MISSING.to_string()
        }
        ClientError::Service(service) if service.is_timeout() => service.to_string(),
        _ => PREDICTION_FAILED.to_string(),
    }
}

#[derive(Clone)]
pub struct ProjectionRequester {
    store: PlanStore,
    prediction: Arc<dyn PredictionService>,
}

impl ProjectionRequester {
    pub fn new(store: PlanStore, prediction: Arc<dyn PredictionService>) -> Self {
        Self { store, prediction }
    }

    /// Reload plans, then request a fresh projection.
    ///
    /// On failure the last settled projection (or empty) is restored and a
    /// blocking alert is queued.
    pub async fn recalculate(&self) -> Result<LifespanProjection, ClientError> {
        let (previous, ticket) = {
            let mut state = self.store.write().await;
            state.active_user()?;
            let previous = state.begin_projection();
            (previous, state.begin(Operation::Prediction))
        };

        if let Err(err) = self.store.load_plans().await {
            tracing::warn!(error = %err, "plan reload before prediction failed; using cached plans");
        }

        let input = {
            let state = self.store.read().await;
            assemble_prediction_input(state.current_plan(), state.target_plan(), state.profile())
        };
        let result = match input {
            Ok(input) => {
                tracing::info!(variables = input.len(), "requesting lifespan projection");
                self.prediction.predict(&input).await.map_err(ClientError::from)
            }
            Err(err) => Err(err.into()),
        };

        let mut state = self.store.write().await;
        match result {
            Ok(projection) => {
                state.complete(ticket);
                state.settle_projection(ticket, ProjectionSlot::Ready(projection.clone()));
                tracing::info!(
                    lifespan = ?projection.lifespan_years(),
                    "lifespan projection updated"
                );
                Ok(projection)
            }
            Err(err) => {
                let restore = match &err {
                    ClientError::Validation(_) => ProjectionSlot::Empty,
                    _ => previous,
                };
                match &err {
                    ClientError::Service(service) => state.fail(ticket, service),
                    _ => state.complete(ticket),
                }
                if state.settle_projection(ticket, restore) {
                    state.alert(failure_message(&err));
                }
                tracing::warn!(error = %err, "lifespan projection failed");
                Err(err)
            }
        }
    }
}
