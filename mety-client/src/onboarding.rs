//! Onboarding pages: About Me, then supplements, diet and exercise.

use crate::error::ClientError;
use crate::store::PlanStore;
use mety_core::variables::{self, VariableGroup};
use mety_core::{
    OnboardingPage, OnboardingPayload, OnboardingSubmitRequest, PlanSnapshot, UserProfile,
    ValidationError,
};

/// Catalog group collected on each plan page.
pub fn page_group(page: OnboardingPage) -> Option<VariableGroup> {
    match page {
        OnboardingPage::AboutMe => None,
        OnboardingPage::Supplements => Some(VariableGroup::Supplements),
        OnboardingPage::Diet => Some(VariableGroup::Diet),
        OnboardingPage::Exercise => Some(VariableGroup::Exercise),
    }
}

/// Submits onboarding pages through the store.
#[derive(Clone)]
pub struct Onboarding {
    store: PlanStore,
}

impl Onboarding {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }

    /// Submit the About Me page. On success the profile is merged into the
    /// store so predictions can use the new age and gender.
    pub async fn submit_profile(&self, profile: UserProfile) -> Result<String, ClientError> {
        if profile.age.is_none() {
            return Err(ValidationError::RequiredFieldMissing { field: "age" }.into());
        }
        if profile.gender.is_none() {
            return Err(ValidationError::RequiredFieldMissing { field: "gender" }.into());
        }
        let saved = self
            .submit(OnboardingPage::AboutMe, OnboardingPayload::Profile(profile.clone()))
            .await?;
        self.store.write().await.merge_profile(&profile);
        Ok(saved)
    }

    /// Submit one of the plan pages. Only variables of that page's group are sent.
    pub async fn submit_plan_page(
        &self,
        page: OnboardingPage,
        values: &PlanSnapshot,
    ) -> Result<String, ClientError> {
        let group = page_group(page).ok_or_else(|| ValidationError::InvalidValue {
            field: "page",
            reason: format!("{page} is not a plan page"),
        })?;
        let payload: PlanSnapshot = variables::plan_variables()
            .filter(|v| v.group == group)
            .filter_map(|v| values.get(v.name).map(|value| (v.name, value)))
            .collect();
        let dropped = values.len() - payload.len();
        if dropped > 0 {
            tracing::debug!(%page, dropped, "ignoring values outside the page group");
        }
        self.submit(page, OnboardingPayload::Plan(payload)).await
    }

    async fn submit(&self, page: OnboardingPage, payload: OnboardingPayload) -> Result<String, ClientError> {
        let user_id = self.store.read().await.active_user()?.to_string();
        let request = OnboardingSubmitRequest {
            user_id,
            page,
            payload,
        };
        match self.store.submit_onboarding(request).await {
            Ok(response) => {
                tracing::info!(%page, saved_doc = %response.saved_doc, "onboarding page saved");
                Ok(response.saved_doc)
            }
            Err(err) => {
                self.store
                    .alert(format!("Failed to save {page}. Please try again."))
                    .await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_about_me_has_no_plan_group() {
        assert_eq!(page_group(OnboardingPage::AboutMe), None);
        assert_eq!(page_group(OnboardingPage::Diet), Some(VariableGroup::Diet));
    }
}
