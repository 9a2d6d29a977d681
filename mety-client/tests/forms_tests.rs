mod common;

use chrono::NaiveDate;
use common::{loaded, manual, USER};
use mety_client::error::ClientError;
use mety_client::notifications::NotificationLevel;
use mety_core::{
    Adherence, Gender, OnboardingPage, OnboardingPayload, PlanSnapshot, UserProfile, AGE,
    ValidationError,
};
use mety_test_utils::assertions::{assert_plan_lacks, assert_plan_value};
use mety_test_utils::{fixtures, PlanCall, RecordedCall};

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

// ============================================================================
// ADHERENCE LOGS
// ============================================================================

#[tokio::test]
async fn log_form_is_prefilled_from_current_plan() {
    let h = loaded(manual()).await;
    let form = h.ctx.logs.new_form().await;
    assert_eq!(form.value("cardio"), Some(10.0));
    assert_eq!(form.value("water"), Some(1500.0));
    assert_eq!(form.value(AGE), None);
}

#[tokio::test]
async fn log_submission_records_entry_and_reports_adherence() {
    let h = loaded(manual()).await;
    h.plans.set_adherence(Adherence {
        total: 0.73,
        diet: 0.5,
        supplement: 1.0,
    });
    let mut form = h.ctx.logs.new_form().await;
    form.set("cardio", 12.0).unwrap();
    form.set_period_str("2024-03-01", "2024-03-07").unwrap();

    let entry = h.ctx.logs.submit(&form).await.unwrap();
    assert_eq!(entry.log_id, "log-1");
    assert_eq!(entry.period_start, date("2024-03-01"));

    let stored = h.plans.user(USER).unwrap().logs;
    assert_plan_value(&stored[0].log, "cardio", 12.0);
    assert_plan_value(&stored[0].log, "water", 1500.0);

    assert_eq!(h.ctx.store.read().await.log_book(), &[entry]);
    let notifications = h.ctx.store.drain_notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Success);
    assert_eq!(notifications[0].message, "Log submitted! Adherence: 73%");
}

#[tokio::test]
async fn log_without_period_is_rejected_locally() {
    let h = loaded(manual()).await;
    let form = h.ctx.logs.new_form().await;
    assert!(matches!(
        h.ctx.logs.submit(&form).await,
        Err(ClientError::Validation(ValidationError::RequiredFieldMissing {
            field: "period_start"
        }))
    ));
    assert_eq!(h.plans.call_count(PlanCall::SubmitLog), 0);
}

#[tokio::test]
async fn reversed_period_is_rejected() {
    let h = loaded(manual()).await;
    let mut form = h.ctx.logs.new_form().await;
    form.set_period(date("2024-03-07"), date("2024-03-01"));
    assert!(h.ctx.logs.submit(&form).await.is_err());
    assert_eq!(h.plans.call_count(PlanCall::SubmitLog), 0);
}

#[tokio::test]
async fn log_rejects_unknown_and_negative_values() {
    let h = loaded(manual()).await;
    let mut form = h.ctx.logs.new_form().await;
    assert!(form.set("not_a_variable", 1.0).is_err());
    assert!(form.set(AGE, 40.0).is_err());
    assert!(form.set("water", -1.0).is_err());
    assert!(form.set("water", f64::NAN).is_err());
    assert_eq!(form.value("water"), Some(1500.0));
}

#[tokio::test]
async fn failed_log_alerts_and_keeps_log_book() {
    let h = loaded(manual()).await;
    h.plans
        .fail(PlanCall::SubmitLog, fixtures::server_error("plan service"));
    let mut form = h.ctx.logs.new_form().await;
    form.set_period_str("2024-03-01", "2024-03-07").unwrap();

    assert!(h.ctx.logs.submit(&form).await.is_err());
    assert!(h.ctx.store.read().await.log_book().is_empty());
    let notifications = h.ctx.store.drain_notifications().await;
    assert!(notifications
        .iter()
        .any(|n| n.blocking && n.message == "Failed to submit log. Please try again."));
}

// ============================================================================
// ONBOARDING
// ============================================================================

#[tokio::test]
async fn about_me_updates_profile_used_for_predictions() {
    let h = loaded(manual()).await;
    let profile = UserProfile {
        name: Some("Ada".to_string()),
        age: Some(50),
        gender: Some(Gender::Female),
    };

    let saved = h.ctx.onboarding.submit_profile(profile.clone()).await.unwrap();
    assert_eq!(saved, "u1/About Me");
    assert_eq!(h.ctx.store.read().await.profile().age, Some(50));

    let calls = h.plans.calls();
    let Some(RecordedCall::Onboarding(request)) = calls.last() else {
        panic!("expected an onboarding call, got {calls:?}");
    };
    assert_eq!(request.page, OnboardingPage::AboutMe);
    assert_eq!(request.payload, OnboardingPayload::Profile(profile));
}

#[tokio::test]
async fn about_me_requires_age_and_gender() {
    let h = loaded(manual()).await;
    let result = h
        .ctx
        .onboarding
        .submit_profile(UserProfile {
            age: Some(50),
            ..UserProfile::default()
        })
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::RequiredFieldMissing { field: "gender" }))
    ));
    assert_eq!(h.plans.call_count(PlanCall::Onboarding), 0);
}

#[tokio::test]
async fn plan_page_sends_only_its_group() {
    let h = loaded(manual()).await;
    let values = PlanSnapshot::from([("cardio", 20.0), ("water", 2000.0), ("alcohol", 2.0)]);

    let saved = h
        .ctx
        .onboarding
        .submit_plan_page(OnboardingPage::Exercise, &values)
        .await
        .unwrap();
    assert_eq!(saved, "u1/My Exercise");

    let calls = h.plans.calls();
    let Some(RecordedCall::Onboarding(request)) = calls.last() else {
        panic!("expected an onboarding call, got {calls:?}");
    };
    let OnboardingPayload::Plan(sent) = &request.payload else {
        panic!("expected a plan payload");
    };
    assert_plan_value(sent, "cardio", 20.0);
    assert_plan_value(sent, "water", 2000.0);
    assert_plan_lacks(sent, "alcohol");
}

#[tokio::test]
async fn about_me_is_not_a_plan_page() {
    let h = loaded(manual()).await;
    assert!(h
        .ctx
        .onboarding
        .submit_plan_page(OnboardingPage::AboutMe, &PlanSnapshot::new())
        .await
        .is_err());
    assert_eq!(h.plans.call_count(PlanCall::Onboarding), 0);
}

#[tokio::test]
async fn failed_page_names_the_page_in_alert() {
    let h = loaded(manual()).await;
    h.plans.reject(PlanCall::Onboarding);

    assert!(h
        .ctx
        .onboarding
        .submit_plan_page(OnboardingPage::Diet, &PlanSnapshot::from([("alcohol", 1.0)]))
        .await
        .is_err());
    let notifications = h.ctx.store.drain_notifications().await;
    assert!(notifications
        .iter()
        .any(|n| n.message == "Failed to save My Diet. Please try again."));
}
