mod common;

use common::{harness, loaded, manual};
use mety_client::error::ClientError;
use mety_core::{
    Gender, LifespanProjection, PlanSnapshot, ProjectionSlot, ServiceError, UserProfile, AGE,
    GENDER,
};
use mety_test_utils::assertions::{assert_plan_lacks, assert_plan_value};
use mety_test_utils::{fixtures, MockUser, PlanCall};

fn alerts(notifications: &[mety_client::notifications::Notification]) -> Vec<&str> {
    notifications
        .iter()
        .filter(|n| n.blocking)
        .map(|n| n.message.as_str())
        .collect()
}

#[tokio::test]
async fn recalculate_reloads_then_predicts() {
    let h = loaded(manual()).await;
    h.plans.edit_user("u1", |u| u.target.set("cardio", 30.0));

    let projection = h.ctx.projections.recalculate().await.unwrap();
    assert_eq!(projection, fixtures::projection());
    assert_eq!(h.plans.call_count(PlanCall::GetPlan), 2);

    let input = h.prediction.inputs().pop().unwrap();
    assert_plan_value(&input, "cardio", 30.0);
    assert_plan_value(&input, "water", 1500.0);
    assert_plan_value(&input, AGE, 45.0);
    assert_plan_value(&input, GENDER, 1.0);
    assert_plan_lacks(&input, "vitamin_d");

    let state = h.ctx.store.read().await;
    assert_eq!(state.projection(), &ProjectionSlot::Ready(fixtures::projection()));
    assert!(!state.is_loading());
}

#[tokio::test]
async fn reload_failure_still_predicts_from_cached_plans() {
    let h = loaded(manual()).await;
    h.plans.fail(PlanCall::GetPlan, fixtures::server_error("plan service"));

    assert!(h.ctx.projections.recalculate().await.is_ok());
    assert_plan_value(&h.prediction.inputs()[0], "cardio", 10.0);
}

#[tokio::test]
async fn missing_age_skips_the_request() {
    let h = harness(manual());
    h.plans.put_user(
        "u3",
        MockUser {
            profile: Some(UserProfile {
                gender: Some(Gender::Male),
                ..UserProfile::default()
            }),
            current: PlanSnapshot::from([("cardio", 12.0)]),
            ..MockUser::default()
        },
    );
    h.ctx.store.set_user("u3").await.unwrap();

    let result = h.ctx.projections.recalculate().await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert!(h.prediction.inputs().is_empty());
    assert_eq!(h.ctx.store.read().await.projection(), &ProjectionSlot::Empty);
    let notifications = h.ctx.store.drain_notifications().await;
    assert_eq!(
        alerts(&notifications),
        vec!["Age is required for predictions. Please complete the 'About Me' onboarding step."]
    );
}

#[tokio::test]
async fn zero_gender_is_a_valid_input() {
    let h = harness(manual());
    h.plans.put_user(
        "u4",
        MockUser {
            profile: Some(UserProfile {
                age: Some(60),
                gender: Some(Gender::Male),
                ..UserProfile::default()
            }),
            ..MockUser::default()
        },
    );
    h.ctx.store.set_user("u4").await.unwrap();

    h.ctx.projections.recalculate().await.unwrap();
    let input = h.prediction.inputs().pop().unwrap();
    assert_plan_value(&input, GENDER, 0.0);
    assert_plan_value(&input, AGE, 60.0);
}

#[tokio::test]
async fn timeout_restores_previous_projection() {
    let h = loaded(manual()).await;
    h.ctx.projections.recalculate().await.unwrap();
    h.prediction
        .set_result(Err(ServiceError::Timeout { after_secs: 120 }));

    let result = h.ctx.projections.recalculate().await;
    assert!(matches!(result, Err(ref err) if err.is_timeout()));

    let state = h.ctx.store.read().await;
    assert_eq!(state.projection(), &ProjectionSlot::Ready(fixtures::projection()));
    assert!(state.error().is_some());
    let notifications = state.notifications();
    assert!(alerts(notifications)
        .iter()
        .any(|m| m.starts_with("Prediction request timed out after 120 seconds")));
}

#[tokio::test]
async fn service_failure_uses_generic_message() {
    let h = loaded(manual()).await;
    h.prediction
        .set_result(Err(fixtures::server_error("prediction service")));

    assert!(h.ctx.projections.recalculate().await.is_err());
    let notifications = h.ctx.store.drain_notifications().await;
    assert_eq!(
        alerts(&notifications),
        vec!["Failed to calculate predictions. Please try again."]
    );
    assert_eq!(h.ctx.store.read().await.projection(), &ProjectionSlot::Empty);
}

#[tokio::test]
async fn slower_older_projection_is_dropped() {
    let h = loaded(manual()).await;
    let older_projection = LifespanProjection {
        all_cause_mortality_predicted_lifespan: Some(70.0),
        ..LifespanProjection::default()
    };
    h.prediction.set_result(Ok(older_projection));
    let gate = h.prediction.gate_next();
    let requester = h.ctx.projections.clone();
    let older = tokio::spawn(async move { requester.recalculate().await });
    h.prediction.wait_for_inputs(1).await;

    h.prediction.set_result(Ok(fixtures::projection()));
    h.ctx.projections.recalculate().await.unwrap();
    gate.open();
    older.await.unwrap().unwrap();

    let state = h.ctx.store.read().await;
    assert_eq!(state.projection(), &ProjectionSlot::Ready(fixtures::projection()));
    assert!(!state.is_loading());
}

#[tokio::test]
async fn failure_while_another_request_is_loading_restores_settled_projection() {
    let h = loaded(manual()).await;
    h.ctx.projections.recalculate().await.unwrap();

    h.prediction.set_result(Ok(LifespanProjection {
        all_cause_mortality_predicted_lifespan: Some(70.0),
        ..LifespanProjection::default()
    }));
    let gate = h.prediction.gate_next();
    let requester = h.ctx.projections.clone();
    let held = tokio::spawn(async move { requester.recalculate().await });
    h.prediction.wait_for_inputs(2).await;
    assert_eq!(h.ctx.store.read().await.projection(), &ProjectionSlot::Loading);

    h.prediction
        .set_result(Err(fixtures::server_error("prediction service")));
    assert!(h.ctx.projections.recalculate().await.is_err());
    assert_eq!(
        h.ctx.store.read().await.projection(),
        &ProjectionSlot::Ready(fixtures::projection())
    );

    gate.open();
    held.await.unwrap().unwrap();
    let state = h.ctx.store.read().await;
    assert_eq!(state.projection(), &ProjectionSlot::Ready(fixtures::projection()));
    assert!(!state.is_loading());
}

#[tokio::test]
async fn projection_requires_a_user() {
    let h = harness(manual());
    assert!(matches!(
        h.ctx.projections.recalculate().await,
        Err(ClientError::NoActiveUser)
    ));
    assert_eq!(h.ctx.store.read().await.projection(), &ProjectionSlot::Empty);
}
