#![allow(dead_code)]

use mety_client::config::ChatConfig;
use mety_client::context::AppContext;
use mety_test_utils::{fixtures, MockChatService, MockPlanService, MockPredictionService};
use std::sync::Arc;

pub const USER: &str = "u1";

/// An [`AppContext`] wired to in-memory services the test can inspect.
pub struct Harness {
    pub plans: MockPlanService,
    pub chat: MockChatService,
    pub prediction: MockPredictionService,
    pub ctx: AppContext,
}

pub fn harness(settings: ChatConfig) -> Harness {
    let plans = MockPlanService::new().with_user(USER, fixtures::seeded_user());
    let chat = MockChatService::new();
    let prediction = MockPredictionService::new();
    let ctx = AppContext::new(
        Arc::new(plans.clone()),
        Arc::new(chat.clone()),
        Arc::new(prediction.clone()),
        settings,
    );
    Harness {
        plans,
        chat,
        prediction,
        ctx,
    }
}

/// Harness with `USER` active and plans loaded.
pub async fn loaded(settings: ChatConfig) -> Harness {
    let h = harness(settings);
    h.ctx.store.set_user(USER).await.unwrap();
    h
}

pub fn manual() -> ChatConfig {
    ChatConfig {
        auto_apply_extracted_vars: false,
        auto_apply_recommended: false,
    }
}

pub fn auto_extract() -> ChatConfig {
    ChatConfig {
        auto_apply_extracted_vars: true,
        auto_apply_recommended: false,
    }
}

pub fn auto_recommend() -> ChatConfig {
    ChatConfig {
        auto_apply_extracted_vars: false,
        auto_apply_recommended: true,
    }
}
