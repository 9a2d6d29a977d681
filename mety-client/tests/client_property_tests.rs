use mety_client::commands::{parse_line, Command};
use mety_client::config::{ChatConfig, ClientConfig, LogConfig, LogFormat};
use mety_client::fence::Operation;
use mety_client::plan_editor::PlanForm;
use mety_client::projection::assemble_prediction_input;
use mety_client::store::StoreState;
use mety_core::{effective_plan, variables, GetPlanResponse, PlanSnapshot, AGE, GENDER};
use mety_test_utils::generators::{
    arb_chat_response, arb_plan, arb_plan_variable, arb_profile, arb_value,
};
use proptest::prelude::*;

fn base_config() -> ClientConfig {
    ClientConfig {
        backend_base_url: "http://localhost:8000".to_string(),
        prediction_url: "https://predict.example.com/predict".to_string(),
        request_timeout_ms: 10_000,
        prediction_timeout_secs: 120,
        persistence_path: "tmp/mety-session.json".into(),
        log: LogConfig {
            format: LogFormat::Pretty,
            filter: None,
        },
        chat: ChatConfig::default(),
    }
}

fn plan_response(user_id: &str, marker: f64) -> GetPlanResponse {
    GetPlanResponse {
        user_id: user_id.to_string(),
        profile: None,
        current_plan: Some(PlanSnapshot::from([("cardio", marker)])),
        target_plan: None,
        optimal_plan: None,
        last_updated: None,
    }
}

#[test]
fn config_rejects_non_http_backend() {
    let mut config = base_config();
    config.backend_base_url = "ws://localhost:8000".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn config_rejects_blank_log_filter() {
    let mut config = base_config();
    config.log.filter = Some("  ".to_string());
    assert!(config.validate().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Effective plan
    // ========================================================================

    /// Property: every target key wins, every other current key shows through.
    #[test]
    fn effective_plan_overlays_target(current in arb_plan(), target in arb_plan()) {
        let effective = effective_plan(&current, &target);
        for (key, value) in target.iter() {
            prop_assert_eq!(effective.get(key), Some(value));
        }
        for (key, value) in current.iter() {
            if !target.contains(key) {
                prop_assert_eq!(effective.get(key), Some(value));
            }
        }
        prop_assert!(effective.keys().all(|k| current.contains(k) || target.contains(k)));
    }

    // ========================================================================
    // Save diff
    // ========================================================================

    /// Property: untouched zeros are never sent, touched values always are.
    #[test]
    fn build_diff_respects_touched_fields(
        seed in arb_plan(),
        stored in arb_plan(),
        edits in prop::collection::vec((arb_plan_variable(), arb_value()), 0..6),
    ) {
        let mut form = PlanForm::from_plan(&seed);
        for (name, value) in &edits {
            form.set(name, *value).unwrap();
        }
        let diff = form.build_diff(&stored);

        for (key, value) in diff.iter() {
            if value == 0.0 {
                prop_assert!(form.is_touched(key), "untouched zero {} was sent", key);
            }
        }
        for (name, _) in &edits {
            prop_assert_eq!(diff.get(name), form.value(name));
        }
        for (key, value) in stored.non_zero().iter() {
            if !form.is_touched(key) && seed.get(key).map_or(true, |v| v == 0.0) {
                prop_assert_eq!(diff.get(key), Some(value));
            }
        }
    }

    // ========================================================================
    // Prediction input
    // ========================================================================

    /// Property: input only carries prediction variables, with a non-zero age.
    #[test]
    fn prediction_input_is_a_valid_subset(
        current in arb_plan(),
        target in arb_plan(),
        profile in arb_profile(),
    ) {
        match assemble_prediction_input(&current, &target, &profile) {
            Ok(input) => {
                prop_assert!(input.keys().all(variables::is_prediction_variable));
                prop_assert!(input.get(AGE).is_some_and(|age| age != 0.0));
                prop_assert!(input.contains(GENDER));
                for (key, value) in input.iter() {
                    if key != AGE && key != GENDER {
                        prop_assert!(value != 0.0);
                        let expected = target.get(key).filter(|v| *v != 0.0).or(current.get(key));
                        prop_assert_eq!(Some(value), expected);
                    }
                }
            }
            Err(_) => {
                prop_assert!(profile.age.is_none() || profile.gender.is_none());
            }
        }
    }

    // ========================================================================
    // Request fencing
    // ========================================================================

    /// Property: whatever order reloads complete in, only the newest one lands.
    #[test]
    fn only_latest_reload_applies(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
        let mut state = StoreState::new();
        state.switch_user("u1");
        let tickets: Vec<_> = (0..6).map(|_| state.begin(Operation::LoadPlans)).collect();

        for index in order {
            let report = state.apply_plans(tickets[index], plan_response("u1", index as f64 + 1.0));
            prop_assert_eq!(report.applied, index == 5);
        }
        prop_assert_eq!(state.current_plan().get("cardio"), Some(6.0));
        prop_assert!(!state.is_loading());
    }

    /// Property: each assistant turn keeps its own suggested plan and projection.
    #[test]
    fn chat_artifacts_are_keyed_by_turn(
        current in arb_plan(),
        first in arb_chat_response(),
        second in arb_chat_response(),
    ) {
        let mut state = StoreState::new();
        state.switch_user("u1");
        state.set_plans(current, PlanSnapshot::new(), PlanSnapshot::new());

        let mut turns = Vec::new();
        for response in [&first, &second] {
            let ticket = state.begin(Operation::ChatTurn);
            let turn = state.complete_chat_turn(ticket, response, false);
            prop_assert!(turn.is_some());
            turns.push(turn.unwrap());
        }
        prop_assert!(turns[0] < turns[1]);

        for (turn, response) in turns.iter().zip([&first, &second]) {
            let expected = response
                .suggested_diff()
                .map(|suggested| state.current_plan().overlay(suggested));
            prop_assert_eq!(state.chat().suggested_plan(*turn).cloned(), expected);
            prop_assert_eq!(
                state.chat().inline_projection(*turn),
                response.lifespan_projection.as_ref()
            );
        }
        prop_assert_eq!(state.latest_chat().suggested_plan.as_ref(), second.suggested_diff());
    }

    // ========================================================================
    // Config and commands
    // ========================================================================

    /// Property: any positive timeouts validate.
    #[test]
    fn positive_timeouts_validate(request_ms in 1u64..600_000, prediction_secs in 1u64..600) {
        let mut config = base_config();
        config.request_timeout_ms = request_ms;
        config.prediction_timeout_secs = prediction_secs;
        prop_assert!(config.validate().is_ok());
    }

    /// Property: chat text survives the command parser untouched.
    #[test]
    fn chat_command_keeps_message(message in "[a-zA-Z0-9,.?]{1,10}( [a-zA-Z0-9,.?]{1,10}){0,5}") {
        let parsed = parse_line(&format!("chat  {message} ")).unwrap();
        prop_assert_eq!(parsed, Some(Command::Chat(message)));
    }
}
