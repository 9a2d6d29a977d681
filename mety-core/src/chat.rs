//! Chat history types.

use crate::plan::PlanDiff;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Surrogate id of a chat turn, monotonically increasing within a session.
///
/// Chat-derived artifacts (suggested plans, inline projections) are keyed by
/// this id so two identical assistant replies never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub u64);

impl TurnId {
    pub fn next(self) -> TurnId {
        TurnId(self.0 + 1)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// One message in a user's chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub turn_id: TurnId,
    pub user_id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatActionKind {
    AskApplyChange,
}

/// An action proposed by the assistant that needs explicit user confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAction {
    #[serde(rename = "type")]
    pub kind: ChatActionKind,
    #[serde(default)]
    pub payload: PlanDiff,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let action: ChatAction =
            serde_json::from_str(r#"{"type": "ask_apply_change", "payload": {"cardio": 20}}"#).unwrap();
        assert_eq!(action.kind, ChatActionKind::AskApplyChange);
        assert_eq!(action.payload.get("cardio"), Some(20.0));
    }

    #[test]
    fn test_turn_ids_increase() {
        let first = TurnId(1);
        assert!(first.next() > first);
        assert_eq!(first.next().to_string(), "turn-2");
    }
}
