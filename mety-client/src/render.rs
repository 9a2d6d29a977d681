//! Plain-text rendering of store state for the terminal.

use crate::chat::suggestion_rows;
use crate::logbook::LogEntry;
use crate::notifications::{Notification, NotificationLevel};
use crate::plan_editor::PlanRow;
use crate::store::ChatState;
use mety_core::{ChatRole, LifespanProjection, ProjectionSlot};
use std::fmt::Write;

fn cell(value: Option<f64>) -> String {
    match value {
        Some(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Some(value) => format!("{value:.2}"),
        None => "-".to_string(),
    }
}

pub fn plan_table(rows: &[PlanRow]) -> String {
    let mut out = format!(
        "{:<24} {:>10} {:>10} {:>10}  {}\n",
        "variable", "optimal", "current", "target", "unit"
    );
    for row in rows {
        let marker = if row.variable.prediction_input { "*" } else { " " };
        let _ = writeln!(
            out,
            "{:<24} {:>10} {:>10} {:>10}  {}",
            format!("{marker}{}", row.variable.name),
            cell(row.optimal),
            cell(row.current),
            cell(row.target),
            row.variable.unit
        );
    }
    out.push_str("(* used for lifespan projections)");
    out
}

pub fn projection(projection: &LifespanProjection) -> String {
    let mut out = match projection.lifespan_display() {
        Some(lifespan) => format!("Predicted lifespan: {lifespan}"),
        None => "Predicted lifespan: unknown".to_string(),
    };
    for (condition, percent) in projection.risk_changes() {
        let _ = write!(out, "\n  {:<16} {:+}%", condition.label(), percent);
    }
    out
}

pub fn projection_slot(slot: &ProjectionSlot) -> String {
    match slot {
        ProjectionSlot::Empty => "No projection yet. Run `predict`.".to_string(),
        ProjectionSlot::Loading => "Calculating...".to_string(),
        ProjectionSlot::Ready(p) => projection(p),
    }
}

pub fn chat_history(chat: &ChatState) -> String {
    let mut out = String::new();
    for message in chat.history() {
        let speaker = match message.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "mety",
        };
        let _ = writeln!(out, "[{}] {speaker}: {}", message.turn_id, message.text);
        if let Some(plan) = chat.suggested_plan(message.turn_id) {
            if chat.is_expanded(message.turn_id) {
                for row in suggestion_rows(plan) {
                    let _ = writeln!(out, "    {} = {} {}", row.name, cell(Some(row.value)), row.unit);
                }
            } else {
                let _ = writeln!(out, "    (suggested plan: `expand {}`)", message.turn_id);
            }
        }
        if let Some(inline) = chat.inline_projection(message.turn_id) {
            for line in projection(inline).lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    if let Some(action) = chat.pending_action() {
        let changes: Vec<String> = action
            .payload
            .iter()
            .map(|(name, value)| format!("{name}={}", cell(Some(value))))
            .collect();
        let _ = writeln!(
            out,
            "Apply change? {} (apply-pending / ignore-pending)",
            changes.join(", ")
        );
    }
    out.trim_end().to_string()
}

pub fn log_entry(entry: &LogEntry) -> String {
    format!(
        "{} to {}: total {}, diet {}, supplements {}",
        entry.period_start,
        entry.period_end,
        entry.adherence.total_percent(),
        entry.adherence.diet_percent(),
        entry.adherence.supplement_percent()
    )
}

pub fn notification(notification: &Notification) -> String {
    let prefix = match notification.level {
        NotificationLevel::Info => "info",
        NotificationLevel::Warning => "warning",
        NotificationLevel::Error => "error",
        NotificationLevel::Success => "ok",
    };
    if notification.blocking {
        format!("!! {prefix}: {}", notification.message)
    } else {
        format!("{prefix}: {}", notification.message)
    }
}
