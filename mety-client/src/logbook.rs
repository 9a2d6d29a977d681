//! Adherence logging: what the user actually did over a period.

use crate::error::ClientError;
use crate::notifications::{Notification, NotificationLevel};
use crate::store::PlanStore;
use chrono::NaiveDate;
use mety_core::variables::{self, PlanVariable};
use mety_core::{Adherence, LogSubmitRequest, PlanSnapshot, ValidationError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A submitted log and the adherence the backend scored it at.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub log_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub adherence: Adherence,
}

/// Log being filled in for one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogForm {
    values: PlanSnapshot,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
}

impl LogForm {
    /// Start from the non-zero values of the current plan.
    pub fn prefilled(current: &PlanSnapshot) -> Self {
        let values = variables::plan_variables()
            .filter_map(|v| current.get(v.name).filter(|value| *value != 0.0).map(|value| (v.name, value)))
            .collect();
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ValidationError> {
        let variable = loggable(name)?;
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: variable.name,
                reason: format!("{value} is not a valid amount"),
            });
        }
        self.values.set(variable.name, value);
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name)
    }

    pub fn set_period(&mut self, start: NaiveDate, end: NaiveDate) {
        self.period_start = Some(start);
        self.period_end = Some(end);
    }

    /// Parse `YYYY-MM-DD` dates and set the period.
    pub fn set_period_str(&mut self, start: &str, end: &str) -> Result<(), ValidationError> {
        let start = parse_date("period_start", start)?;
        let end = parse_date("period_end", end)?;
        self.set_period(start, end);
        Ok(())
    }

    /// Build the request body. Unknown variables never reach the backend.
    pub fn to_request(&self, user_id: &str) -> Result<LogSubmitRequest, ValidationError> {
        let period_start = self
            .period_start
            .ok_or(ValidationError::RequiredFieldMissing { field: "period_start" })?;
        let period_end = self
            .period_end
            .ok_or(ValidationError::RequiredFieldMissing { field: "period_end" })?;
        if period_start > period_end {
            return Err(ValidationError::InvalidValue {
                field: "period_end",
                reason: format!("{period_end} is before {period_start}"),
            });
        }
        let log = variables::plan_variables()
            .filter_map(|v| self.values.get(v.name).map(|value| (v.name, value)))
            .collect();
        Ok(LogSubmitRequest {
            user_id: user_id.to_string(),
            log,
            period_start,
            period_end,
        })
    }
}

fn loggable(name: &str) -> Result<&'static PlanVariable, ValidationError> {
    variables::plan_variables()
        .find(|v| v.name == name)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "variable",
            reason: format!("unknown plan variable {name}"),
        })
}

pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field });
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| ValidationError::InvalidValue {
        field,
        reason: format!("{raw}: {e}"),
    })
}

/// Submits logs through the store and keeps the session's log book.
#[derive(Clone)]
pub struct AdherenceLogger {
    store: PlanStore,
}

impl AdherenceLogger {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }

    /// Form pre-filled from the active user's current plan.
    pub async fn new_form(&self) -> LogForm {
        LogForm::prefilled(self.store.read().await.current_plan())
    }

    pub async fn submit(&self, form: &LogForm) -> Result<LogEntry, ClientError> {
        let user_id = self.store.read().await.active_user()?.to_string();
        let request = form.to_request(&user_id)?;
        let (period_start, period_end) = (request.period_start, request.period_end);

        let response = match self.store.submit_log(request).await {
            Ok(response) => response,
            Err(err) => {
                self.store.alert("Failed to submit log. Please try again.").await;
                return Err(err);
            }
        };

        tracing::info!(
            %user_id,
            log_id = %response.log_id,
            adherence = response.adherence.total,
            "log submitted"
        );
        let entry = LogEntry {
            log_id: response.log_id,
            period_start,
            period_end,
            adherence: response.adherence,
        };
        let mut state = self.store.write().await;
        if state.user_id() == Some(user_id.as_str()) {
            state.push_log_entry(entry.clone());
        }
        state.notify(
            Notification::new(
                NotificationLevel::Success,
                format!("Log submitted! Adherence: {}", entry.adherence.total_percent()),
            )
            .blocking(),
        );
        Ok(entry)
    }
}
