//! METY client library exports.

pub mod api_client;
pub mod chat;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fence;
pub mod logbook;
pub mod notifications;
pub mod onboarding;
pub mod persistence;
pub mod plan_editor;
pub mod projection;
pub mod render;
pub mod store;
pub mod telemetry;
