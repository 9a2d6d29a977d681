//! HTTP clients for the plan backend and the prediction service.

use crate::config::ClientConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use mety_core::{
    AckResponse, ChatRequest, ChatResponse, ChatService, GetPlanResponse, LifespanProjection,
    LogSubmitRequest, LogSubmitResponse, OnboardingSubmitRequest, OnboardingSubmitResponse,
    PlanService, PredictionInput, PredictionService, ServiceError, ServiceResult,
    UpdatePlanRequest, UpdatePlanResponse,
};
use serde::Deserialize;
use std::time::Duration;

const PLAN_SERVICE: &str = "plan service";
const CHAT_SERVICE: &str = "chat service";
const PREDICTION_SERVICE: &str = "prediction service";

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// REST client for the plan backend. The chat endpoint lives on the same host.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.backend_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn health(&self) -> ServiceResult<HealthResponse> {
        self.get_json(PLAN_SERVICE, "/health", None).await
    }

    async fn get_json<T>(
        &self,
        service: &'static str,
        path: &str,
        user_id: Option<&str>,
    ) -> ServiceResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(url);
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;
        parse_response(service, response).await
    }

    async fn post_json<T, B>(&self, service: &'static str, path: &str, body: &B) -> ServiceResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;
        parse_response(service, response).await
    }

    /// POST with the user id in the query string and no body.
    async fn post_for_user<T>(&self, service: &'static str, path: &str, user_id: &str) -> ServiceResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;
        parse_response(service, response).await
    }
}

#[async_trait]
impl PlanService for BackendClient {
    async fn get_plan(&self, user_id: &str) -> ServiceResult<GetPlanResponse> {
        self.get_json(PLAN_SERVICE, "/plan/get", Some(user_id)).await
    }

    async fn update_plan(&self, request: &UpdatePlanRequest) -> ServiceResult<UpdatePlanResponse> {
        self.post_json(PLAN_SERVICE, "/plan/update", request).await
    }

    async fn apply_target_to_current(&self, user_id: &str) -> ServiceResult<AckResponse> {
        self.post_for_user(PLAN_SERVICE, "/plan/apply-target-to-current", user_id)
            .await
    }

    async fn submit_onboarding(
        &self,
        request: &OnboardingSubmitRequest,
    ) -> ServiceResult<OnboardingSubmitResponse> {
        self.post_json(PLAN_SERVICE, "/onboarding/submit", request).await
    }

    async fn submit_log(&self, request: &LogSubmitRequest) -> ServiceResult<LogSubmitResponse> {
        self.post_json(PLAN_SERVICE, "/log/submit", request).await
    }

    async fn clear_chat_history(&self, user_id: &str) -> ServiceResult<AckResponse> {
        self.post_for_user(CHAT_SERVICE, "/chat/clear", user_id).await
    }
}

#[async_trait]
impl ChatService for BackendClient {
    async fn send_message(&self, request: &ChatRequest) -> ServiceResult<ChatResponse> {
        self.post_json(CHAT_SERVICE, "/chat", request).await
    }
}

/// Client for the external prediction model. Calls can take minutes.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl PredictionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.prediction_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.prediction_url.clone(),
            timeout_secs: config.prediction_timeout_secs,
        })
    }
}

#[async_trait]
impl PredictionService for PredictionClient {
    async fn predict(&self, input: &PredictionInput) -> ServiceResult<LifespanProjection> {
        tracing::debug!(variables = input.len(), "requesting lifespan projection");
        let response = self
            .client
            .post(&self.url)
            .json(input)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout {
                        after_secs: self.timeout_secs,
                    }
                } else {
                    transport_error(PREDICTION_SERVICE, e)
                }
            })?;
        parse_response(PREDICTION_SERVICE, response).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> ServiceResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(service, e))?;
    if !status.is_success() {
        return Err(ServiceError::Http {
            service,
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str::<T>(&text).map_err(|e| ServiceError::Decode {
        service,
        reason: e.to_string(),
    })
}

fn transport_error(service: &'static str, err: reqwest::Error) -> ServiceError {
    ServiceError::Transport {
        service,
        reason: err.to_string(),
    }
}
