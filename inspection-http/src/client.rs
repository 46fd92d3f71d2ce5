use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use inspection_core::api::{
    ApiConfig, ApiError, CalculateCostRequest, CompletionSummary, InspectionApi,
    StartedInspection,
};
use inspection_core::wizard::StepId;
use inspection_core::{CostBreakdown, InspectionRecord};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::envelope::{CompletePayload, Envelope, ErrorBody, StartPayload, StartRequest};

/// [`InspectionApi`] over the service's REST endpoints.
///
/// Every route lives under `{base_url}/inspections/{id}`; responses are
/// unwrapped from the `{success, message, data}` envelope.
pub struct HttpInspectionApi {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl HttpInspectionApi {
    /// Build a client for `config.base_url`.
    ///
    /// # Errors
    /// [`ApiError::Configuration`] if the base URL is not http(s) or the
    /// underlying client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Configuration(format!(
                "base URL must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("inspection-http/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone().filter(|t| !t.trim().is_empty()),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(
        &self,
        id: &str,
        route: &str,
    ) -> String {
        format!("{}/inspections/{}/{}", self.base_url, id, route)
    }

    fn request(
        &self,
        method: Method,
        url: String,
    ) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn transport_error(
        &self,
        err: reqwest::Error,
    ) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// Send `request` and decode the envelope of a 2xx response.
    async fn send<T: DeserializeOwned>(
        &self,
        id: &str,
        request: RequestBuilder,
    ) -> Result<(u16, Envelope<T>), ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            warn!(inspection = %id, status = status.as_u16(), %message, "request rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok((status.as_u16(), envelope))
    }
}

#[async_trait]
impl InspectionApi for HttpInspectionApi {
    async fn load_draft(&self, id: &str) -> Result<InspectionRecord, ApiError> {
        debug!(inspection = %id, "loading draft");
        let request = self.request(Method::GET, self.url(id, "draft"));
        let (status, envelope) = self.send::<InspectionRecord>(id, request).await?;
        envelope.into_data(status)
    }

    async fn start(
        &self,
        id: &str,
        arrived_at: DateTime<Utc>,
    ) -> Result<StartedInspection, ApiError> {
        debug!(inspection = %id, "starting inspection");
        let body = StartRequest {
            arrived_at: arrived_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let request = self.request(Method::POST, self.url(id, "start")).json(&body);
        let (status, envelope) = self.send::<StartPayload>(id, request).await?;
        envelope.into_data(status).map(StartedInspection::from)
    }

    async fn save_section(
        &self,
        id: &str,
        section: StepId,
        fields: Map<String, Value>,
    ) -> Result<InspectionRecord, ApiError> {
        debug!(inspection = %id, %section, fields = fields.len(), "saving section");
        let request = self
            .request(Method::PUT, self.url(id, section.as_str()))
            .json(&fields);
        let (status, envelope) = self.send::<InspectionRecord>(id, request).await?;
        envelope.into_data(status)
    }

    async fn calculate_cost(
        &self,
        id: &str,
        request: &CalculateCostRequest,
    ) -> Result<Option<CostBreakdown>, ApiError> {
        let builder = self
            .request(Method::POST, self.url(id, "calculate-cost"))
            .json(request);
        let (status, envelope) = self.send::<CostBreakdown>(id, builder).await?;
        envelope.into_optional_data(status)
    }

    async fn complete(&self, id: &str) -> Result<CompletionSummary, ApiError> {
        debug!(inspection = %id, "completing inspection");
        let request = self
            .request(Method::PUT, self.url(id, "complete"))
            .json(&Map::new());
        let (status, envelope) = self.send::<CompletePayload>(id, request).await?;
        CompletionSummary::try_from(envelope.into_data(status)?)
    }
}
