use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use tracing::debug;

use super::error::ApiError;
use super::types::{
    DocumentRequest, DocumentResponse, ErrorBody, HumanizationRequest, JobHandle, JobStatus,
    SubmitRequest, SubmitResponse,
};
use crate::config::HumanizerConfig;
use crate::error::{ClassifiedError, ErrorClassifier, HumanizerError};

/// The two operations of the remote humanization service.
///
/// Each call is exactly one network round trip. Retrying is up to the
/// caller (see [`PollingScheduler`](crate::scheduler::PollingScheduler)).
pub trait HumanizeApi: Send + Sync {
    /// Submit a new job and return its handle.
    fn submit(
        &self,
        request: &HumanizationRequest,
    ) -> impl Future<Output = Result<JobHandle, ClassifiedError>> + Send;

    /// Fetch the current status of a previously submitted job.
    fn fetch_status(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<JobStatus, ClassifiedError>> + Send;
}

/// reqwest-backed client for the humanization service.
pub struct HumanizeClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl HumanizeClient {
    pub fn new(config: &HumanizerConfig) -> Result<Self, HumanizerError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client pointing at a custom base URL with default settings
    /// (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, HumanizerError> {
        let config = HumanizerConfig {
            api_key,
            base_url,
            ..HumanizerConfig::default()
        };
        Self::new(&config)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header("apikey", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(response.text().await?)
    }

    async fn submit_raw(&self, request: &HumanizationRequest) -> Result<JobHandle, ApiError> {
        let body = SubmitRequest::from_request(request, &self.model);
        let text = self.post_json("submit", &body).await?;

        let parsed: SubmitResponse =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        if parsed.id.trim().is_empty() {
            return Err(ApiError::Decode("submit response carried an empty id".into()));
        }
        Ok(JobHandle { id: parsed.id })
    }

    async fn fetch_status_raw(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let body = DocumentRequest {
            id: job_id.to_string(),
        };
        let text = self.post_json("document", &body).await?;

        if text.trim().is_empty() {
            return Ok(JobStatus::pending());
        }
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        // Anything other than an object (a bare "processing", an array) carries no output yet.
        if !value.is_object() {
            return Ok(JobStatus::pending());
        }
        let doc: DocumentResponse =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(JobStatus::from(doc))
    }
}

/// Build a [`ApiError::Status`] from a non-2xx response, preferring the
/// body's `error` field, then the raw body, then the status reason.
async fn status_error(response: Response) -> ApiError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            debug!(status = status.as_u16(), error = %e, "failed to read error body");
            String::new()
        }
    };

    let body_message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) => Some(text.trim().to_string()),
    };
    let message = body_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

impl HumanizeApi for HumanizeClient {
    async fn submit(&self, request: &HumanizationRequest) -> Result<JobHandle, ClassifiedError> {
        debug!(chars = request.text.chars().count(), "submitting job");
        self.submit_raw(request).await.map_err(|e| {
            debug!(error = %e, "submit failed");
            ErrorClassifier::classify(&e)
        })
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatus, ClassifiedError> {
        self.fetch_status_raw(job_id).await.map_err(|e| {
            debug!(job_id, error = %e, "status check failed");
            ErrorClassifier::classify(&e)
        })
    }
}
