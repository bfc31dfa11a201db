//! [`AnalysisService`] backed by a Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use helpdesk_core::{Category, ConversationSummary, Message, ResolutionAnalysis, ResolvedBy};
use helpdesk_settings::AnalysisSettings;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, instrument};

use crate::AnalysisService;
use crate::errors::AnalysisError;
use crate::prompt::{parse_reply, resolution_prompt, summarize_prompt};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Configuration for [`GeminiAnalysisService`].
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// API key, sent as the `key` query parameter.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Bound on each call, including reading the body.
    pub timeout: Duration,
}

impl From<&AnalysisSettings> for GeminiConfig {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            timeout: settings.timeout(),
        }
    }
}

/// HTTP client for the model API.
pub struct GeminiAnalysisService {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiAnalysisService {
    /// Create a service with a default HTTP client.
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a service with a caller-supplied HTTP client.
    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    async fn generate(&self, prompt: String) -> Result<String, AnalysisError> {
        let timeout = self.config.timeout;
        tokio::time::timeout(timeout, self.generate_unbounded(prompt))
            .await
            .map_err(|_| AnalysisError::Timeout(timeout))?
    }

    async fn generate_unbounded(&self, prompt: String) -> Result<String, AnalysisError> {
        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.config.api_key.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), model = %self.config.model, "analysis API error");
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
        body.text().ok_or(AnalysisError::EmptyResponse)
    }
}

#[async_trait]
impl AnalysisService for GeminiAnalysisService {
    #[instrument(skip_all, fields(messages = messages.len(), category = ?category))]
    async fn summarize(
        &self,
        messages: &[Message],
        category: Option<Category>,
    ) -> Result<ConversationSummary, AnalysisError> {
        let text = self.generate(summarize_prompt(messages, category)).await?;
        let summary = parse_reply(&text)?;
        debug!("summary generated");
        Ok(summary)
    }

    #[instrument(skip_all, fields(messages = messages.len(), category = ?category, resolved_by = %resolved_by))]
    async fn analyze_resolution(
        &self,
        messages: &[Message],
        category: Option<Category>,
        resolved_by: ResolvedBy,
    ) -> Result<ResolutionAnalysis, AnalysisError> {
        let text = self
            .generate(resolution_prompt(messages, category, resolved_by))
            .await?;
        let analysis: ResolutionAnalysis = parse_reply(&text)?;
        debug!(sentiment = %analysis.sentiment, "resolution analyzed");
        Ok(analysis)
    }
}
