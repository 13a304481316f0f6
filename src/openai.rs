//! OpenAI-compatible chat-completions client.

use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{TranslateError, TranslateResult};
use crate::translator::{CompletionClient, CompletionRequest};

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> TranslateResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslateError::Generator(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from the `[llm]` section, reading the key from its environment variable.
    pub fn from_config(config: &LlmConfig) -> TranslateResult<Self> {
        Self::new(
            &config.base_url,
            &config.model,
            config.api_key()?,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &CompletionRequest) -> TranslateResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });

        tracing::debug!(%url, model = %self.model, "requesting completion");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::Generator(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TranslateError::Generator(format!("API error {status}: {text}")));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Generator(format!("invalid response: {e}")))?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TranslateError::Generator("response has no message content".to_string()))
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = TranslateResult<String>> + Send {
        self.chat(request)
    }
}
