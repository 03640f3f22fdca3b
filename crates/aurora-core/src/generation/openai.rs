//! OpenAI-compatible chat completions client with JSON-schema output.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use super::{GenerativeModel, ResponseSchema};
use crate::error::GenerationError;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Generative model backed by a `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(endpoint: Url, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build from an endpoint string and the name of the env var holding the key.
    ///
    /// # Errors
    /// `NotConfigured` if the endpoint is not a URL or the key variable is unset or empty.
    pub fn from_env(endpoint: &str, api_key_env: &str, model: &str) -> Result<Self, GenerationError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            GenerationError::NotConfigured(format!("invalid endpoint '{endpoint}': {e}"))
        })?;
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::NotConfigured(format!("{api_key_env} is not set")))?;
        Ok(Self::new(endpoint, api_key, model))
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl GenerativeModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_object(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": true,
                    "schema": schema.schema,
                }
            }
        });

        let resp = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Model(format!("HTTP {status}: {text}")));
        }

        let payload: Value = resp.json().await?;
        let message = &payload["choices"][0]["message"];
        if let Some(refusal) = message["refusal"].as_str() {
            return Err(GenerationError::Model(format!("model refused: {refusal}")));
        }
        let content = message["content"]
            .as_str()
            .ok_or_else(|| GenerationError::Format("response has no message content".to_string()))?;

        serde_json::from_str(content)
            .map_err(|e| GenerationError::Format(format!("message content is not JSON: {e}")))
    }
}
