use super::ProviderGateway;
use crate::errors::ProviderError;
use crate::model::{ProviderReply, UsageData};
use async_trait::async_trait;
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Messages-API client for Anthropic models.
pub struct AnthropicGateway {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "claude-3-5-haiku-latest".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ProviderGateway for AnthropicGateway {
    async fn invoke(
        &self,
        prompt: &str,
        source: &str,
        model_override: Option<&str>,
    ) -> Result<ProviderReply, ProviderError> {
        let model = model_override.unwrap_or(&self.model);
        let url = format!("{}/v1/messages", self.base_url);

        let body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "system": prompt,
            "messages": [
                { "role": "user", "content": source }
            ],
        });

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::classify_message("anthropic", e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                "anthropic",
                status.as_u16(),
                &text,
            ));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::classify_message("anthropic", e.to_string()))?;

        let text = payload
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ProviderError::classify_message("anthropic", "response missing content[0].text")
            })?
            .to_string();

        let usage = UsageData {
            prompt_tokens: payload
                .pointer("/usage/input_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            completion_tokens: payload
                .pointer("/usage/output_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        };

        Ok(ProviderReply {
            text,
            model: model.to_string(),
            usage,
        })
    }

    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
