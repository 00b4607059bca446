use super::ProviderGateway;
use crate::errors::ProviderError;
use crate::model::{ProviderReply, UsageData};
use async_trait::async_trait;
use serde_json::json;

/// Chat-completions client for OpenAI and OpenAI-compatible APIs
/// (OpenRouter, Mistral). The extraction prompt goes in as the system
/// message, the source text as the user message.
pub struct OpenAiCompatGateway {
    provider_id: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatGateway {
    pub fn new(
        provider_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, "gpt-4o-mini")
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new(
            "openrouter",
            "https://openrouter.ai/api/v1",
            api_key,
            "meta-llama/llama-3.1-70b-instruct",
        )
    }

    pub fn mistral(api_key: impl Into<String>) -> Self {
        Self::new(
            "mistral",
            "https://api.mistral.ai/v1",
            api_key,
            "mistral-small-latest",
        )
    }
}

#[async_trait]
impl ProviderGateway for OpenAiCompatGateway {
    async fn invoke(
        &self,
        prompt: &str,
        source: &str,
        model_override: Option<&str>,
    ) -> Result<ProviderReply, ProviderError> {
        let model = model_override.unwrap_or(&self.model);
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": model,
            "temperature": 0.0,
            "messages": [
                { "role": "system", "content": prompt },
                { "role": "user", "content": source }
            ],
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::classify_message(&self.provider_id, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                &self.provider_id,
                status.as_u16(),
                &text,
            ));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::classify_message(&self.provider_id, e.to_string()))?;

        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ProviderError::classify_message(
                    &self.provider_id,
                    "response missing choices[0].message.content",
                )
            })?
            .to_string();

        let usage = UsageData {
            prompt_tokens: payload
                .pointer("/usage/prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            completion_tokens: payload
                .pointer("/usage/completion_tokens")
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
        &self.provider_id
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
