use super::ProviderGateway;
use crate::errors::{ProviderError, ProviderErrorKind};
use crate::model::{ProviderReply, UsageData};
use async_trait::async_trait;
use std::time::Duration;

/// Scriptable gateway for tests: fixed response, scripted failure, optional
/// artificial latency.
#[derive(Debug)]
pub struct FakeGateway {
    provider_id: String,
    model: String,
    fixed_response: Option<String>,
    fail_with: Option<ProviderErrorKind>,
    delay: Option<Duration>,
    usage: UsageData,
}

impl FakeGateway {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model: "fake-model".to_string(),
            fixed_response: None,
            fail_with: None,
            delay: None,
            usage: UsageData {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn failing_with(mut self, kind: ProviderErrorKind) -> Self {
        self.fail_with = Some(kind);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_usage(mut self, usage: UsageData) -> Self {
        self.usage = usage;
        self
    }
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    async fn invoke(
        &self,
        _prompt: &str,
        _source: &str,
        model_override: Option<&str>,
    ) -> Result<ProviderReply, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(kind) = self.fail_with {
            return Err(ProviderError::new(
                &self.provider_id,
                kind,
                "scripted failure",
            ));
        }
        let text = self
            .fixed_response
            .clone()
            .unwrap_or_else(|| "{}".to_string());
        Ok(ProviderReply {
            text,
            model: model_override.unwrap_or(&self.model).to_string(),
            usage: self.usage.clone(),
        })
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
