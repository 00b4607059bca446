pub mod anthropic;
pub mod fake;
pub mod openai;

use crate::errors::ProviderError;
use crate::model::ProviderReply;
use async_trait::async_trait;

/// Boundary abstraction over any LLM vendor API. Returns raw text plus token
/// usage; never panics on provider misbehavior.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn invoke(
        &self,
        prompt: &str,
        source: &str,
        model_override: Option<&str>,
    ) -> Result<ProviderReply, ProviderError>;

    fn provider_id(&self) -> &str;

    /// Model used when the caller supplies no override.
    fn default_model(&self) -> &str;
}
