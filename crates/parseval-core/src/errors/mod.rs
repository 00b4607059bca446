use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    RateLimit,
    Timeout,
    Server,
    Network,
    Cancelled,
    Other,
}

/// Failure of one provider call. Always isolated to its own cell: the
/// orchestrator records it and moves on.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("provider error ({provider_id}): {detail}")]
pub struct ProviderError {
    pub provider_id: String,
    pub kind: ProviderErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub detail: String,
}

impl ProviderError {
    pub fn new(
        provider_id: impl Into<String>,
        kind: ProviderErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            status: None,
            detail: detail.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn cancelled(provider_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(provider_id, ProviderErrorKind::Cancelled, detail)
    }

    /// Classify an HTTP status plus response body into a provider error.
    pub fn from_status(provider_id: &str, status: u16, body: &str) -> Self {
        let kind = match status {
            429 => ProviderErrorKind::RateLimit,
            408 | 504 => ProviderErrorKind::Timeout,
            500..=599 => ProviderErrorKind::Server,
            _ => ProviderErrorKind::Other,
        };
        Self::new(
            provider_id,
            kind,
            format!("status {}: {}", status, truncate(body, 300)),
        )
        .with_status(status)
    }

    /// Classify a free-form transport error message. Last resort when no
    /// status code is available.
    pub fn classify_message(provider_id: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let msg = message.to_lowercase();
        let kind = if msg.contains("rate limit") || msg.contains("429") {
            ProviderErrorKind::RateLimit
        } else if msg.contains("timeout") || msg.contains("timed out") {
            ProviderErrorKind::Timeout
        } else if msg.contains("500")
            || msg.contains("502")
            || msg.contains("503")
            || msg.contains("504")
        {
            ProviderErrorKind::Server
        } else if msg.contains("network") || msg.contains("connection") || msg.contains("dns") {
            ProviderErrorKind::Network
        } else {
            ProviderErrorKind::Other
        };
        Self::new(provider_id, kind, message)
    }
}

/// A malformed test case or invalid run setup. Fatal to that one case's
/// discovery, never to the run.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("configuration error: {detail}")]
pub struct ConfigurationError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub detail: String,
}

impl ConfigurationError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            path: None,
            detail: detail.into(),
        }
    }

    pub fn at_path(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            detail: detail.into(),
        }
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
