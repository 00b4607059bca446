//! YAML run configuration. Example:
//!
//! ```yaml
//! suite: extraction-bench
//! cases_dir: ./cases
//! providers:
//!   - id: openai
//!   - id: anthropic
//!     model: claude-3-5-sonnet-latest
//! settings:
//!   parallel: 4
//!   timeout_seconds: 60
//!   ledger_path: ./parseval.db
//! ```

use crate::model::ProviderSpec;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub suite: String,
    pub cases_dir: PathBuf,
    pub providers: Vec<ProviderEntry>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub parallel: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub ledger_path: Option<PathBuf>,
}

impl EvalConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: EvalConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        if cfg.providers.is_empty() {
            anyhow::bail!("config error: at least one provider is required");
        }
        Ok(cfg)
    }

    /// Provider list in config order; this order is the run's column order.
    pub fn provider_specs(&self) -> Vec<ProviderSpec> {
        self.providers
            .iter()
            .map(|p| ProviderSpec {
                provider_id: p.id.clone(),
                model_override: p.model.clone(),
            })
            .collect()
    }
}
