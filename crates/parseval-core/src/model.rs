use crate::errors::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (source text, prompt, expected answer, schema) unit under evaluation.
/// Created once at discovery time; read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub module_id: String,
    pub case_name: String,
    pub source_text: String,
    pub prompt_text: String,
    pub expected_data: serde_json::Value,
    /// Key into the schema registry (the owning module id).
    pub schema_ref: String,
}

impl TestCase {
    pub fn test_id(&self) -> String {
        format!("{}/{}", self.module_id, self.case_name)
    }
}

/// A provider selected for a run, with an optional model override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl ProviderSpec {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_override: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }
}

/// Token usage reported by a provider for one call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageData {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl UsageData {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Raw result of one provider gateway call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    pub text: String,
    pub model: String,
    pub usage: UsageData,
}

/// How one expected field compared against the actual value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactMatch,
    PartialMatch,
    NoMatch,
    MissingField,
    NestedObject,
    ListMatch,
    TypeMismatch,
}

/// Per-field score line; purely descriptive, child of a scored outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldScore {
    pub field_path: String,
    /// Fraction of this field's weight that was earned, in [0, 1].
    pub ratio: f64,
    pub kind: MatchKind,
}

/// Result of turning raw provider text into a validated, scored value.
/// Produced once per cell; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Success {
        validated: serde_json::Value,
        /// Always in [0, 100].
        accuracy: f64,
        field_scores: Vec<FieldScore>,
    },
    ParseFailure {
        reason: String,
        /// Raw response truncated to a bounded length.
        excerpt: String,
    },
    SchemaFailure {
        reason: String,
        /// Original normalized value, kept so partially-correct data stays inspectable.
        raw: serde_json::Value,
    },
}

impl ValidationOutcome {
    pub fn accuracy(&self) -> f64 {
        match self {
            ValidationOutcome::Success { accuracy, .. } => *accuracy,
            _ => 0.0,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ValidationOutcome::Success { .. })
    }
}

/// Everything recorded for one (test case, provider) cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CellOutcome {
    Evaluated(ValidationOutcome),
    ProviderError(ProviderError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCell {
    pub provider_id: String,
    pub model_used: String,
    /// Raw response text; absent when the provider call itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageData>,
    pub outcome: CellOutcome,
}

impl ProviderCell {
    pub fn accuracy(&self) -> f64 {
        match &self.outcome {
            CellOutcome::Evaluated(v) => v.accuracy(),
            CellOutcome::ProviderError(_) => 0.0,
        }
    }

    pub fn success(&self) -> bool {
        match &self.outcome {
            CellOutcome::Evaluated(v) => v.success(),
            CellOutcome::ProviderError(_) => false,
        }
    }
}

/// All provider cells for one test case, in caller-supplied provider order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub test_id: String,
    /// Prompt actually sent (differs from the test case's in an optimized pass).
    pub prompt_used: String,
    pub cells: Vec<ProviderCell>,
}

impl CaseResult {
    pub fn cell(&self, provider_id: &str) -> Option<&ProviderCell> {
        self.cells.iter().find(|c| c.provider_id == provider_id)
    }
}

/// Full test-case × provider grid for one orchestration pass.
/// Cases keep discovery order; cells keep provider-list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub cases: Vec<CaseResult>,
}

impl RunResult {
    pub fn case(&self, test_id: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.test_id == test_id)
    }
}

/// Baseline/optimized pairing for one test case (optimize mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedCase {
    pub test_id: String,
    pub revised_prompt: String,
    pub baseline: CaseResult,
    pub optimized: CaseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub cases: Vec<OptimizedCase>,
}
