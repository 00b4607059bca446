//! Prompt optimization: given a case's baseline outcomes, produce a revised
//! extraction prompt for the second pass.

use crate::model::{CaseResult, CellOutcome, TestCase, ValidationOutcome};
use crate::providers::ProviderGateway;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait PromptOptimizer: Send + Sync {
    async fn improve(&self, tc: &TestCase, baseline: &CaseResult) -> anyhow::Result<String>;
}

/// LLM-backed optimizer: feeds the original prompt, the source text, the
/// target schema, the expected shape and a summary of baseline failures back
/// into a rewrite request.
pub struct LlmPromptOptimizer {
    gateway: Arc<dyn ProviderGateway>,
    schemas: HashMap<String, serde_json::Value>,
}

impl LlmPromptOptimizer {
    pub fn new(gateway: Arc<dyn ProviderGateway>) -> Self {
        Self {
            gateway,
            schemas: HashMap::new(),
        }
    }

    /// Make the target schemas available to the rewrite briefing.
    pub fn with_schemas(mut self, descriptors: &[SchemaDescriptor]) -> Self {
        self.schemas = descriptors
            .iter()
            .map(|d| (d.module_id.clone(), d.schema.clone()))
            .collect();
        self
    }
}

#[async_trait]
impl PromptOptimizer for LlmPromptOptimizer {
    async fn improve(&self, tc: &TestCase, baseline: &CaseResult) -> anyhow::Result<String> {
        let instructions = "You improve extraction prompts. Given the original prompt, the \
             source text, the target schema, the expected JSON shape and a summary of what \
             each model got wrong, reply with a revised prompt only — no commentary, no \
             code fences.";
        let briefing = build_briefing(tc, self.schemas.get(&tc.schema_ref), baseline)?;

        let reply = self
            .gateway
            .invoke(instructions, &briefing, None)
            .await?;
        let revised = reply.text.trim();
        if revised.is_empty() {
            anyhow::bail!("optimizer returned an empty prompt");
        }
        Ok(revised.to_string())
    }
}

fn build_briefing(
    tc: &TestCase,
    schema: Option<&serde_json::Value>,
    baseline: &CaseResult,
) -> anyhow::Result<String> {
    let mut briefing = format!(
        "Original prompt:\n{}\n\nSource text:\n{}\n\n",
        tc.prompt_text, tc.source_text
    );
    if let Some(schema) = schema {
        briefing.push_str(&format!(
            "Target schema:\n{}\n\n",
            serde_json::to_string_pretty(schema)?
        ));
    }
    briefing.push_str(&format!(
        "Expected JSON:\n{}\n\nBaseline outcomes:\n{}",
        serde_json::to_string_pretty(&tc.expected_data)?,
        summarize_baseline(baseline),
    ));
    Ok(briefing)
}

/// Human-readable digest of what went wrong per provider; downstream
/// consumer of the field-score list, nothing is computed inline.
fn summarize_baseline(baseline: &CaseResult) -> String {
    let mut lines = Vec::new();
    for cell in &baseline.cells {
        match &cell.outcome {
            CellOutcome::Evaluated(ValidationOutcome::Success {
                accuracy,
                field_scores,
                ..
            }) => {
                let misses: Vec<String> = field_scores
                    .iter()
                    .filter(|f| f.ratio < 1.0)
                    .map(|f| format!("{} ({:?})", f.field_path, f.kind))
                    .collect();
                lines.push(format!(
                    "- {}: {:.0}% accurate; weak fields: {}",
                    cell.provider_id,
                    accuracy,
                    if misses.is_empty() {
                        "none".to_string()
                    } else {
                        misses.join(", ")
                    }
                ));
            }
            CellOutcome::Evaluated(ValidationOutcome::ParseFailure { reason, .. }) => {
                lines.push(format!("- {}: unparseable output ({})", cell.provider_id, reason));
            }
            CellOutcome::Evaluated(ValidationOutcome::SchemaFailure { reason, .. }) => {
                lines.push(format!("- {}: schema violation ({})", cell.provider_id, reason));
            }
            CellOutcome::ProviderError(e) => {
                lines.push(format!("- {}: provider error ({})", cell.provider_id, e.detail));
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldScore, MatchKind, ProviderCell};
    use crate::providers::fake::FakeGateway;

    fn baseline_case() -> CaseResult {
        CaseResult {
            test_id: "jobs/a".to_string(),
            prompt_used: "Extract the job record.".to_string(),
            cells: vec![ProviderCell {
                provider_id: "fake".to_string(),
                model_used: "fake-model".to_string(),
                response: Some("{}".to_string()),
                usage: None,
                outcome: CellOutcome::Evaluated(ValidationOutcome::Success {
                    validated: serde_json::json!({}),
                    accuracy: 50.0,
                    field_scores: vec![FieldScore {
                        field_path: "title".to_string(),
                        ratio: 0.5,
                        kind: MatchKind::PartialMatch,
                    }],
                }),
            }],
        }
    }

    fn test_case() -> TestCase {
        TestCase {
            module_id: "jobs".to_string(),
            case_name: "a".to_string(),
            source_text: "Jane is a Senior Engineer.".to_string(),
            prompt_text: "Extract the job record.".to_string(),
            expected_data: serde_json::json!({"title": "Senior Engineer"}),
            schema_ref: "jobs".to_string(),
        }
    }

    #[tokio::test]
    async fn optimizer_returns_trimmed_revision() {
        let gateway = Arc::new(
            FakeGateway::new("fake").with_response("  Extract the full job title verbatim.  "),
        );
        let optimizer = LlmPromptOptimizer::new(gateway);
        let revised = optimizer.improve(&test_case(), &baseline_case()).await.unwrap();
        assert_eq!(revised, "Extract the full job title verbatim.");
    }

    #[tokio::test]
    async fn empty_revision_is_an_error() {
        let gateway = Arc::new(FakeGateway::new("fake").with_response("   "));
        let optimizer = LlmPromptOptimizer::new(gateway);
        assert!(optimizer
            .improve(&test_case(), &baseline_case())
            .await
            .is_err());
    }

    #[test]
    fn baseline_summary_names_weak_fields() {
        let summary = summarize_baseline(&baseline_case());
        assert!(summary.contains("title"));
        assert!(summary.contains("50%"));
    }

    #[test]
    fn briefing_carries_prompt_source_schema_and_expectation() {
        let tc = test_case();
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"title": {"type": "string"}}
        });
        let briefing = build_briefing(&tc, Some(&schema), &baseline_case()).unwrap();
        assert!(briefing.contains(&tc.prompt_text));
        assert!(briefing.contains(&tc.source_text));
        assert!(briefing.contains("Target schema:"));
        assert!(briefing.contains(r#""title""#));
        assert!(briefing.contains("Baseline outcomes:"));

        // No schema registered for the module: the section is simply absent.
        let without = build_briefing(&tc, None, &baseline_case()).unwrap();
        assert!(!without.contains("Target schema:"));
    }
}
