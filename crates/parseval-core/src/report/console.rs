use super::RunArtifacts;
use crate::model::{CellOutcome, ValidationOutcome};

/// Console rendering of the result grid, provider columns in run order.
pub fn print_summary(artifacts: &RunArtifacts) {
    for case in &artifacts.result.cases {
        eprintln!("{}", case.test_id);
        for cell in &case.cells {
            let status = match &cell.outcome {
                CellOutcome::Evaluated(ValidationOutcome::Success { accuracy, .. }) => {
                    format!("{:.1}%", accuracy)
                }
                CellOutcome::Evaluated(ValidationOutcome::ParseFailure { .. }) => {
                    "parse failure".to_string()
                }
                CellOutcome::Evaluated(ValidationOutcome::SchemaFailure { .. }) => {
                    "schema failure".to_string()
                }
                CellOutcome::ProviderError(e) => format!("error: {}", e.detail),
            };
            eprintln!("  {:<12} {:<28} {}", cell.provider_id, cell.model_used, status);
        }
    }

    if let Some(optimize) = &artifacts.optimize {
        eprintln!("optimized pass:");
        for case in &optimize.cases {
            let before = mean_accuracy(&case.baseline.cells);
            let after = mean_accuracy(&case.optimized.cells);
            eprintln!(
                "  {:<32} {:.1}% -> {:.1}%",
                case.test_id, before, after
            );
        }
    }

    if !artifacts.costs.per_provider.is_empty() {
        eprintln!("cost:");
        for c in &artifacts.costs.per_provider {
            eprintln!(
                "  {:<12} {:<28} {} prompt + {} completion tokens, ${:.4}",
                c.provider_id, c.model, c.prompt_tokens, c.completion_tokens, c.cost_usd
            );
        }
        eprintln!("  total ${:.4}", artifacts.costs.total_usd);
    }

    for err in &artifacts.configuration_errors {
        eprintln!("config: {}", err);
    }
}

fn mean_accuracy(cells: &[crate::model::ProviderCell]) -> f64 {
    if cells.is_empty() {
        return 0.0;
    }
    cells.iter().map(|c| c.accuracy()).sum::<f64>() / cells.len() as f64
}
