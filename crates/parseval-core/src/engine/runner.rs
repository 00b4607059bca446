//! Run orchestration. Every (test case × provider) cell is processed
//! independently: provider failures, parse failures and timeouts are
//! recorded as that cell's outcome and never abort the run. The result grid
//! is always `|cases| × |providers|`, cases in discovery order, provider
//! cells in caller-supplied order, regardless of completion order.

use crate::errors::{ProviderError, ProviderErrorKind};
use crate::ledger::CostLedger;
use crate::model::{
    CaseResult, CellOutcome, OptimizeReport, OptimizedCase, ProviderCell, ProviderSpec, RunResult,
    TestCase, ValidationOutcome,
};
use crate::normalize::normalize;
use crate::optimize::PromptOptimizer;
use crate::registry::ProviderRegistry;
use crate::report::progress::{ProgressEvent, ProgressSink};
use crate::schema::SchemaRegistry;
use crate::score::score;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Upper bound on in-flight provider calls.
    pub parallel: usize,
    /// Per-call timeout; an elapsed call is recorded as a cancelled cell.
    pub call_timeout: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            parallel: 4,
            call_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    pub registry: Arc<ProviderRegistry>,
    pub schemas: Arc<SchemaRegistry>,
    pub ledger: Arc<dyn CostLedger>,
    pub policy: RunPolicy,
    pub optimizer: Option<Arc<dyn PromptOptimizer>>,
}

impl Runner {
    /// Single baseline pass over the full grid.
    pub async fn run_all(
        &self,
        suite: &str,
        cases: &[TestCase],
        providers: &[ProviderSpec],
        progress: Option<ProgressSink>,
    ) -> anyhow::Result<RunResult> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now();
        self.ledger.create_run(&run_id, suite)?;
        emit(
            &progress,
            ProgressEvent::RunStarted {
                total_cells: cases.len() * providers.len(),
            },
        );

        let prompts: Vec<String> = cases.iter().map(|tc| tc.prompt_text.clone()).collect();
        let case_results = self
            .run_phase(&run_id, cases, &prompts, providers, progress.clone())
            .await?;

        emit(
            &progress,
            ProgressEvent::RunFinished {
                cells_done: cases.len() * providers.len(),
            },
        );
        self.ledger.finalize_run(&run_id, "complete")?;

        Ok(RunResult {
            run_id,
            started_at,
            cases: case_results,
        })
    }

    /// Two-phase workflow: baseline the grid, ask the optimizer for a revised
    /// prompt per case, re-run the grid with the revisions, and pair the
    /// passes per case. Requires an optimizer; its absence is a caller
    /// contract violation.
    pub async fn run_optimized(
        &self,
        suite: &str,
        cases: &[TestCase],
        providers: &[ProviderSpec],
        progress: Option<ProgressSink>,
    ) -> anyhow::Result<OptimizeReport> {
        let optimizer = self
            .optimizer
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("optimize mode requires a prompt optimizer"))?
            .clone();

        let run_id = Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now();
        self.ledger.create_run(&run_id, suite)?;
        emit(
            &progress,
            ProgressEvent::RunStarted {
                total_cells: cases.len() * providers.len() * 2,
            },
        );

        let baseline_prompts: Vec<String> =
            cases.iter().map(|tc| tc.prompt_text.clone()).collect();
        let baseline = self
            .run_phase(&run_id, cases, &baseline_prompts, providers, progress.clone())
            .await?;

        // A failed optimization falls back to the original prompt for that
        // case; the second pass still runs.
        let mut revised_prompts = Vec::with_capacity(cases.len());
        for (tc, base) in cases.iter().zip(&baseline) {
            match optimizer.improve(tc, base).await {
                Ok(revised) => revised_prompts.push(revised),
                Err(e) => {
                    tracing::warn!(test_id = %tc.test_id(), error = %e, "prompt optimization failed");
                    revised_prompts.push(tc.prompt_text.clone());
                }
            }
        }

        let optimized = self
            .run_phase(&run_id, cases, &revised_prompts, providers, progress.clone())
            .await?;

        emit(
            &progress,
            ProgressEvent::RunFinished {
                cells_done: cases.len() * providers.len() * 2,
            },
        );
        self.ledger.finalize_run(&run_id, "complete")?;

        let paired = baseline
            .into_iter()
            .zip(optimized)
            .zip(revised_prompts)
            .map(|((base, opt), revised_prompt)| OptimizedCase {
                test_id: base.test_id.clone(),
                revised_prompt,
                baseline: base,
                optimized: opt,
            })
            .collect();

        Ok(OptimizeReport {
            run_id,
            started_at,
            cases: paired,
        })
    }

    /// One pass over the grid with the given per-case prompts. Cells fan out
    /// under a bounded semaphore; the single drain loop below is the only
    /// writer of the grid, so caller ordering survives out-of-order
    /// completion.
    async fn run_phase(
        &self,
        run_id: &str,
        cases: &[TestCase],
        prompts: &[String],
        providers: &[ProviderSpec],
        progress: Option<ProgressSink>,
    ) -> anyhow::Result<Vec<CaseResult>> {
        let sem = Arc::new(Semaphore::new(self.policy.parallel.max(1)));
        let mut join_set = JoinSet::new();
        // Task id -> grid coordinates, so a panicked task can still be
        // attributed to its cell.
        let mut keys: HashMap<tokio::task::Id, (usize, usize)> = HashMap::new();

        for (ci, (tc, prompt)) in cases.iter().zip(prompts).enumerate() {
            emit(
                &progress,
                ProgressEvent::CaseStarted {
                    test_id: tc.test_id(),
                },
            );
            for (pi, spec) in providers.iter().enumerate() {
                let permit = sem.clone().acquire_owned().await?;
                let this = self.clone();
                let run_id = run_id.to_string();
                let tc = tc.clone();
                let prompt = prompt.clone();
                let spec = spec.clone();
                let progress = progress.clone();
                let handle = join_set.spawn(async move {
                    let _permit = permit;
                    emit(
                        &progress,
                        ProgressEvent::ProviderStarted {
                            test_id: tc.test_id(),
                            provider_id: spec.provider_id.clone(),
                        },
                    );
                    let cell = this.run_cell(&run_id, &tc, &prompt, &spec).await;
                    emit(
                        &progress,
                        ProgressEvent::ProviderFinished {
                            test_id: tc.test_id(),
                            provider_id: spec.provider_id.clone(),
                            accuracy: cell.success().then(|| cell.accuracy()),
                        },
                    );
                    (ci, pi, cell)
                });
                keys.insert(handle.id(), (ci, pi));
            }
        }

        let mut grid: Vec<Vec<Option<ProviderCell>>> =
            (0..cases.len()).map(|_| vec![None; providers.len()]).collect();
        let mut remaining: Vec<usize> = vec![providers.len(); cases.len()];

        while let Some(joined) = join_set.join_next_with_id().await {
            let ci = match joined {
                Ok((_, (ci, pi, cell))) => {
                    grid[ci][pi] = Some(cell);
                    ci
                }
                Err(e) => {
                    // The hole is backfilled below so the grid stays
                    // complete; the case counter still advances.
                    tracing::error!(error = %e, "cell task failed to join");
                    match keys.get(&e.id()) {
                        Some(&(ci, _)) => ci,
                        None => continue,
                    }
                }
            };
            remaining[ci] -= 1;
            if remaining[ci] == 0 {
                emit(
                    &progress,
                    ProgressEvent::CaseFinished {
                        test_id: cases[ci].test_id(),
                    },
                );
            }
        }

        let results = cases
            .iter()
            .zip(prompts)
            .zip(grid)
            .map(|((tc, prompt), row)| CaseResult {
                test_id: tc.test_id(),
                prompt_used: prompt.clone(),
                cells: row
                    .into_iter()
                    .zip(providers)
                    .map(|(cell, spec)| cell.unwrap_or_else(|| aborted_cell(spec)))
                    .collect(),
            })
            .collect();

        Ok(results)
    }

    /// Process one cell. Infallible by construction: every failure becomes
    /// the recorded outcome.
    async fn run_cell(
        &self,
        run_id: &str,
        tc: &TestCase,
        prompt: &str,
        spec: &ProviderSpec,
    ) -> ProviderCell {
        let Some(gateway) = self.registry.gateway(&spec.provider_id) else {
            return error_cell(
                spec,
                ProviderError::new(
                    &spec.provider_id,
                    ProviderErrorKind::Other,
                    format!("unknown provider '{}'", spec.provider_id),
                ),
            );
        };
        let model = self
            .registry
            .resolve_model(&spec.provider_id, spec.model_override.as_deref())
            .unwrap_or_else(|| "unknown".to_string());

        let call = gateway.invoke(prompt, &tc.source_text, spec.model_override.as_deref());
        let reply = match timeout(self.policy.call_timeout, call).await {
            Err(_) => {
                let err = ProviderError::cancelled(
                    &spec.provider_id,
                    format!("cancelled after {:?}", self.policy.call_timeout),
                );
                return ProviderCell {
                    provider_id: spec.provider_id.clone(),
                    model_used: model,
                    response: None,
                    usage: None,
                    outcome: CellOutcome::ProviderError(err),
                };
            }
            Ok(Err(err)) => {
                return ProviderCell {
                    provider_id: spec.provider_id.clone(),
                    model_used: model,
                    response: None,
                    usage: None,
                    outcome: CellOutcome::ProviderError(err),
                };
            }
            Ok(Ok(reply)) => reply,
        };

        if let Err(e) = self.ledger.record(
            run_id,
            &tc.test_id(),
            &spec.provider_id,
            &reply.model,
            &reply.usage,
        ) {
            tracing::warn!(test_id = %tc.test_id(), error = %e, "cost ledger write failed");
        }

        let outcome = self.evaluate(tc, &reply.text);
        ProviderCell {
            provider_id: spec.provider_id.clone(),
            model_used: reply.model,
            response: Some(reply.text),
            usage: Some(reply.usage),
            outcome: CellOutcome::Evaluated(outcome),
        }
    }

    /// Normalizer -> validator -> scorer. Failures are values; a null or
    /// non-object expectation is a caller contract violation.
    fn evaluate(&self, tc: &TestCase, raw: &str) -> ValidationOutcome {
        let value = match normalize(raw) {
            Ok(v) => v,
            Err(failure) => {
                return ValidationOutcome::ParseFailure {
                    reason: failure.reason,
                    excerpt: failure.excerpt,
                }
            }
        };

        let validated = match self.schemas.validate(&tc.schema_ref, value) {
            Ok(v) => v,
            Err(failure) => {
                return ValidationOutcome::SchemaFailure {
                    reason: failure.reason,
                    raw: failure.raw,
                }
            }
        };

        let actual = validated
            .as_object()
            .expect("schema validation guarantees an object");
        let expected = tc
            .expected_data
            .as_object()
            .expect("expected_data must be a JSON object");
        let (accuracy, field_scores) = score(actual, expected);

        ValidationOutcome::Success {
            validated,
            accuracy,
            field_scores,
        }
    }
}

fn emit(progress: &Option<ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = progress {
        sink(event);
    }
}

fn error_cell(spec: &ProviderSpec, err: ProviderError) -> ProviderCell {
    ProviderCell {
        provider_id: spec.provider_id.clone(),
        model_used: spec
            .model_override
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        response: None,
        usage: None,
        outcome: CellOutcome::ProviderError(err),
    }
}

fn aborted_cell(spec: &ProviderSpec) -> ProviderCell {
    error_cell(
        spec,
        ProviderError::new(
            &spec.provider_id,
            ProviderErrorKind::Other,
            "cell task aborted",
        ),
    )
}
