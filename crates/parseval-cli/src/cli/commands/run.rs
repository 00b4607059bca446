use crate::exit_codes;
use parseval_core::config::EvalConfig;
use parseval_core::discovery;
use parseval_core::engine::{RunPolicy, Runner};
use parseval_core::ledger::{CostLedger, Store};
use parseval_core::model::RunResult;
use parseval_core::optimize::{LlmPromptOptimizer, PromptOptimizer};
use parseval_core::providers::anthropic::AnthropicGateway;
use parseval_core::providers::fake::FakeGateway;
use parseval_core::providers::openai::OpenAiCompatGateway;
use parseval_core::providers::ProviderGateway;
use parseval_core::registry::{ProviderRegistry, SystemClock};
use parseval_core::report::progress::{ProgressEvent, ProgressSink};
use parseval_core::report::{console, json, RunArtifacts};
use parseval_core::schema::SchemaRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct RunOptions {
    pub config: PathBuf,
    pub optimize: bool,
    pub json_out: Option<PathBuf>,
    pub parallel: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

pub async fn execute(opts: RunOptions) -> anyhow::Result<i32> {
    let cfg = EvalConfig::load(&opts.config)?;
    let suite = discovery::discover(&cfg.cases_dir)?;
    if suite.cases.is_empty() {
        eprintln!("no test cases found under {}", cfg.cases_dir.display());
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let schemas = Arc::new(SchemaRegistry::from_descriptors(&suite.schemas)?);
    let registry = Arc::new(build_registry(&cfg)?);

    let store = match &cfg.settings.ledger_path {
        Some(path) => Store::open(path)?,
        None => Store::memory()?,
    };
    store.init_schema()?;

    // The first configured provider also powers prompt optimization.
    let optimizer = cfg
        .providers
        .first()
        .and_then(|p| registry.gateway(&p.id))
        .map(|g| {
            Arc::new(LlmPromptOptimizer::new(g).with_schemas(&suite.schemas))
                as Arc<dyn PromptOptimizer>
        });

    let parallel = opts.parallel.or(cfg.settings.parallel).unwrap_or(4);
    let timeout_seconds = opts
        .timeout_seconds
        .or(cfg.settings.timeout_seconds)
        .unwrap_or(60);

    let runner = Runner {
        registry,
        schemas,
        ledger: Arc::new(store.clone()) as Arc<dyn CostLedger>,
        policy: RunPolicy {
            parallel,
            call_timeout: Duration::from_secs(timeout_seconds),
        },
        optimizer,
    };

    let providers = cfg.provider_specs();
    let progress = progress_sink();

    let (result, optimize_report) = if opts.optimize {
        let report = runner
            .run_optimized(&cfg.suite, &suite.cases, &providers, Some(progress))
            .await?;
        let baseline = RunResult {
            run_id: report.run_id.clone(),
            started_at: report.started_at,
            cases: report.cases.iter().map(|c| c.baseline.clone()).collect(),
        };
        (baseline, Some(report))
    } else {
        let result = runner
            .run_all(&cfg.suite, &suite.cases, &providers, Some(progress))
            .await?;
        (result, None)
    };

    let artifacts = RunArtifacts {
        costs: store.cost_summary(&result.run_id)?,
        result,
        optimize: optimize_report,
        configuration_errors: suite.errors,
    };

    console::print_summary(&artifacts);
    if let Some(path) = &opts.json_out {
        json::write_artifacts(&artifacts, path)?;
    }

    let any_failed = artifacts
        .result
        .cases
        .iter()
        .flat_map(|c| &c.cells)
        .any(|cell| !cell.success());
    Ok(if any_failed {
        exit_codes::EVAL_FAILURES
    } else {
        exit_codes::OK
    })
}

fn build_registry(cfg: &EvalConfig) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new(Arc::new(SystemClock));
    for entry in &cfg.providers {
        let gateway: Arc<dyn ProviderGateway> = match entry.id.as_str() {
            "openai" => Arc::new(OpenAiCompatGateway::openai(api_key("OPENAI_API_KEY")?)),
            "openrouter" => Arc::new(OpenAiCompatGateway::openrouter(api_key(
                "OPENROUTER_API_KEY",
            )?)),
            "mistral" => Arc::new(OpenAiCompatGateway::mistral(api_key("MISTRAL_API_KEY")?)),
            "anthropic" => Arc::new(AnthropicGateway::new(api_key("ANTHROPIC_API_KEY")?)),
            // Scripted provider for local smoke runs; echoes an empty object.
            "fake" => Arc::new(FakeGateway::new("fake")),
            other => {
                // Left unregistered: each of its cells records a provider
                // error and the rest of the grid still runs.
                tracing::warn!(provider = %other, "unknown provider id in config");
                continue;
            }
        };
        registry.register(gateway);
    }
    Ok(registry)
}

fn api_key(var: &str) -> anyhow::Result<String> {
    std::env::var(var).map_err(|_| anyhow::anyhow!("config error: {} is not set", var))
}

fn progress_sink() -> ProgressSink {
    Arc::new(|event: ProgressEvent| match event {
        ProgressEvent::RunStarted { total_cells } => {
            eprintln!("running {} cells", total_cells);
        }
        ProgressEvent::ProviderFinished {
            test_id,
            provider_id,
            accuracy,
        } => match accuracy {
            Some(pct) => eprintln!("  {} × {}: {:.1}%", test_id, provider_id, pct),
            None => eprintln!("  {} × {}: failed", test_id, provider_id),
        },
        ProgressEvent::RunFinished { cells_done } => {
            eprintln!("done ({} cells)", cells_done);
        }
        _ => {}
    })
}
