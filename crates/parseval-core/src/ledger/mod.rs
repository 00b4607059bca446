//! Append-only cost ledger: token usage and estimated cost per
//! (run, test case, provider, model), backed by sqlite.

pub mod schema;

use crate::model::UsageData;
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Recording interface the orchestrator depends on. Append-only for the
/// duration of a run.
pub trait CostLedger: Send + Sync {
    fn create_run(&self, run_id: &str, suite: &str) -> anyhow::Result<()>;
    fn record(
        &self,
        run_id: &str,
        test_id: &str,
        provider_id: &str,
        model: &str,
        usage: &UsageData,
    ) -> anyhow::Result<()>;
    fn finalize_run(&self, run_id: &str, status: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCost {
    pub provider_id: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub per_provider: Vec<ProviderCost>,
    pub total_usd: f64,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite ledger")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn =
            Connection::open_in_memory().context("failed to open in-memory sqlite ledger")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(schema::DDL)?;
        Ok(())
    }

    /// Token/cost roll-up per (provider, model) for one run, ordered by
    /// provider id for stable rendering.
    pub fn cost_summary(&self, run_id: &str) -> anyhow::Result<CostSummary> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT provider_id, model,
                    SUM(prompt_tokens), SUM(completion_tokens), SUM(cost_usd)
             FROM usage WHERE run_id = ?1
             GROUP BY provider_id, model
             ORDER BY provider_id, model",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok(ProviderCost {
                provider_id: row.get(0)?,
                model: row.get(1)?,
                prompt_tokens: row.get::<_, i64>(2)? as u64,
                completion_tokens: row.get::<_, i64>(3)? as u64,
                cost_usd: row.get(4)?,
            })
        })?;

        let mut summary = CostSummary::default();
        for row in rows {
            let row = row?;
            summary.total_usd += row.cost_usd;
            summary.per_provider.push(row);
        }
        Ok(summary)
    }
}

impl CostLedger for Store {
    fn create_run(&self, run_id: &str, suite: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO runs(id, suite, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, suite, Utc::now().to_rfc3339(), "running"],
        )?;
        Ok(())
    }

    fn record(
        &self,
        run_id: &str,
        test_id: &str,
        provider_id: &str,
        model: &str,
        usage: &UsageData,
    ) -> anyhow::Result<()> {
        let cost = estimate_cost(model, usage);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO usage(run_id, test_id, provider_id, model,
                               prompt_tokens, completion_tokens, cost_usd, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                test_id,
                provider_id,
                model,
                usage.prompt_tokens as i64,
                usage.completion_tokens as i64,
                cost,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn finalize_run(&self, run_id: &str, status: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status, run_id],
        )?;
        Ok(())
    }
}

/// USD per 1M tokens (input, output), matched by model-name prefix.
/// Unknown models cost 0 — the token counts are still recorded.
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("claude-3-5-haiku", 0.80, 4.00),
    ("claude-3-5-sonnet", 3.00, 15.00),
    ("mistral-small", 0.20, 0.60),
    ("mistral-large", 2.00, 6.00),
];

pub fn estimate_cost(model: &str, usage: &UsageData) -> f64 {
    for (prefix, input, output) in PRICING {
        if model.starts_with(prefix) {
            return (usage.prompt_tokens as f64 * input
                + usage.completion_tokens as f64 * output)
                / 1_000_000.0;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let s = Store::memory().expect("in-memory store");
        s.init_schema().expect("schema init");
        s
    }

    #[test]
    fn usage_rolls_up_per_provider_and_model() {
        let s = store();
        s.create_run("r1", "suite").unwrap();
        let usage = UsageData {
            prompt_tokens: 1000,
            completion_tokens: 500,
        };
        s.record("r1", "m/a", "openai", "gpt-4o-mini", &usage).unwrap();
        s.record("r1", "m/b", "openai", "gpt-4o-mini", &usage).unwrap();
        s.record("r1", "m/a", "anthropic", "claude-3-5-haiku-latest", &usage)
            .unwrap();
        s.finalize_run("r1", "complete").unwrap();

        let summary = s.cost_summary("r1").unwrap();
        assert_eq!(summary.per_provider.len(), 2);
        let openai = &summary.per_provider[1];
        assert_eq!(openai.provider_id, "openai");
        assert_eq!(openai.prompt_tokens, 2000);
        assert_eq!(openai.completion_tokens, 1000);
        assert!(summary.total_usd > 0.0);
    }

    #[test]
    fn runs_are_isolated_in_the_summary() {
        let s = store();
        s.create_run("r1", "suite").unwrap();
        s.create_run("r2", "suite").unwrap();
        let usage = UsageData {
            prompt_tokens: 10,
            completion_tokens: 10,
        };
        s.record("r1", "m/a", "openai", "gpt-4o-mini", &usage).unwrap();
        assert!(s.cost_summary("r2").unwrap().per_provider.is_empty());
    }

    #[test]
    fn unknown_model_costs_zero_but_counts_tokens() {
        let usage = UsageData {
            prompt_tokens: 100,
            completion_tokens: 100,
        };
        assert_eq!(estimate_cost("mystery-model", &usage), 0.0);
        assert!(estimate_cost("gpt-4o-mini-2024", &usage) > 0.0);
    }
}
