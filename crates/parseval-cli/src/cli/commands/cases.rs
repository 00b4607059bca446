use crate::exit_codes;
use parseval_core::config::EvalConfig;
use parseval_core::discovery;
use std::path::Path;

pub fn execute(config: &Path) -> anyhow::Result<i32> {
    let cfg = EvalConfig::load(config)?;
    let suite = discovery::discover(&cfg.cases_dir)?;

    for tc in &suite.cases {
        println!("{}", tc.test_id());
    }
    for err in &suite.errors {
        eprintln!("config: {}", err);
    }

    if suite.cases.is_empty() {
        eprintln!("no test cases found under {}", cfg.cases_dir.display());
        return Ok(exit_codes::CONFIG_ERROR);
    }
    Ok(exit_codes::OK)
}
