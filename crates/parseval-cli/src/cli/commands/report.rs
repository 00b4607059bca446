use crate::exit_codes;
use parseval_core::report::{console, json};
use std::path::Path;

/// Re-render a saved artifact; the exit code mirrors what the original run
/// would have returned.
pub fn execute(artifact: &Path) -> anyhow::Result<i32> {
    let artifacts = json::read_artifacts(artifact)?;
    console::print_summary(&artifacts);

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
