use super::RunArtifacts;
use anyhow::Context;
use std::path::Path;

pub fn write_artifacts(artifacts: &RunArtifacts, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(artifacts)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

pub fn read_artifacts(path: &Path) -> anyhow::Result<RunArtifacts> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid report artifact {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::CostSummary;
    use crate::model::{CaseResult, RunResult};

    #[test]
    fn artifacts_round_trip_through_json() {
        let artifacts = RunArtifacts {
            result: RunResult {
                run_id: "r1".to_string(),
                started_at: chrono::Utc::now(),
                cases: vec![CaseResult {
                    test_id: "m/a".to_string(),
                    prompt_used: "p".to_string(),
                    cells: Vec::new(),
                }],
            },
            optimize: None,
            costs: CostSummary::default(),
            configuration_errors: Vec::new(),
        };

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.json");
        write_artifacts(&artifacts, &path).unwrap();

        let loaded = read_artifacts(&path).unwrap();
        assert_eq!(loaded.result.run_id, "r1");
        assert_eq!(loaded.result.cases[0].test_id, "m/a");
    }

    #[test]
    fn missing_or_malformed_artifact_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_artifacts(&tmp.path().join("absent.json")).is_err());

        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_artifacts(&path).is_err());
    }
}
