pub mod console;
pub mod json;
pub mod progress;

use crate::ledger::CostSummary;
use crate::model::{OptimizeReport, RunResult};
use serde::{Deserialize, Serialize};

/// Everything a run hands to report renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifacts {
    pub result: RunResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize: Option<OptimizeReport>,
    pub costs: CostSummary,
    /// Per-case discovery failures reported alongside the run.
    pub configuration_errors: Vec<crate::errors::ConfigurationError>,
}
