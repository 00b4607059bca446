//! Progress events emitted by the runner. Purely observational: consumers
//! may render them, but they never influence control flow or ordering.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        total_cells: usize,
    },
    CaseStarted {
        test_id: String,
    },
    ProviderStarted {
        test_id: String,
        provider_id: String,
    },
    ProviderFinished {
        test_id: String,
        provider_id: String,
        accuracy: Option<f64>,
    },
    CaseFinished {
        test_id: String,
    },
    RunFinished {
        cells_done: usize,
    },
}

/// Best-effort sink; the runner calls it as work completes.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
