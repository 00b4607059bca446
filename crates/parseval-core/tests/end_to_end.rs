//! Discovery -> schema compilation -> orchestrated run against scripted
//! gateways, end to end.

use parseval_core::discovery;
use parseval_core::engine::{RunPolicy, Runner};
use parseval_core::ledger::Store;
use parseval_core::model::{CellOutcome, ProviderSpec, ValidationOutcome};
use parseval_core::providers::fake::FakeGateway;
use parseval_core::registry::{ProviderRegistry, SystemClock};
use parseval_core::schema::SchemaRegistry;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_suite(root: &Path) {
    let module = root.join("jobs");
    fs::create_dir_all(&module).unwrap();
    fs::write(
        module.join("schema.json"),
        r#"{
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        }"#,
    )
    .unwrap();

    let case = module.join("senior_engineer");
    fs::create_dir_all(&case).unwrap();
    fs::write(case.join("source.txt"), "Jane Doe works as a Senior Engineer.").unwrap();
    fs::write(case.join("prompt.txt"), "Extract the job record as JSON.").unwrap();
    fs::write(
        case.join("expected.json"),
        r#"{"title": "Senior Engineer", "tags": ["engineering", "senior"]}"#,
    )
    .unwrap();
}

#[tokio::test]
async fn discovered_suite_runs_to_a_complete_scored_grid() {
    let tmp = tempfile::tempdir().unwrap();
    write_suite(tmp.path());

    let suite = discovery::discover(tmp.path()).unwrap();
    assert!(suite.errors.is_empty());
    assert_eq!(suite.cases.len(), 1);

    let schemas = Arc::new(SchemaRegistry::from_descriptors(&suite.schemas).unwrap());
    let mut registry = ProviderRegistry::new(Arc::new(SystemClock));
    // Perfect answer wrapped in prose + fence, like real model output.
    registry.register(Arc::new(FakeGateway::new("verbose").with_response(
        "Here you go:\n```json\n{\"title\": \"senior engineer\", \"tags\": [\"engineering\", \"senior\"]}\n```",
    )));
    // Partial answer: substring title, one wrong tag.
    registry.register(Arc::new(FakeGateway::new("terse").with_response(
        r#"{"title": "Engineer", "tags": ["engineering", "junior"]}"#,
    )));

    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let runner = Runner {
        registry: Arc::new(registry),
        schemas,
        ledger: Arc::new(store.clone()),
        policy: RunPolicy::default(),
        optimizer: None,
    };

    let providers = vec![ProviderSpec::new("verbose"), ProviderSpec::new("terse")];
    let result = runner
        .run_all("e2e", &suite.cases, &providers, None)
        .await
        .unwrap();

    assert_eq!(result.cases.len(), 1);
    let case = &result.cases[0];
    assert_eq!(case.test_id, "jobs/senior_engineer");
    assert_eq!(case.cells.len(), 2);

    // Case-folded scalar + equal list: perfect score despite the fence.
    assert_eq!(case.cells[0].accuracy(), 100.0);

    // "Engineer" is a substring of "Senior Engineer" (half weight) and one
    // of two tags matches (half weight): 50% overall.
    let terse = &case.cells[1];
    assert_eq!(terse.accuracy(), 50.0);
    match &terse.outcome {
        CellOutcome::Evaluated(ValidationOutcome::Success { field_scores, .. }) => {
            assert_eq!(field_scores.len(), 2);
        }
        other => panic!("expected scored success, got {:?}", other),
    }

    // Both calls hit the ledger.
    let costs = store.cost_summary(&result.run_id).unwrap();
    assert_eq!(costs.per_provider.len(), 2);
}
