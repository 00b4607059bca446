//! Filesystem test-case discovery. Suite layout:
//!
//! ```text
//! <root>/<module>/schema.json
//! <root>/<module>/<case>/source.txt
//! <root>/<module>/<case>/prompt.txt
//! <root>/<module>/<case>/expected.json
//! ```
//!
//! A malformed module or case is logged, reported as a `ConfigurationError`
//! and skipped; discovery of everything else continues.

use crate::errors::ConfigurationError;
use crate::model::TestCase;
use crate::schema::SchemaDescriptor;
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
pub struct DiscoveredSuite {
    /// Discovery order: modules then cases, both sorted by name. This order
    /// is the run's case order.
    pub cases: Vec<TestCase>,
    pub schemas: Vec<SchemaDescriptor>,
    pub errors: Vec<ConfigurationError>,
}

pub fn discover(root: &Path) -> anyhow::Result<DiscoveredSuite> {
    let mut suite = DiscoveredSuite::default();

    for module_dir in sorted_dirs(root)? {
        let module_id = dir_name(&module_dir);
        let schema_path = module_dir.join("schema.json");

        let schema = match read_json(&schema_path) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(module = %module_id, error = %e, "skipping module");
                suite.errors.push(ConfigurationError::at_path(
                    schema_path.display().to_string(),
                    format!("module '{}': {}", module_id, e),
                ));
                continue;
            }
        };
        suite.schemas.push(SchemaDescriptor {
            module_id: module_id.clone(),
            schema,
        });

        for case_dir in sorted_dirs(&module_dir)? {
            let case_name = dir_name(&case_dir);
            match load_case(&module_id, &case_name, &case_dir) {
                Ok(tc) => suite.cases.push(tc),
                Err(e) => {
                    tracing::warn!(module = %module_id, case = %case_name, error = %e, "skipping case");
                    suite.errors.push(ConfigurationError::at_path(
                        case_dir.display().to_string(),
                        format!("case '{}/{}': {}", module_id, case_name, e),
                    ));
                }
            }
        }
    }

    Ok(suite)
}

fn load_case(module_id: &str, case_name: &str, dir: &Path) -> anyhow::Result<TestCase> {
    let source_text = read_text(&dir.join("source.txt"))?;
    let prompt_text = read_text(&dir.join("prompt.txt"))?;
    let expected_data = read_json(&dir.join("expected.json"))?;

    if !expected_data.is_object() {
        anyhow::bail!("expected.json must hold a JSON object");
    }

    Ok(TestCase {
        module_id: module_id.to_string(),
        case_name: case_name.to_string(),
        source_text,
        prompt_text,
        expected_data,
        schema_ref: module_id.to_string(),
    })
}

fn sorted_dirs(path: &Path) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = read_text(path)?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("invalid JSON in {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_case(dir: &Path, expected: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("source.txt"), "Jane Doe is a Senior Engineer.").unwrap();
        fs::write(dir.join("prompt.txt"), "Extract the job record as JSON.").unwrap();
        fs::write(dir.join("expected.json"), expected).unwrap();
    }

    #[test]
    fn discovers_cases_in_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        let module = tmp.path().join("jobs");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("schema.json"), r#"{"type": "object"}"#).unwrap();
        write_case(&module.join("b_case"), r#"{"title": "Engineer"}"#);
        write_case(&module.join("a_case"), r#"{"title": "Manager"}"#);

        let suite = discover(tmp.path()).unwrap();
        assert!(suite.errors.is_empty());
        assert_eq!(suite.schemas.len(), 1);
        let ids: Vec<String> = suite.cases.iter().map(|c| c.test_id()).collect();
        assert_eq!(ids, vec!["jobs/a_case", "jobs/b_case"]);
        assert_eq!(suite.cases[0].schema_ref, "jobs");
    }

    #[test]
    fn malformed_case_is_reported_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let module = tmp.path().join("jobs");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("schema.json"), r#"{"type": "object"}"#).unwrap();
        write_case(&module.join("good"), r#"{"title": "Engineer"}"#);

        // expected.json holds an array, not an object
        write_case(&module.join("bad_shape"), r#"[1, 2]"#);
        // missing prompt.txt
        let broken = module.join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("source.txt"), "text").unwrap();
        fs::write(broken.join("expected.json"), "{}").unwrap();

        let suite = discover(tmp.path()).unwrap();
        assert_eq!(suite.cases.len(), 1);
        assert_eq!(suite.cases[0].test_id(), "jobs/good");
        assert_eq!(suite.errors.len(), 2);
    }

    #[test]
    fn module_without_schema_is_reported_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let module = tmp.path().join("no_schema");
        write_case(&module.join("case"), "{}");

        let suite = discover(tmp.path()).unwrap();
        assert!(suite.cases.is_empty());
        assert_eq!(suite.errors.len(), 1);
        assert!(suite.errors[0].detail.contains("no_schema"));
    }
}
