//! Thin adapter over `jsonschema`: turns a normalized value into a validated
//! one or a typed schema failure that keeps the raw value inspectable.
//!
//! Schemas are registered in an explicit table keyed by module id, populated
//! once at configuration load time. Nothing is discovered at call time.

use crate::errors::ConfigurationError;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One module's target schema, as loaded from its `schema.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub module_id: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFailure {
    /// The constraint violation text, verbatim from the validator.
    pub reason: String,
    pub raw: serde_json::Value,
}

#[derive(Debug)]
pub struct SchemaRegistry {
    validators: HashMap<String, Validator>,
}

impl SchemaRegistry {
    /// Compile every descriptor up front. A schema that fails to compile is a
    /// configuration error, not a per-response one.
    pub fn from_descriptors(
        descriptors: &[SchemaDescriptor],
    ) -> Result<Self, ConfigurationError> {
        let mut validators = HashMap::with_capacity(descriptors.len());
        for d in descriptors {
            let validator = jsonschema::validator_for(&d.schema).map_err(|e| {
                ConfigurationError::new(format!(
                    "invalid schema for module '{}': {}",
                    d.module_id, e
                ))
            })?;
            validators.insert(d.module_id.clone(), validator);
        }
        Ok(Self { validators })
    }

    pub fn contains(&self, schema_ref: &str) -> bool {
        self.validators.contains_key(schema_ref)
    }

    /// Validate `value` against the schema registered under `schema_ref`.
    /// On success the value passes through unchanged; on failure the original
    /// value is preserved alongside the violation text.
    ///
    /// A missing schema ref is a caller contract violation and panics.
    pub fn validate(
        &self,
        schema_ref: &str,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, SchemaFailure> {
        let validator = self
            .validators
            .get(schema_ref)
            .unwrap_or_else(|| panic!("no schema registered for '{}'", schema_ref));

        let violations: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(SchemaFailure {
                reason: violations.join("; "),
                raw: value,
            });
        }

        if !value.is_object() {
            return Err(SchemaFailure {
                reason: "validated value is not a JSON object".to_string(),
                raw: value,
            });
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_descriptors(&[SchemaDescriptor {
            module_id: "jobs".to_string(),
            schema: json!({
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": {"type": "string"},
                    "years": {"type": "integer"}
                }
            }),
        }])
        .unwrap()
    }

    #[test]
    fn valid_value_passes_through_unchanged() {
        let value = json!({"title": "Engineer", "years": 3});
        assert_eq!(registry().validate("jobs", value.clone()).unwrap(), value);
    }

    #[test]
    fn violation_preserves_raw_value() {
        let value = json!({"years": "three"});
        let failure = registry().validate("jobs", value.clone()).unwrap_err();
        assert_eq!(failure.raw, value);
        assert!(!failure.reason.is_empty());
    }

    #[test]
    fn non_object_top_level_is_a_schema_failure() {
        let reg = SchemaRegistry::from_descriptors(&[SchemaDescriptor {
            module_id: "loose".to_string(),
            schema: json!(true),
        }])
        .unwrap();
        let failure = reg.validate("loose", json!([1, 2])).unwrap_err();
        assert!(failure.reason.contains("not a JSON object"));
    }

    #[test]
    fn invalid_schema_is_a_configuration_error() {
        let err = SchemaRegistry::from_descriptors(&[SchemaDescriptor {
            module_id: "bad".to_string(),
            schema: json!({"type": "no-such-type"}),
        }])
        .unwrap_err();
        assert!(err.detail.contains("bad"));
    }

    #[test]
    #[should_panic(expected = "no schema registered")]
    fn missing_schema_ref_is_a_contract_violation() {
        registry().validate("unknown", json!({})).ok();
    }
}
