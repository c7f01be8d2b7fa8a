//! JSON Schema validation adapter.
//!
//! Thin wrapper over the `jsonschema` crate: schemas are compiled once at
//! registration time and reused for every message. Validation distinguishes
//! a document the validator could not process at all (`System`) from a
//! well-formed document that violates the schema (`Failed`).

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by schema compilation and validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document itself could not be parsed or compiled.
    #[error("invalid schema: {0}")]
    Compile(String),
    /// The validator could not process the document (not JSON at all).
    #[error("schema validation system error: {0}")]
    System(#[from] serde_json::Error),
    /// The document is well-formed JSON but violates the schema.
    #[error("schema validation failed: {0}")]
    Failed(String),
}

/// A JSON Schema compiled once and shared across validations.
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Parses and compiles a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Compile`] when the document is not JSON or not
    /// a valid schema.
    pub fn compile(schema: &str) -> Result<Self, SchemaError> {
        let document: Value =
            serde_json::from_str(schema).map_err(|err| SchemaError::Compile(err.to_string()))?;
        let compiled = jsonschema::validator_for(&document)
            .map_err(|err| SchemaError::Compile(err.to_string()))?;
        Ok(Self { compiled })
    }

    /// Validates raw bytes against the compiled schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::System`] when the bytes are not JSON and
    /// [`SchemaError::Failed`] listing every violation otherwise.
    pub fn validate_bytes(&self, document: &[u8]) -> Result<(), SchemaError> {
        let document: Value = serde_json::from_slice(document)?;
        self.validate_value(&document)
    }

    /// Validates an already-parsed document against the compiled schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Failed`] listing every violation.
    pub fn validate_value(&self, document: &Value) -> Result<(), SchemaError> {
        let violations: Vec<String> = self
            .compiled
            .iter_errors(document)
            .map(|err| err.to_string())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Failed(violations.join("; ")))
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
