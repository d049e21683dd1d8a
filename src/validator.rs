//! Mapped output validation against JSON Schemas.

use serde_json::Value;

use crate::error::{ValidateError, Violation};

/// Validate a mapped result against a JSON Schema.
///
/// Every violation is collected, each with the JSON Pointer of the
/// offending output field.
///
/// # Errors
///
/// Returns `ValidateError::InvalidSchema` if `schema` isn't a usable JSON
/// Schema, or `ValidateError::Invalid` if the output doesn't match it.
pub fn validate_output(output: &Value, schema: &Value) -> Result<(), ValidateError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let violations: Vec<Violation> = validator
        .iter_errors(output)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { violations })
    }
}
