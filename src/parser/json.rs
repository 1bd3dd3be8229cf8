use serde_json::Value;

use crate::error::GenifestError;

/// Parse a JSON string into a serde_json::Value.
pub fn parse(input: &str) -> Result<Value, GenifestError> {
    serde_json::from_str(input).map_err(|e| GenifestError::Document(e.to_string()))
}
