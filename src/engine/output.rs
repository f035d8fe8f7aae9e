//! Decoding of `<engine> output -json`.

use crate::core::error::{Error, Result};
use crate::core::types::{OutputValues, TypedValue};

/// Decode machine-readable output into name → typed value.
///
/// The document must be a JSON object whose entries are objects carrying a
/// `value` field (`{"id": {"sensitive": false, "type": "string", "value": "x"}}`).
pub fn parse_outputs(raw: &str) -> Result<OutputValues> {
    let doc: TypedValue =
        serde_json::from_str(raw).map_err(|e| Error::OutputParse(e.to_string()))?;
    let TypedValue::Object(entries) = doc else {
        return Err(Error::OutputParse(
            "expected a JSON object of outputs".to_string(),
        ));
    };

    let mut values = OutputValues::new();
    for (name, entry) in entries {
        let value = entry
            .as_object()
            .and_then(|obj| obj.get("value"))
            .ok_or_else(|| Error::OutputParse(format!("output '{}' has no value", name)))?;
        values.insert(name, value.clone());
    }
    Ok(values)
}
