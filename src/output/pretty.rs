use serde_json::Value;

use crate::error::GenifestError;
use crate::format::Format;
use crate::parser::toml::json_to_toml;

/// Serialize a Value as a document in the given format.
pub fn format_value(value: &Value, format: Format) -> Result<String, GenifestError> {
    match format {
        Format::Yaml => format_yaml(value),
        Format::Toml => format_toml(value),
        Format::Json => format_json(value),
    }
}

/// Serialize a document stream. YAML documents are separated by `---`;
/// the other formats only ever hold one document.
pub fn format_documents(docs: &[Value], format: Format) -> Result<String, GenifestError> {
    let mut buf = String::new();
    for (i, doc) in docs.iter().enumerate() {
        if i > 0 {
            if format != Format::Yaml {
                return Err(GenifestError::Document(format!(
                    "{format} cannot hold more than one document"
                )));
            }
            buf.push_str("---\n");
        }
        let formatted = format_value(doc, format)?;
        buf.push_str(&formatted);
        if !formatted.ends_with('\n') {
            buf.push('\n');
        }
    }
    Ok(buf)
}

fn format_json(value: &Value) -> Result<String, GenifestError> {
    serde_json::to_string_pretty(value).map_err(|e| GenifestError::Document(e.to_string()))
}

fn format_yaml(value: &Value) -> Result<String, GenifestError> {
    serde_yaml::to_string(value).map_err(|e| GenifestError::Document(e.to_string()))
}

fn format_toml(value: &Value) -> Result<String, GenifestError> {
    let table = json_to_toml(value)?;
    toml::to_string(&table).map_err(|e| GenifestError::Document(e.to_string()))
}
