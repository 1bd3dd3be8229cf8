pub mod json;
pub mod toml;
pub mod yaml;

use serde_json::Value;

use crate::error::GenifestError;
use crate::format::Format;

/// Parse input text into a serde_json::Value based on format.
pub fn parse(input: &str, format: Format) -> Result<Value, GenifestError> {
    match format {
        Format::Yaml => yaml::parse(input),
        Format::Toml => toml::parse(input),
        Format::Json => json::parse(input),
    }
}

/// Parse every document in the input. Only YAML carries more than one.
pub fn parse_documents(input: &str, format: Format) -> Result<Vec<Value>, GenifestError> {
    match format {
        Format::Yaml => yaml::parse_documents(input),
        Format::Toml | Format::Json => Ok(vec![parse(input, format)?]),
    }
}
