use serde::Deserialize;
use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;

use crate::error::GenifestError;

fn document_error(e: serde_yaml::Error) -> GenifestError {
    GenifestError::Document(e.to_string())
}

/// Parse a single YAML document into a serde_json::Value.
///
/// Manifests are read through serde_yaml and converted so selectors and
/// mutations see one tree type whatever the source format. `<<` merge keys
/// are expanded on the way in.
pub fn parse(input: &str) -> Result<Value, GenifestError> {
    let yaml: Yaml = serde_yaml::from_str(input).map_err(document_error)?;
    convert(yaml)
}

/// Parse a `---` separated YAML stream, one Value per document.
pub fn parse_documents(input: &str) -> Result<Vec<Value>, GenifestError> {
    serde_yaml::Deserializer::from_str(input)
        .map(|document| convert(Yaml::deserialize(document).map_err(document_error)?))
        .collect()
}

fn convert(mut yaml: Yaml) -> Result<Value, GenifestError> {
    yaml.apply_merge().map_err(document_error)?;
    yaml_to_json(yaml)
}

fn yaml_to_json(yaml: Yaml) -> Result<Value, GenifestError> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => Value::Number(number(&n)?),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (k, v) in mapping {
                map.insert(map_key(k)?, yaml_to_json(v)?);
            }
            Value::Object(map)
        }
        // Custom tags (`!Ref`, `!!binary`) keep only their value.
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn number(n: &serde_yaml::Number) -> Result<Number, GenifestError> {
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .ok_or_else(|| GenifestError::Document(format!("cannot represent number {n}")))
}

fn map_key(key: Yaml) -> Result<String, GenifestError> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(GenifestError::Document(format!(
            "map keys must be scalars, found {other:?}"
        ))),
    }
}
