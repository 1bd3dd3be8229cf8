use serde_json::{Map, Number, Value};
use toml::Value as Toml;

use crate::error::GenifestError;

pub fn parse(input: &str) -> Result<Value, GenifestError> {
    let toml: Toml = toml::from_str(input).map_err(|e| GenifestError::Document(e.to_string()))?;
    toml_to_json(toml)
}

fn toml_to_json(toml: Toml) -> Result<Value, GenifestError> {
    Ok(match toml {
        Toml::String(s) => Value::String(s),
        Toml::Integer(i) => Value::Number(i.into()),
        Toml::Float(f) => Value::Number(Number::from_f64(f).ok_or_else(|| {
            GenifestError::Document(format!("cannot represent number {f}"))
        })?),
        Toml::Boolean(b) => Value::Bool(b),
        // Datetimes are edited as text; writing them back yields a string.
        Toml::Datetime(dt) => Value::String(dt.to_string()),
        Toml::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Toml::Table(table) => {
            let mut map = Map::with_capacity(table.len());
            for (k, v) in table {
                map.insert(k, toml_to_json(v)?);
            }
            Value::Object(map)
        }
    })
}

/// Convert a tree back into a TOML value. TOML has no null.
pub(crate) fn json_to_toml(value: &Value) -> Result<Toml, GenifestError> {
    Ok(match value {
        Value::Null => {
            return Err(GenifestError::Document(
                "TOML cannot represent null values".into(),
            ))
        }
        Value::Bool(b) => Toml::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Toml::Integer(i),
            (None, Some(f)) => Toml::Float(f),
            (None, None) => {
                return Err(GenifestError::Document(format!(
                    "TOML cannot represent number {n}"
                )))
            }
        },
        Value::String(s) => Toml::String(s.clone()),
        Value::Array(items) => Toml::Array(
            items
                .iter()
                .map(json_to_toml)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(map) => {
            let mut table = toml::Table::new();
            for (k, v) in map {
                table.insert(k.clone(), json_to_toml(v)?);
            }
            Toml::Table(table)
        }
    })
}
