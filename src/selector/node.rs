use serde_json::{Number, Value};

use crate::error::GenifestError;

/// Render a scalar node as text. Maps and arrays have no scalar rendering.
pub fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// Resolve a possibly negative index against a sequence length.
pub fn resolve_index(index: i64, length: usize) -> Result<usize, GenifestError> {
    let resolved = if index < 0 {
        length as i64 + index
    } else {
        index
    };
    if resolved < 0 || resolved >= length as i64 {
        return Err(GenifestError::IndexOutOfBounds { index, length });
    }
    Ok(resolved as usize)
}

/// Resolve slice bounds into a `start..end` range inside `0..=length`.
/// Never fails; inverted bounds produce an empty range.
pub fn resolve_slice(start: Option<i64>, end: Option<i64>, length: usize) -> (usize, usize) {
    let clamp = |bound: i64| -> usize {
        let b = if bound < 0 {
            length as i64 + bound
        } else {
            bound
        };
        b.clamp(0, length as i64) as usize
    };
    let s = start.map_or(0, clamp);
    let e = end.map_or(length, clamp);
    if s > e {
        (s, s)
    } else {
        (s, e)
    }
}

/// Overwrite a scalar in place. Returns false when the rendered text already
/// equals `new_value`. The scalar keeps its kind when the text parses as it.
pub fn write_scalar(target: &mut Value, new_value: &str) -> Result<bool, GenifestError> {
    let Some(current) = render_scalar(target) else {
        return Err(GenifestError::type_mismatch("scalar", kind_name(target)));
    };
    if current == new_value {
        return Ok(false);
    }
    *target = rescalar(target, new_value);
    Ok(true)
}

fn rescalar(existing: &Value, text: &str) -> Value {
    match existing {
        Value::Number(_) => {
            if let Ok(i) = text.parse::<i64>() {
                return Value::Number(i.into());
            }
            if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
                return Value::Number(n);
            }
        }
        Value::Bool(_) => match text {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        },
        _ => {}
    }
    Value::String(text.to_string())
}
