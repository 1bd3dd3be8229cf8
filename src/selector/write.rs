use log::debug;
use serde_json::Value;

use crate::error::GenifestError;

use super::ast::{Bracket, Component, Expression};
use super::eval::{locate, PathSegment};
use super::node::{kind_name, resolve_index, write_scalar};

/// Write `new_value` at the location `expr` selects, reporting whether the
/// document changed.
///
/// Plain field/index paths are followed directly, and a missing final field is
/// created. Anything else (iteration, `select`, pipelines, quoted keys) is
/// resolved through the evaluator first, so only the first matching node is
/// written.
pub fn set_value(tree: &mut Value, expr: &Expression, new_value: &str) -> Result<bool, GenifestError> {
    if let Some(components) = expr
        .simple_path()
        .filter(|components| components.iter().all(is_direct))
    {
        return set_direct(tree, components, new_value);
    }

    debug!("resolving write target for {:?} by evaluation", expr.source);
    let segments = locate(tree, expr)?;
    let target = navigate_mut(tree, &segments)?;
    write_scalar(target, new_value)
}

fn is_direct(component: &Component) -> bool {
    matches!(
        component,
        Component::Field(_) | Component::Bracket(Bracket::Index(_))
    )
}

fn set_direct(
    tree: &mut Value,
    components: &[Component],
    new_value: &str,
) -> Result<bool, GenifestError> {
    let Some((last, parents)) = components.split_last() else {
        return write_scalar(tree, new_value);
    };

    let mut current = tree;
    for component in parents {
        current = child_mut(current, component)?;
    }

    match (last, current) {
        (Component::Field(name), Value::Object(map)) => {
            if let Some(existing) = map.get_mut(name) {
                return write_scalar(existing, new_value);
            }
            map.insert(name.clone(), Value::String(new_value.to_string()));
            Ok(true)
        }
        (last, current) => write_scalar(child_mut(current, last)?, new_value),
    }
}

fn child_mut<'v>(node: &'v mut Value, component: &Component) -> Result<&'v mut Value, GenifestError> {
    match (component, node) {
        (Component::Field(name), Value::Object(map)) => map
            .get_mut(name)
            .ok_or_else(|| GenifestError::NotFound(format!("field {name:?}"))),
        (Component::Field(_), other) => Err(GenifestError::type_mismatch("map", kind_name(other))),
        (Component::Bracket(Bracket::Index(index)), Value::Array(arr)) => {
            let i = resolve_index(*index, arr.len())?;
            Ok(&mut arr[i])
        }
        (Component::Bracket(Bracket::Index(_)), other) => {
            Err(GenifestError::type_mismatch("array", kind_name(other)))
        }
        (component, _) => Err(GenifestError::Evaluation(format!(
            "cannot write through {component:?}"
        ))),
    }
}

fn navigate_mut<'v>(
    tree: &'v mut Value,
    segments: &[PathSegment],
) -> Result<&'v mut Value, GenifestError> {
    let mut current = tree;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .get_mut(key)
                .ok_or_else(|| GenifestError::NotFound(format!("field {key:?}")))?,
            (PathSegment::Index(i), Value::Array(arr)) => {
                let length = arr.len();
                arr.get_mut(*i).ok_or(GenifestError::IndexOutOfBounds {
                    index: *i as i64,
                    length,
                })?
            }
            (_, other) => {
                return Err(GenifestError::type_mismatch("map or array", kind_name(other)))
            }
        };
    }
    Ok(current)
}
