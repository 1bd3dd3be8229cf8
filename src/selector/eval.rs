use std::borrow::Cow;

use log::trace;
use serde_json::Value;

use crate::error::GenifestError;

use super::ast::*;
use super::node::{kind_name, render_scalar, resolve_index, resolve_slice};

/// One step on the way from the document root to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A node reached during evaluation.
///
/// `path` locates the node inside the source tree. It is `None` once the node
/// has been derived rather than reached (e.g. a slice), which makes it
/// unusable as a write target.
#[derive(Debug, Clone)]
struct Cursor<'a> {
    node: Cow<'a, Value>,
    path: Option<Vec<PathSegment>>,
}

impl<'a> Cursor<'a> {
    fn root(tree: &'a Value) -> Self {
        Cursor {
            node: Cow::Borrowed(tree),
            path: Some(Vec::new()),
        }
    }

    fn key(self, key: &str) -> Result<Self, GenifestError> {
        let node = match self.node {
            Cow::Borrowed(v) => Cow::Borrowed(lookup_key(v, key)?),
            Cow::Owned(v) => Cow::Owned(lookup_key(&v, key)?.clone()),
        };
        let path = self.path.map(|mut p| {
            p.push(PathSegment::Key(key.to_string()));
            p
        });
        Ok(Cursor { node, path })
    }

    fn index(self, index: i64) -> Result<Self, GenifestError> {
        let (resolved, node) = match self.node {
            Cow::Borrowed(v) => {
                let (i, item) = lookup_index(v, index)?;
                (i, Cow::Borrowed(item))
            }
            Cow::Owned(v) => {
                let (i, item) = lookup_index(&v, index)?;
                (i, Cow::Owned(item.clone()))
            }
        };
        let path = self.path.map(|mut p| {
            p.push(PathSegment::Index(resolved));
            p
        });
        Ok(Cursor { node, path })
    }

    fn slice(self, start: Option<i64>, end: Option<i64>) -> Result<Self, GenifestError> {
        match &*self.node {
            Value::Array(arr) => {
                let (s, e) = resolve_slice(start, end, arr.len());
                Ok(Cursor {
                    node: Cow::Owned(Value::Array(arr[s..e].to_vec())),
                    path: None,
                })
            }
            other => Err(GenifestError::type_mismatch("array", kind_name(other))),
        }
    }

    fn elements(self) -> Result<Vec<Cursor<'a>>, GenifestError> {
        let Cursor { node, path } = self;
        let child_path = |i: usize| {
            path.as_ref().map(|p| {
                let mut p = p.clone();
                p.push(PathSegment::Index(i));
                p
            })
        };
        match node {
            Cow::Borrowed(Value::Array(arr)) => Ok(arr
                .iter()
                .enumerate()
                .map(|(i, v)| Cursor {
                    node: Cow::Borrowed(v),
                    path: child_path(i),
                })
                .collect()),
            Cow::Owned(Value::Array(arr)) => Ok(arr
                .into_iter()
                .enumerate()
                .map(|(i, v)| Cursor {
                    node: Cow::Owned(v),
                    path: child_path(i),
                })
                .collect()),
            other => Err(GenifestError::type_mismatch("array", kind_name(&other))),
        }
    }
}

fn lookup_key<'v>(value: &'v Value, key: &str) -> Result<&'v Value, GenifestError> {
    match value {
        Value::Object(map) => map
            .get(key)
            .ok_or_else(|| GenifestError::NotFound(format!("field {key:?}"))),
        other => Err(GenifestError::type_mismatch("map", kind_name(other))),
    }
}

fn lookup_index(value: &Value, index: i64) -> Result<(usize, &Value), GenifestError> {
    match value {
        Value::Array(arr) => {
            let i = resolve_index(index, arr.len())?;
            Ok((i, &arr[i]))
        }
        other => Err(GenifestError::type_mismatch("array", kind_name(other))),
    }
}

struct Evaluator<'e> {
    expr: &'e Expression,
}

impl Evaluator<'_> {
    /// Apply the remaining components of the current path, then the remaining
    /// pipeline steps. `Ok(None)` means a `select` filtered the node out.
    fn walk<'a>(
        &self,
        cur: Cursor<'a>,
        components: &[Component],
        rest: &[Step],
    ) -> Result<Option<Cursor<'a>>, GenifestError> {
        let Some((first, tail)) = components.split_first() else {
            return match rest.split_first() {
                None => Ok(Some(cur)),
                Some((Step::Path(path), next)) => self.walk(cur, &path.components, next),
                Some((Step::Function(call), next)) => {
                    if self.passes(&cur, call)? {
                        self.walk(cur, &[], next)
                    } else {
                        Ok(None)
                    }
                }
            };
        };

        let next = match first {
            Component::Iterate => return self.fan_out(cur, tail, rest),
            Component::Field(name) => cur.key(name)?,
            Component::Bracket(Bracket::Key(key)) => cur.key(key)?,
            Component::Bracket(Bracket::Index(i)) => cur.index(*i)?,
            Component::Bracket(Bracket::Slice { start, end }) => cur.slice(*start, *end)?,
        };
        self.walk(next, tail, rest)
    }

    /// Run the remainder against each element in order and keep the first
    /// element that gets all the way through.
    fn fan_out<'a>(
        &self,
        cur: Cursor<'a>,
        components: &[Component],
        rest: &[Step],
    ) -> Result<Option<Cursor<'a>>, GenifestError> {
        for (i, element) in cur.elements()?.into_iter().enumerate() {
            match self.walk(element, components, rest) {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => trace!("{}: element {i} filtered out", self.expr.source),
                Err(err) => trace!("{}: element {i} skipped: {err}", self.expr.source),
            }
        }
        Err(GenifestError::NoMatch(self.expr.source.clone()))
    }

    fn passes(&self, cur: &Cursor<'_>, call: &FunctionCall) -> Result<bool, GenifestError> {
        let comparison = match (call.name.as_str(), call.args.as_slice()) {
            ("select", [FuncArg::Comparison(comparison)]) => comparison,
            _ => {
                return Err(GenifestError::Evaluation(format!(
                    "unsupported function call: {}",
                    call.name
                )))
            }
        };

        let subject = Cursor {
            node: Cow::Borrowed(&*cur.node),
            path: None,
        };
        // A left side that cannot be resolved to a scalar equals nothing.
        let left = match self.walk(subject, &comparison.left.components, &[]) {
            Ok(Some(found)) => render_scalar(&found.node),
            Ok(None) | Err(_) => None,
        };
        let equal = left.as_deref() == Some(comparison.right.render().as_str());
        Ok(match comparison.op {
            CompareOp::Eq => equal,
            CompareOp::Ne => !equal,
        })
    }
}

fn resolve<'a>(tree: &'a Value, expr: &Expression) -> Result<Cursor<'a>, GenifestError> {
    Evaluator { expr }
        .walk(Cursor::root(tree), &[], &expr.steps)?
        .ok_or_else(|| GenifestError::NoMatch(expr.source.clone()))
}

/// Evaluate an expression against a tree and return a copy of the selected
/// node. Iteration yields the first element that satisfies the rest of the
/// expression.
pub fn evaluate(tree: &Value, expr: &Expression) -> Result<Value, GenifestError> {
    Ok(resolve(tree, expr)?.node.into_owned())
}

/// Evaluate an expression and return where the selected node lives in the
/// tree, for writing.
pub fn locate(tree: &Value, expr: &Expression) -> Result<Vec<PathSegment>, GenifestError> {
    resolve(tree, expr)?.path.ok_or_else(|| {
        GenifestError::Evaluation(format!(
            "selector {:?} does not select a location in the document",
            expr.source
        ))
    })
}
