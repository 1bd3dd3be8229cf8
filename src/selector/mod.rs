//! Selector expressions: a small yq-style language for finding and rewriting
//! values inside a document tree.
//!
//! ```text
//! .spec.template.spec.containers[0].image
//! .data["1password.json"]
//! .spec.containers[] | select(.name == "frontend") | .image
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod write;

use serde_json::Value;

use crate::error::GenifestError;

pub use ast::Expression;
pub use eval::{evaluate, locate, PathSegment};
pub use node::render_scalar;
pub use write::set_value;

/// Parse selector text into an expression. All syntax errors surface here.
pub fn parse(selector: &str) -> Result<Expression, GenifestError> {
    let mut lex = lexer::Lexer::new(selector);
    lex.tokenize()?;
    let mut parser = parser::Parser::new(selector, lex.tokens);
    parser.parse()
}

/// Parse and evaluate a selector in one go.
pub fn query(tree: &Value, selector: &str) -> Result<Value, GenifestError> {
    let expr = parse(selector)?;
    evaluate(tree, &expr)
}

/// Parse a selector and write `new_value` at the location it selects.
pub fn set(tree: &mut Value, selector: &str, new_value: &str) -> Result<bool, GenifestError> {
    let expr = parse(selector)?;
    set_value(tree, &expr, new_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod() -> Value {
        json!({"spec": {"containers": [{"name": "web"}, {"name": "sidecar"}]}})
    }

    #[test]
    fn query_container_name() {
        assert_eq!(query(&pod(), ".spec.containers[1].name").unwrap(), json!("sidecar"));
    }

    #[test]
    fn query_pipe() {
        assert_eq!(query(&pod(), ".spec | .containers | [0] | .name").unwrap(), json!("web"));
    }

    #[test]
    fn query_reports_parse_errors_before_evaluation() {
        assert!(matches!(
            query(&json!(null), ".spec[\"x"),
            Err(GenifestError::Parse { .. })
        ));
    }

    #[test]
    fn set_then_query() {
        let mut tree = pod();
        assert!(set(&mut tree, ".spec.containers[0].name", "api").unwrap());
        assert_eq!(query(&tree, ".spec.containers[0].name").unwrap(), json!("api"));
        assert!(!set(&mut tree, ".spec.containers[0].name", "api").unwrap());
    }

    #[test]
    fn negative_index_for_every_length() {
        for len in 1..6 {
            let seq = Value::Array((0..len).map(|i| json!(i)).collect());
            assert_eq!(
                query(&seq, "[-1]").unwrap(),
                query(&seq, &format!("[{}]", len - 1)).unwrap()
            );
        }
    }

    #[test]
    fn slice_lengths() {
        let seq = json!([0, 1, 2, 3]);
        for a in 0..=4 {
            for b in a..=4 {
                let got = query(&seq, &format!("[{a}:{b}]")).unwrap();
                assert_eq!(got.as_array().unwrap().len(), b - a);
            }
        }
        assert_eq!(query(&seq, "[3:1]").unwrap(), json!([]));
    }
}
