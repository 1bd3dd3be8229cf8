//! Applying a computed value to one document of a file.

use std::borrow::Cow;

use log::debug;
use serde_json::Value;

use crate::config::{DocumentSelector, ValueFrom};
use crate::error::GenifestError;
use crate::selector::{self, render_scalar};
use crate::value::{evaluate, EvalContext};

/// Document selector keys are written bare (`kind`, `metadata.name`) but may
/// also be full selectors.
fn normalize(key: &str) -> Cow<'_, str> {
    if key.starts_with('.') || key.starts_with('[') {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(format!(".{key}"))
    }
}

/// Does every selector in `selector` render to its expected text in `doc`?
///
/// A selector that does not resolve is a non-match. Malformed selectors are
/// still errors.
pub fn document_matches(doc: &Value, selector: &DocumentSelector) -> Result<bool, GenifestError> {
    for (key, expected) in selector {
        let expr = selector::parse(&normalize(key))?;
        match selector::evaluate(doc, &expr) {
            Ok(node) => {
                if render_scalar(&node).as_deref() != Some(expected.as_str()) {
                    return Ok(false);
                }
            }
            Err(e) if e.is_unresolved() => return Ok(false),
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Compute `value_from` against `doc` and write it at `key_selector`.
///
/// Documents rejected by `document_selector` are left alone and report no
/// change.
pub fn apply_change(
    ctx: &EvalContext,
    doc: &mut Value,
    document_selector: Option<&DocumentSelector>,
    key_selector: &str,
    value_from: &ValueFrom,
) -> Result<bool, GenifestError> {
    if let Some(selector) = document_selector {
        if !document_matches(doc, selector)? {
            debug!("skipping {key_selector}: document does not match {selector:?}");
            return Ok(false);
        }
    }
    let expr = selector::parse(key_selector)?;
    let value = evaluate(&ctx.with_document(doc.clone()), value_from)?;
    let changed = selector::set_value(doc, &expr, &value)?;
    debug!(
        "{key_selector} = {value:?} ({})",
        if changed { "changed" } else { "unchanged" }
    );
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentRef;
    use serde_json::json;

    fn ctx() -> EvalContext {
        EvalContext::new("/nonexistent")
    }

    fn doc_selector(pairs: &[(&str, &str)]) -> DocumentSelector {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn deployment() -> Value {
        json!({
            "kind": "Deployment",
            "metadata": {"name": "api", "labels": {"app": "api"}},
            "spec": {"replicas": 1}
        })
    }

    #[test]
    fn matches_bare_and_dotted_keys() {
        let doc = deployment();
        assert!(document_matches(&doc, &doc_selector(&[("kind", "Deployment")])).unwrap());
        assert!(document_matches(
            &doc,
            &doc_selector(&[("kind", "Deployment"), (".metadata.name", "api")])
        )
        .unwrap());
        assert!(!document_matches(&doc, &doc_selector(&[("kind", "Service")])).unwrap());
    }

    #[test]
    fn missing_keys_do_not_match() {
        let doc = deployment();
        assert!(!document_matches(&doc, &doc_selector(&[("metadata.namespace", "x")])).unwrap());
        assert!(!document_matches(&doc, &doc_selector(&[("kind.name", "x")])).unwrap());
        assert!(!document_matches(&doc, &doc_selector(&[("metadata", "x")])).unwrap());
    }

    #[test]
    fn numbers_compare_as_text() {
        assert!(document_matches(&deployment(), &doc_selector(&[("spec.replicas", "1")])).unwrap());
    }

    #[test]
    fn malformed_selector_is_an_error() {
        assert!(matches!(
            document_matches(&deployment(), &doc_selector(&[("metadata[", "x")])),
            Err(GenifestError::Parse { .. })
        ));
    }

    #[test]
    fn empty_selector_matches_everything() {
        assert!(document_matches(&json!(null), &DocumentSelector::new()).unwrap());
    }

    #[test]
    fn apply_writes_value() {
        let mut doc = deployment();
        let changed = apply_change(
            &ctx(),
            &mut doc,
            None,
            ".spec.replicas",
            &ValueFrom::literal("3"),
        )
        .unwrap();
        assert!(changed);
        assert_eq!(doc["spec"]["replicas"], json!(3));
    }

    #[test]
    fn apply_reports_unchanged() {
        let mut doc = deployment();
        let changed = apply_change(
            &ctx(),
            &mut doc,
            None,
            ".spec.replicas",
            &ValueFrom::literal("1"),
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn apply_skips_other_documents() {
        let mut doc = deployment();
        let before = doc.clone();
        let selector = doc_selector(&[("kind", "Service")]);
        let changed = apply_change(
            &ctx(),
            &mut doc,
            Some(&selector),
            ".spec.replicas",
            &ValueFrom::literal("5"),
        )
        .unwrap();
        assert!(!changed);
        assert_eq!(doc, before);
    }

    #[test]
    fn value_sees_the_document() {
        let mut doc = deployment();
        let value = ValueFrom::DocumentRef(DocumentRef {
            key_selector: ".metadata.name".into(),
            file_selector: None,
        });
        apply_change(&ctx(), &mut doc, None, ".metadata.labels.instance", &value).unwrap();
        assert_eq!(doc["metadata"]["labels"]["instance"], json!("api"));
    }

    #[test]
    fn bad_key_selector_fails_before_evaluating() {
        let mut doc = deployment();
        assert!(matches!(
            apply_change(&ctx(), &mut doc, None, ".spec[", &ValueFrom::Unset),
            Err(GenifestError::Parse { .. })
        ));
    }
}
