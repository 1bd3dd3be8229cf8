//! The value interpreter: turns a [`ValueFrom`] into a string.

pub mod context;
pub mod file;
pub mod script;
pub mod template;

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::{Argument, FunctionCall, PipelineStep, ValueFrom};
use crate::error::GenifestError;
use crate::selector::{self, node::kind_name, render_scalar};

pub use context::EvalContext;

/// Compute the string a value source describes.
pub fn evaluate(ctx: &EvalContext, value_from: &ValueFrom) -> Result<String, GenifestError> {
    match value_from {
        ValueFrom::DefaultValue(value) => Ok(value.clone()),
        ValueFrom::ArgumentRef(arg) => ctx
            .variable(&arg.name)
            .map(str::to_string)
            .ok_or_else(|| GenifestError::NotFound(format!("variable {:?}", arg.name))),
        ValueFrom::BasicTemplate(tpl) => {
            let variables = evaluate_arguments(ctx, &tpl.variables)?;
            template::render(&tpl.string, &variables)
        }
        ValueFrom::FunctionCall(call) => call_function(ctx, call),
        ValueFrom::ScriptExec(script) => script::run(ctx, script),
        ValueFrom::FileInclusion(inclusion) => file::include(ctx, inclusion),
        ValueFrom::CallPipeline(steps) => run_pipeline(ctx, steps),
        ValueFrom::DocumentRef(doc_ref) => {
            if doc_ref.file_selector.as_deref().is_some_and(|s| !s.is_empty()) {
                return Err(GenifestError::Evaluation(
                    "fileSelector is not supported on a documentRef value".into(),
                ));
            }
            let document = ctx.current_document().ok_or_else(|| {
                GenifestError::Evaluation("no current document available".into())
            })?;
            let node = selector::query(document, &doc_ref.key_selector)?;
            render_scalar(&node)
                .ok_or_else(|| GenifestError::type_mismatch("scalar", kind_name(&node)))
        }
        ValueFrom::EnvironmentRef(env) => match std::env::var(&env.name) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => env
                .default
                .clone()
                .filter(|d| !d.is_empty())
                .ok_or_else(|| {
                    GenifestError::NotFound(format!("environment variable {:?}", env.name))
                }),
        },
        ValueFrom::Unset => Err(GenifestError::Evaluation("no value source specified".into())),
    }
}

fn evaluate_arguments(
    ctx: &EvalContext,
    arguments: &[Argument],
) -> Result<HashMap<String, String>, GenifestError> {
    arguments
        .iter()
        .map(|arg| Ok((arg.name.clone(), evaluate(ctx, &arg.value_from)?)))
        .collect()
}

fn call_function(ctx: &EvalContext, call: &FunctionCall) -> Result<String, GenifestError> {
    let function = ctx
        .function(&call.name)
        .ok_or_else(|| GenifestError::NotFound(format!("function {:?}", call.name)))?;
    let supplied = evaluate_arguments(ctx, &call.arguments)?;

    let mut params = HashMap::with_capacity(function.params.len());
    for param in &function.params {
        let value = supplied
            .get(&param.name)
            .cloned()
            .or_else(|| param.default.clone());
        match value {
            Some(value) => {
                params.insert(param.name.clone(), value);
            }
            None if param.required => {
                return Err(GenifestError::Evaluation(format!(
                    "missing required parameter {:?} for function {:?}",
                    param.name, function.name
                )))
            }
            None => {}
        }
    }

    debug!("calling function {} with {:?}", function.name, params);
    evaluate(&ctx.with_variables(params), &function.value_from)
}

fn run_pipeline(ctx: &EvalContext, steps: &[PipelineStep]) -> Result<String, GenifestError> {
    if steps.is_empty() {
        return Err(GenifestError::Evaluation("empty call pipeline".into()));
    }
    let mut scope = ctx.clone();
    let mut last = String::new();
    for (i, step) in steps.iter().enumerate() {
        last = evaluate(&scope, &step.value_from)?;
        trace!("pipeline step {i} produced {last:?}");
        if let Some(name) = step.output.as_deref().filter(|n| !n.is_empty()) {
            scope = scope.with_variable(name, last.as_str());
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ArgumentRef, BasicTemplate, DocumentRef, EnvironmentRef, FunctionDefinition, Parameter,
    };
    use serde_json::json;

    fn ctx() -> EvalContext {
        EvalContext::new("/nonexistent")
    }

    fn template(string: &str, variables: Vec<Argument>) -> ValueFrom {
        ValueFrom::BasicTemplate(BasicTemplate {
            string: string.into(),
            variables,
        })
    }

    fn call(name: &str, arguments: Vec<Argument>) -> ValueFrom {
        ValueFrom::FunctionCall(FunctionCall {
            name: name.into(),
            arguments,
        })
    }

    fn step(value_from: ValueFrom, output: Option<&str>) -> PipelineStep {
        PipelineStep {
            value_from,
            output: output.map(String::from),
        }
    }

    fn image_function() -> FunctionDefinition {
        FunctionDefinition {
            name: "image".into(),
            params: vec![
                Parameter {
                    name: "name".into(),
                    required: true,
                    default: None,
                },
                Parameter {
                    name: "tag".into(),
                    required: false,
                    default: Some("latest".into()),
                },
            ],
            value_from: template(
                "registry.local/${name}:${tag}",
                vec![
                    Argument::new("name", ValueFrom::arg("name")),
                    Argument::new("tag", ValueFrom::arg("tag")),
                ],
            ),
        }
    }

    #[test]
    fn default_value() {
        assert_eq!(evaluate(&ctx(), &ValueFrom::literal("x")).unwrap(), "x");
    }

    #[test]
    fn argument_ref() {
        let ctx = ctx().with_variable("env", "prod");
        assert_eq!(evaluate(&ctx, &ValueFrom::arg("env")).unwrap(), "prod");
        match evaluate(&ctx, &ValueFrom::arg("region")) {
            Err(GenifestError::NotFound(msg)) => assert!(msg.contains("region")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn template_substitutes_before_collapsing() {
        let value = template("$$${x}", vec![Argument::new("x", ValueFrom::literal("5"))]);
        assert_eq!(evaluate(&ctx(), &value).unwrap(), "$5");
    }

    #[test]
    fn template_variables_see_context() {
        let ctx = ctx().with_variable("who", "world");
        let value = template("hello $name", vec![Argument::new("name", ValueFrom::arg("who"))]);
        assert_eq!(evaluate(&ctx, &value).unwrap(), "hello world");
    }

    #[test]
    fn unknown_function() {
        match evaluate(&ctx(), &call("ghost", vec![])) {
            Err(GenifestError::NotFound(msg)) => assert!(msg.contains("ghost")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn function_applies_defaults() {
        let ctx = ctx().with_functions(vec![image_function()]);
        let value = call("image", vec![Argument::new("name", ValueFrom::literal("api"))]);
        assert_eq!(evaluate(&ctx, &value).unwrap(), "registry.local/api:latest");

        let value = call(
            "image",
            vec![
                Argument::new("name", ValueFrom::literal("api")),
                Argument::new("tag", ValueFrom::literal("1.2")),
            ],
        );
        assert_eq!(evaluate(&ctx, &value).unwrap(), "registry.local/api:1.2");
    }

    #[test]
    fn function_missing_required_parameter() {
        let ctx = ctx().with_functions(vec![image_function()]);
        match evaluate(&ctx, &call("image", vec![])) {
            Err(GenifestError::Evaluation(msg)) => {
                assert!(msg.contains("\"name\""));
                assert!(msg.contains("\"image\""));
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn function_arguments_use_caller_scope() {
        let ctx = ctx()
            .with_functions(vec![image_function()])
            .with_variable("app", "worker");
        let value = call("image", vec![Argument::new("name", ValueFrom::arg("app"))]);
        assert_eq!(evaluate(&ctx, &value).unwrap(), "registry.local/worker:latest");
    }

    #[test]
    fn function_body_cannot_see_caller_variables() {
        let leak = FunctionDefinition {
            name: "leak".into(),
            params: vec![],
            value_from: ValueFrom::arg("secret"),
        };
        let ctx = ctx()
            .with_functions(vec![leak])
            .with_variable("secret", "hunter2");
        assert!(matches!(
            evaluate(&ctx, &call("leak", vec![])),
            Err(GenifestError::NotFound(_))
        ));
    }

    #[test]
    fn function_keeps_current_document() {
        let name_of = FunctionDefinition {
            name: "name_of".into(),
            params: vec![],
            value_from: ValueFrom::DocumentRef(DocumentRef {
                key_selector: ".metadata.name".into(),
                file_selector: None,
            }),
        };
        let ctx = ctx()
            .with_functions(vec![name_of])
            .with_document(json!({"metadata": {"name": "api"}}));
        assert_eq!(evaluate(&ctx, &call("name_of", vec![])).unwrap(), "api");
    }

    #[test]
    fn pipeline_threads_outputs() {
        let value = ValueFrom::CallPipeline(vec![
            step(ValueFrom::literal("api"), Some("app")),
            step(template("${app}-svc", vec![Argument::new("app", ValueFrom::arg("app"))]), None),
        ]);
        assert_eq!(evaluate(&ctx(), &value).unwrap(), "api-svc");
    }

    #[test]
    fn pipeline_forward_reference_fails() {
        let value = ValueFrom::CallPipeline(vec![
            step(ValueFrom::arg("later"), None),
            step(ValueFrom::literal("x"), Some("later")),
        ]);
        assert!(matches!(
            evaluate(&ctx(), &value),
            Err(GenifestError::NotFound(_))
        ));
    }

    #[test]
    fn pipeline_outputs_do_not_leak() {
        let parent = ctx();
        let value = ValueFrom::CallPipeline(vec![step(ValueFrom::literal("x"), Some("out"))]);
        evaluate(&parent, &value).unwrap();
        assert_eq!(parent.variable("out"), None);
    }

    #[test]
    fn empty_pipeline() {
        assert!(matches!(
            evaluate(&ctx(), &ValueFrom::CallPipeline(vec![])),
            Err(GenifestError::Evaluation(_))
        ));
    }

    #[test]
    fn document_ref_without_document() {
        let value = ValueFrom::DocumentRef(DocumentRef {
            key_selector: ".metadata.name".into(),
            file_selector: None,
        });
        match evaluate(&ctx(), &value) {
            Err(GenifestError::Evaluation(msg)) => assert_eq!(msg, "no current document available"),
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn document_ref_reads_scalar() {
        let ctx = ctx().with_document(json!({"spec": {"replicas": 3, "paused": false}}));
        let value = |sel: &str| {
            ValueFrom::DocumentRef(DocumentRef {
                key_selector: sel.into(),
                file_selector: None,
            })
        };
        assert_eq!(evaluate(&ctx, &value(".spec.replicas")).unwrap(), "3");
        assert_eq!(evaluate(&ctx, &value(".spec.paused")).unwrap(), "false");
        assert!(matches!(
            evaluate(&ctx, &value(".spec")),
            Err(GenifestError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn document_ref_file_selector_unsupported() {
        let ctx = ctx().with_document(json!({"a": "b"}));
        let value = ValueFrom::DocumentRef(DocumentRef {
            key_selector: ".a".into(),
            file_selector: Some("other.yaml".into()),
        });
        assert!(matches!(
            evaluate(&ctx, &value),
            Err(GenifestError::Evaluation(_))
        ));
    }

    #[test]
    fn environment_ref() {
        std::env::set_var("GENIFEST_TEST_ENV_SET", "from-env");
        std::env::set_var("GENIFEST_TEST_ENV_EMPTY", "");
        let env = |name: &str, default: Option<&str>| {
            ValueFrom::EnvironmentRef(EnvironmentRef {
                name: name.into(),
                default: default.map(String::from),
            })
        };
        assert_eq!(
            evaluate(&ctx(), &env("GENIFEST_TEST_ENV_SET", Some("fallback"))).unwrap(),
            "from-env"
        );
        assert_eq!(
            evaluate(&ctx(), &env("GENIFEST_TEST_ENV_EMPTY", Some("fallback"))).unwrap(),
            "fallback"
        );
        assert!(matches!(
            evaluate(&ctx(), &env("GENIFEST_TEST_ENV_UNSET", None)),
            Err(GenifestError::NotFound(_))
        ));
    }

    #[test]
    fn unset_value() {
        match evaluate(&ctx(), &ValueFrom::Unset) {
            Err(GenifestError::Evaluation(msg)) => assert_eq!(msg, "no value source specified"),
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn argument_ref_struct() {
        let value = ValueFrom::ArgumentRef(ArgumentRef { name: "a".into() });
        assert_eq!(evaluate(&ctx().with_variable("a", "1"), &value).unwrap(), "1");
    }
}
