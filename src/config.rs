//! Configuration objects consumed by the engine.
//!
//! These mirror the `valueFrom`, `functions` and `changes` sections of a
//! genifest configuration file. Loading and validating whole configuration
//! trees happens elsewhere; the types only need to deserialize.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::GenifestError;
use crate::format::Format;

/// How to compute a string value. Exactly one source is set.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "RawValueFrom")]
pub enum ValueFrom {
    DefaultValue(String),
    ArgumentRef(ArgumentRef),
    BasicTemplate(BasicTemplate),
    FunctionCall(FunctionCall),
    ScriptExec(ScriptExec),
    FileInclusion(FileInclusion),
    CallPipeline(Vec<PipelineStep>),
    DocumentRef(DocumentRef),
    EnvironmentRef(EnvironmentRef),
    /// No source configured.
    #[default]
    Unset,
}

impl ValueFrom {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueFrom::DefaultValue(value.into())
    }

    pub fn arg(name: impl Into<String>) -> Self {
        ValueFrom::ArgumentRef(ArgumentRef { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArgumentRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BasicTemplate {
    pub string: String,
    #[serde(default)]
    pub variables: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptExec {
    #[serde(rename = "exec", alias = "execCommand")]
    pub exec_command: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub env: Vec<Argument>,
    pub stdin: Option<Box<ValueFrom>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileInclusion {
    pub app: Option<String>,
    pub source: String,
    #[serde(default)]
    pub changes: Vec<TransientChange>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStep {
    #[serde(default)]
    pub value_from: ValueFrom,
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub key_selector: String,
    pub file_selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvironmentRef {
    pub name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub default: Option<String>,
}

/// A named input to a template, function, or script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub name: String,
    #[serde(default)]
    pub value_from: ValueFrom,
}

impl Argument {
    pub fn new(name: impl Into<String>, value_from: ValueFrom) -> Self {
        Argument {
            name: name.into(),
            value_from,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "scalar_string")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub value_from: ValueFrom,
}

impl FunctionDefinition {
    /// A required parameter must not also carry a default.
    pub fn validate(&self) -> Result<(), GenifestError> {
        for param in &self.params {
            if param.required && param.default.is_some() {
                return Err(GenifestError::Evaluation(format!(
                    "parameter {:?} of function {:?} is required and must not have a default",
                    param.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Selector text mapped to the scalar text it must resolve to.
pub type DocumentSelector = BTreeMap<String, String>;

/// A change to apply to the documents of a managed file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOrder {
    pub tag: Option<String>,
    pub file_selector: Option<String>,
    pub document_selector: Option<DocumentSelector>,
    pub key_selector: String,
    #[serde(default)]
    pub value_from: ValueFrom,
}

impl ChangeOrder {
    /// Untagged changes always apply; tagged ones apply unless a filter
    /// names a different tag.
    pub fn matches_tag(&self, filter: Option<&str>) -> bool {
        match (&self.tag, filter) {
            (None, _) | (_, None) => true,
            (Some(tag), Some(wanted)) => tag == wanted,
        }
    }

    /// Does `file_selector` accept `path`? Patterns without a `/` are matched
    /// against the file name, others against the whole path. `*` and `?` stay
    /// within one path segment, `**` crosses segments.
    pub fn matches_file(&self, path: &Path) -> Result<bool, GenifestError> {
        let Some(pattern) = self.file_selector.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(true);
        };
        let subject = if pattern.contains('/') {
            path.to_string_lossy()
        } else {
            match path.file_name() {
                Some(name) => name.to_string_lossy(),
                None => return Ok(false),
            }
        };
        Ok(glob_regex(pattern)?.is_match(&subject))
    }
}

fn glob_regex(pattern: &str) -> Result<Regex, GenifestError> {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                re.push_str(".*");
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
        .map_err(|e| GenifestError::Evaluation(format!("invalid file selector {pattern:?}: {e}")))
}

/// An in-memory edit applied to a file pulled in by a file inclusion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransientChange {
    pub format: Option<Format>,
    pub document_selector: Option<DocumentSelector>,
    pub key_selector: String,
    #[serde(default)]
    pub value_from: ValueFrom,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawValueFrom {
    #[serde(default, deserialize_with = "scalar_string")]
    default: Option<String>,
    arg_ref: Option<ArgumentRef>,
    basic_template: Option<BasicTemplate>,
    function: Option<FunctionCall>,
    script: Option<ScriptExec>,
    file: Option<FileInclusion>,
    call: Option<Vec<PipelineStep>>,
    document_ref: Option<DocumentRef>,
    env_ref: Option<EnvironmentRef>,
}

impl TryFrom<RawValueFrom> for ValueFrom {
    type Error = String;

    fn try_from(raw: RawValueFrom) -> Result<Self, Self::Error> {
        let sources = [
            raw.default.map(ValueFrom::DefaultValue),
            raw.arg_ref.map(ValueFrom::ArgumentRef),
            raw.basic_template.map(ValueFrom::BasicTemplate),
            raw.function.map(ValueFrom::FunctionCall),
            raw.script.map(ValueFrom::ScriptExec),
            raw.file.map(ValueFrom::FileInclusion),
            raw.call.map(ValueFrom::CallPipeline),
            raw.document_ref.map(ValueFrom::DocumentRef),
            raw.env_ref.map(ValueFrom::EnvironmentRef),
        ];
        let mut set = sources.into_iter().flatten();
        match (set.next(), set.next()) {
            (None, _) => Ok(ValueFrom::Unset),
            (Some(source), None) => Ok(source),
            (Some(_), Some(_)) => Err("valueFrom must set exactly one value source".to_string()),
        }
    }
}

/// Accept any YAML scalar where a string is expected (`default: 3`).
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| match s {
        Scalar::String(s) => s,
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}
