use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::config::FunctionDefinition;

/// The scope a value is computed in.
///
/// Contexts are never modified once handed out: the `with_*` methods return a
/// derived copy and leave `self` untouched. Large shared parts sit behind
/// `Arc` so deriving stays cheap.
#[derive(Debug, Clone)]
pub struct EvalContext {
    current_file: PathBuf,
    current_document: Option<Arc<Value>>,
    variables: HashMap<String, String>,
    functions: Arc<Vec<FunctionDefinition>>,
    cloud_home: PathBuf,
    scripts_roots: Arc<Vec<PathBuf>>,
    files_roots: Arc<Vec<PathBuf>>,
}

impl EvalContext {
    /// A root context for the tree rooted at `cloud_home`. Scripts are looked
    /// up under `<cloud_home>/scripts` and files under `<cloud_home>/files`
    /// until other roots are configured.
    pub fn new(cloud_home: impl Into<PathBuf>) -> Self {
        let cloud_home = cloud_home.into();
        EvalContext {
            current_file: PathBuf::new(),
            current_document: None,
            variables: HashMap::new(),
            functions: Arc::new(Vec::new()),
            scripts_roots: Arc::new(vec![cloud_home.join("scripts")]),
            files_roots: Arc::new(vec![cloud_home.join("files")]),
            cloud_home,
        }
    }

    pub fn with_scripts_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.scripts_roots = Arc::new(roots);
        self
    }

    pub fn with_files_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.files_roots = Arc::new(roots);
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = Arc::new(functions);
        self
    }

    pub fn with_file(&self, file: impl Into<PathBuf>) -> Self {
        EvalContext {
            current_file: file.into(),
            ..self.clone()
        }
    }

    pub fn with_document(&self, document: Value) -> Self {
        EvalContext {
            current_document: Some(Arc::new(document)),
            ..self.clone()
        }
    }

    /// Replace the variables in scope.
    pub fn with_variables(&self, variables: HashMap<String, String>) -> Self {
        EvalContext {
            variables,
            ..self.clone()
        }
    }

    /// Add (or shadow) a single variable.
    pub fn with_variable(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.variables.insert(name.into(), value.into());
        derived
    }

    pub fn current_file(&self) -> &Path {
        &self.current_file
    }

    pub fn current_document(&self) -> Option<&Value> {
        self.current_document.as_deref()
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn cloud_home(&self) -> &Path {
        &self.cloud_home
    }

    pub fn scripts_roots(&self) -> &[PathBuf] {
        &self.scripts_roots
    }

    pub fn files_roots(&self) -> &[PathBuf] {
        &self.files_roots
    }
}
