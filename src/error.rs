use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenifestError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot detect format: no file extension")]
    NoExtension,

    #[error("unknown file extension: .{0}")]
    UnknownExtension(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("syntax error in selector {selector:?} at position {position}: {message}")]
    Parse {
        selector: String,
        position: usize,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("index out of bounds: {index} (length {length})")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("type mismatch: expected {expected} but found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("no match for selector {0:?}")]
    NoMatch(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("script {command} failed ({status}): stdout: {stdout:?}, stderr: {stderr:?}")]
    Execution {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenifestError {
    pub(crate) fn type_mismatch(expected: &str, found: &str) -> Self {
        GenifestError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// The selector was well formed but the tree has nothing at that place.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            GenifestError::NotFound(_)
                | GenifestError::NoMatch(_)
                | GenifestError::TypeMismatch { .. }
                | GenifestError::IndexOutOfBounds { .. }
        )
    }
}
