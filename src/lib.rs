//! Rewrite fields inside YAML, TOML and JSON documents using selector
//! expressions and computed values.

pub mod change;
pub mod config;
pub mod error;
pub mod format;
pub mod output;
pub mod parser;
pub mod selector;
pub mod value;

pub use error::GenifestError;
pub use value::{evaluate, EvalContext};
