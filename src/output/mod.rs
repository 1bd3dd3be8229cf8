pub mod pretty;

pub use pretty::{format_documents, format_value};
