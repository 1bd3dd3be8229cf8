use std::path::Path;

use serde::Deserialize;

use crate::error::GenifestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[serde(alias = "yml")]
    Yaml,
    Toml,
    Json,
}

/// Every spelling genifest accepts, as an extension or a `--input-format`
/// value. The first spelling of each format is its display name.
const NAMES: &[(&str, Format)] = &[
    ("yaml", Format::Yaml),
    ("yml", Format::Yaml),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

fn lookup(name: &str) -> Option<Format> {
    NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, format)| format)
}

impl Format {
    /// Detect the format of a document from its file extension.
    pub fn from_extension(path: &Path) -> Result<Self, GenifestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(GenifestError::NoExtension)?;
        lookup(ext).ok_or_else(|| GenifestError::UnknownExtension(ext.to_ascii_lowercase()))
    }

    pub fn from_str_name(name: &str) -> Result<Self, GenifestError> {
        lookup(name).ok_or_else(|| GenifestError::UnsupportedFormat(name.to_ascii_lowercase()))
    }

    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|&&(_, format)| format == self)
            .map_or("unknown", |&(n, _)| n)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
