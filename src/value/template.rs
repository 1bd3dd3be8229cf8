use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::error::GenifestError;

/// Matches `${name}` or `$name` for the declared names only, longest name
/// first so `$image-tag` is not read as `$image` followed by `-tag`.
fn placeholder_regex(variables: &HashMap<String, String>) -> Result<Option<Regex>, GenifestError> {
    let mut names: Vec<&str> = variables
        .keys()
        .map(String::as_str)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(None);
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternation = names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\$\{{({alternation})\}}|\$({alternation})"))
        .map(Some)
        .map_err(|e| GenifestError::Evaluation(format!("invalid template variables: {e}")))
}

/// Substitute `${name}` and `$name` with their values, then collapse `$$`
/// into `$`. Names without a value are left as written.
pub fn render(template: &str, variables: &HashMap<String, String>) -> Result<String, GenifestError> {
    let substituted = match placeholder_regex(variables)? {
        Some(re) => re
            .replace_all(template, |caps: &Captures| {
                let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                variables.get(name).cloned().unwrap_or_default()
            })
            .into_owned(),
        None => template.to_string(),
    };
    Ok(substituted.replace("$$", "$"))
}
