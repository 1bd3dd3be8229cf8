use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::change::apply_change;
use crate::config::FileInclusion;
use crate::error::GenifestError;
use crate::format::Format;
use crate::output::format_documents;
use crate::parser::parse_documents;

use super::EvalContext;

/// Reject names that would climb out of a files root.
fn check_relative(what: &str, name: &str) -> Result<(), GenifestError> {
    let escapes = Path::new(name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(GenifestError::Evaluation(format!(
            "{what} {name:?} must be a relative path inside the files root"
        )));
    }
    Ok(())
}

/// The app directory: explicit, or the directory holding the current file.
fn app_name(ctx: &EvalContext, inclusion: &FileInclusion) -> String {
    inclusion
        .app
        .clone()
        .filter(|app| !app.is_empty())
        .or_else(|| {
            ctx.current_file()
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

fn find_file(ctx: &EvalContext, app: &str, source: &str) -> Result<PathBuf, GenifestError> {
    ctx.files_roots()
        .iter()
        .map(|root| {
            if app.is_empty() {
                root.join(source)
            } else {
                root.join(app).join(source)
            }
        })
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| GenifestError::NotFound(format!("file {source:?} for app {app:?}")))
}

/// Read an included file, applying any transient changes to it in memory.
pub fn include(ctx: &EvalContext, inclusion: &FileInclusion) -> Result<String, GenifestError> {
    let app = app_name(ctx, inclusion);
    check_relative("app", &app)?;
    check_relative("source", &inclusion.source)?;

    let path = find_file(ctx, &app, &inclusion.source)?;
    debug!("including {}", path.display());

    let bytes = fs::read(&path)?;
    // Verbatim inclusions pass bytes through; invalid UTF-8 becomes U+FFFD.
    let Some(first) = inclusion.changes.first() else {
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    };
    let text = String::from_utf8(bytes).map_err(|e| {
        GenifestError::Evaluation(format!("{} is not valid UTF-8: {e}", path.display()))
    })?;

    let format = match first.format {
        Some(format) => format,
        None => Format::from_extension(&path)?,
    };
    let mut docs = parse_documents(&text, format)?;
    let scope = ctx.with_file(&path);
    for change in &inclusion.changes {
        for doc in docs.iter_mut() {
            apply_change(
                &scope,
                doc,
                change.document_selector.as_ref(),
                &change.key_selector,
                &change.value_from,
            )?;
        }
    }
    format_documents(&docs, format)
}
