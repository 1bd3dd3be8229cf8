use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;

use genifest::change::apply_change;
use genifest::config::{ChangeOrder, FunctionDefinition, ValueFrom};
use genifest::error::GenifestError;
use genifest::format::Format;
use genifest::output;
use genifest::parser;
use genifest::selector;
use genifest::value::{self, EvalContext};

#[derive(Parser)]
#[command(
    name = "genifest",
    version,
    about = "Rewrite fields in configuration documents with selectors and computed values"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the value a selector points at
    Get {
        file: PathBuf,
        selector: String,

        /// Force input format [yaml, toml, json]
        #[arg(short = 'p', long = "input-format")]
        input_format: Option<String>,
    },

    /// Write a value at the place a selector points at
    Set {
        file: PathBuf,
        selector: String,
        value: String,

        /// Force input format [yaml, toml, json]
        #[arg(short = 'p', long = "input-format")]
        input_format: Option<String>,

        /// Edit file in place
        #[arg(short, long = "in-place")]
        in_place: bool,
    },

    /// Compute a valueFrom block and print the result
    Eval {
        /// YAML file with `functions` and `valueFrom`
        config: PathBuf,

        /// Document that documentRef lookups read from
        #[arg(long)]
        document: Option<PathBuf>,

        /// Root of the managed tree (default: current directory)
        #[arg(long = "cloud-home")]
        cloud_home: Option<PathBuf>,
    },

    /// Apply a list of changes to every document of a file
    Apply {
        /// YAML file with `functions` and `changes`
        config: PathBuf,
        file: PathBuf,

        /// Only apply untagged changes and changes with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Edit file in place
        #[arg(short, long = "in-place")]
        in_place: bool,

        /// Root of the managed tree (default: current directory)
        #[arg(long = "cloud-home")]
        cloud_home: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvalConfig {
    #[serde(default)]
    functions: Vec<FunctionDefinition>,
    #[serde(default)]
    value_from: ValueFrom,
}

#[derive(Deserialize)]
struct ApplyConfig {
    #[serde(default)]
    functions: Vec<FunctionDefinition>,
    #[serde(default)]
    changes: Vec<ChangeOrder>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Get {
            file,
            selector,
            input_format,
        } => get(&file, &selector, input_format.as_deref()),
        Command::Set {
            file,
            selector,
            value,
            input_format,
            in_place,
        } => set(&file, &selector, &value, input_format.as_deref(), in_place),
        Command::Eval {
            config,
            document,
            cloud_home,
        } => eval(&config, document.as_deref(), cloud_home),
        Command::Apply {
            config,
            file,
            tag,
            in_place,
            cloud_home,
        } => apply(&config, &file, tag.as_deref(), in_place, cloud_home),
    }
}

fn get(file: &Path, selector_text: &str, input_format: Option<&str>) -> Result<()> {
    let (docs, format) = read_documents(file, input_format)?;
    let expr = selector::parse(selector_text)?;

    // The first document the selector resolves in wins.
    let mut first_error = None;
    for doc in &docs {
        match selector::evaluate(doc, &expr) {
            Ok(node) => {
                let rendered = match selector::render_scalar(&node) {
                    Some(text) => text,
                    None => output::format_value(&node, format)?,
                };
                print!("{rendered}");
                if !rendered.ends_with('\n') {
                    println!();
                }
                return Ok(());
            }
            Err(e) if e.is_unresolved() => {
                first_error.get_or_insert(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    match first_error {
        Some(e) => Err(unresolved(e, selector_text, file)),
        None => anyhow::bail!("{} contains no documents", file.display()),
    }
}

fn unresolved(err: GenifestError, selector_text: &str, file: &Path) -> anyhow::Error {
    anyhow::Error::from(err).context(format!("{selector_text} in {}", file.display()))
}

fn set(
    file: &Path,
    selector_text: &str,
    new_value: &str,
    input_format: Option<&str>,
    in_place: bool,
) -> Result<()> {
    let (mut docs, format) = read_documents(file, input_format)?;
    let expr = selector::parse(selector_text)?;

    // Every document the selector resolves in is written; others are left alone.
    let mut resolved = false;
    let mut changed = false;
    let mut first_error = None;
    for doc in docs.iter_mut() {
        match selector::set_value(doc, &expr, new_value) {
            Ok(c) => {
                resolved = true;
                changed |= c;
            }
            Err(e) if e.is_unresolved() => {
                first_error.get_or_insert(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !resolved {
        return match first_error {
            Some(e) => Err(unresolved(e, selector_text, file)),
            None => anyhow::bail!("{} contains no documents", file.display()),
        };
    }
    if !changed {
        eprintln!("{}: unchanged", file.display());
    }

    let formatted = output::format_documents(&docs, format)?;
    if in_place {
        if changed {
            write_in_place(file, &formatted)?;
        }
    } else {
        print!("{formatted}");
    }
    Ok(())
}

fn eval(config_path: &Path, document: Option<&Path>, cloud_home: Option<PathBuf>) -> Result<()> {
    let config: EvalConfig = read_config(config_path)?;
    let ctx = root_context(cloud_home, config.functions)?;

    let ctx = match document {
        Some(path) => {
            let (docs, _) = read_documents(path, None)?;
            let first = docs
                .into_iter()
                .next()
                .with_context(|| format!("{} contains no documents", path.display()))?;
            ctx.with_file(path).with_document(first)
        }
        None => ctx.with_file(config_path),
    };

    let result = value::evaluate(&ctx, &config.value_from)
        .with_context(|| format!("evaluating {}", config_path.display()))?;
    println!("{result}");
    Ok(())
}

fn apply(
    config_path: &Path,
    file: &Path,
    tag: Option<&str>,
    in_place: bool,
    cloud_home: Option<PathBuf>,
) -> Result<()> {
    let config: ApplyConfig = read_config(config_path)?;
    let ctx = root_context(cloud_home, config.functions)?.with_file(file);
    let (mut docs, format) = read_documents(file, None)?;

    let mut changed = 0usize;
    for (i, change) in config.changes.iter().enumerate() {
        if !change.matches_tag(tag) || !change.matches_file(file)? {
            log::debug!("change {i} ({}) skipped for {}", change.key_selector, file.display());
            continue;
        }
        for doc in docs.iter_mut() {
            let did_change = apply_change(
                &ctx,
                doc,
                change.document_selector.as_ref(),
                &change.key_selector,
                &change.value_from,
            )
            .with_context(|| format!("change {i} ({}) on {}", change.key_selector, file.display()))?;
            if did_change {
                changed += 1;
            }
        }
    }
    eprintln!("{}: {changed} value(s) changed", file.display());

    let formatted = output::format_documents(&docs, format)?;
    if in_place {
        if changed > 0 {
            write_in_place(file, &formatted)?;
        }
    } else {
        print!("{formatted}");
    }
    Ok(())
}

fn root_context(
    cloud_home: Option<PathBuf>,
    functions: Vec<FunctionDefinition>,
) -> Result<EvalContext> {
    for function in &functions {
        function
            .validate()
            .with_context(|| format!("invalid function {:?}", function.name))?;
    }
    let cloud_home = match cloud_home {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving current directory")?,
    };
    Ok(EvalContext::new(cloud_home).with_functions(functions))
}

fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_documents(path: &Path, input_format: Option<&str>) -> Result<(Vec<Value>, Format)> {
    let format = match input_format {
        Some(f) => Format::from_str_name(f)?,
        None => Format::from_extension(path)?,
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let docs = parser::parse_documents(&text, format)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok((docs, format))
}

fn write_in_place(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent).context("creating temporary file")?;
    tmp.write_all(contents.as_bytes())
        .context("writing temporary file")?;
    tmp.persist(path)
        .context("replacing file with updated content")?;
    Ok(())
}
