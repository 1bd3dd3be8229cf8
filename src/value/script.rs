use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::debug;

use crate::config::ScriptExec;
use crate::error::GenifestError;

use super::{evaluate, EvalContext};

/// Find `command` in the first scripts root that has it as a regular file.
fn find_script(ctx: &EvalContext, command: &str) -> Result<PathBuf, GenifestError> {
    ctx.scripts_roots()
        .iter()
        .map(|root| root.join(command))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            GenifestError::NotFound(format!(
                "script {command:?} in {}",
                ctx.scripts_roots()
                    .iter()
                    .map(|r| r.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

/// Run a script and return its trimmed standard output.
///
/// The script inherits the process environment plus the configured `env`
/// entries, runs in the cloud home directory, and is waited on without a
/// timeout.
pub fn run(ctx: &EvalContext, script: &ScriptExec) -> Result<String, GenifestError> {
    let path = find_script(ctx, &script.exec_command)?;

    let mut argv = Vec::with_capacity(script.args.len());
    for arg in &script.args {
        argv.push(evaluate(ctx, &arg.value_from)?);
    }
    let mut env = Vec::with_capacity(script.env.len());
    for var in &script.env {
        env.push((var.name.clone(), evaluate(ctx, &var.value_from)?));
    }
    let stdin = match &script.stdin {
        Some(value_from) => Some(evaluate(ctx, value_from)?),
        None => None,
    };

    debug!("running {} {:?} in {}", path.display(), argv, ctx.cloud_home().display());

    let mut cmd = Command::new(&path);
    cmd.args(&argv)
        .envs(env)
        .current_dir(ctx.cloud_home())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = cmd.spawn()?;
    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(std::thread::spawn(move || {
            pipe.write_all(input.as_bytes())
        })),
        _ => None,
    };
    let output = child.wait_with_output()?;
    if let Some(writer) = writer {
        match writer.join() {
            Ok(result) => {
                // A script that exits without reading its input closes the pipe.
                if let Err(e) = result {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e.into());
                    }
                }
            }
            Err(_) => {
                return Err(GenifestError::Evaluation(
                    "stdin writer thread panicked".into(),
                ))
            }
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        return Err(GenifestError::Execution {
            command: script.exec_command.clone(),
            status: output.status.to_string(),
            stdout,
            stderr,
        });
    }
    Ok(stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{Argument, ValueFrom};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn setup() -> (tempfile::TempDir, EvalContext) {
        let home = tempfile::tempdir().unwrap();
        let scripts = home.path().join("scripts");
        fs::create_dir_all(&scripts).unwrap();
        let ctx = EvalContext::new(home.path());
        (home, ctx)
    }

    fn exec(command: &str) -> ScriptExec {
        ScriptExec {
            exec_command: command.into(),
            args: vec![],
            env: vec![],
            stdin: None,
        }
    }

    #[test]
    fn positional_args() {
        let (home, ctx) = setup();
        write_script(&home.path().join("scripts"), "greet.sh", r#"echo "hi $1""#);
        let script = ScriptExec {
            args: vec![Argument::new("who", ValueFrom::literal("Sam"))],
            ..exec("greet.sh")
        };
        assert_eq!(run(&ctx, &script).unwrap(), "hi Sam");
    }

    #[test]
    fn env_overrides() {
        let (home, ctx) = setup();
        write_script(&home.path().join("scripts"), "env.sh", r#"echo "$GENIFEST_TEST_GREETING""#);
        let script = ScriptExec {
            env: vec![
                Argument::new("GENIFEST_TEST_GREETING", ValueFrom::literal("first")),
                Argument::new("GENIFEST_TEST_GREETING", ValueFrom::literal("second")),
            ],
            ..exec("env.sh")
        };
        assert_eq!(run(&ctx, &script).unwrap(), "second");
    }

    #[test]
    fn inherits_process_environment() {
        let (home, ctx) = setup();
        write_script(&home.path().join("scripts"), "path.sh", r#"test -n "$PATH" && echo ok"#);
        assert_eq!(run(&ctx, &exec("path.sh")).unwrap(), "ok");
    }

    #[test]
    fn stdin_is_fed() {
        let (home, ctx) = setup();
        write_script(&home.path().join("scripts"), "upper.sh", "tr a-z A-Z");
        let script = ScriptExec {
            stdin: Some(Box::new(ValueFrom::literal("quiet"))),
            ..exec("upper.sh")
        };
        assert_eq!(run(&ctx, &script).unwrap(), "QUIET");
    }

    #[test]
    fn runs_in_cloud_home() {
        let (home, ctx) = setup();
        write_script(&home.path().join("scripts"), "where.sh", "pwd -P");
        let expected = fs::canonicalize(home.path()).unwrap();
        assert_eq!(run(&ctx, &exec("where.sh")).unwrap(), expected.display().to_string());
    }

    #[test]
    fn first_root_wins() {
        let (home, ctx) = setup();
        let first = home.path().join("first");
        let second = home.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        write_script(&first, "which.sh", "echo first");
        write_script(&second, "which.sh", "echo second");
        let ctx = ctx.with_scripts_roots(vec![second.join("missing"), first, second]);
        assert_eq!(run(&ctx, &exec("which.sh")).unwrap(), "first");
    }

    #[test]
    fn missing_script() {
        let (_home, ctx) = setup();
        match run(&ctx, &exec("nope.sh")) {
            Err(GenifestError::NotFound(msg)) => assert!(msg.contains("nope.sh")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn failure_carries_output() {
        let (home, ctx) = setup();
        write_script(
            &home.path().join("scripts"),
            "fail.sh",
            "echo partial\necho broken >&2\nexit 3",
        );
        match run(&ctx, &exec("fail.sh")) {
            Err(GenifestError::Execution { stdout, stderr, .. }) => {
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[test]
    fn argument_errors_propagate() {
        let (home, ctx) = setup();
        write_script(&home.path().join("scripts"), "greet.sh", r#"echo "hi $1""#);
        let script = ScriptExec {
            args: vec![Argument::new("who", ValueFrom::arg("missing"))],
            ..exec("greet.sh")
        };
        assert!(matches!(run(&ctx, &script), Err(GenifestError::NotFound(_))));
    }
}
