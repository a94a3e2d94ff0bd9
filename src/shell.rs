//! Thin wrappers around `std::process::Command`
//!
//! Two call shapes are offered: [`run`] when the caller needs stdout and
//! treats a non-zero exit as an error, and [`call`] when only a success
//! signal is needed.

use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use colored::Colorize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Run a program and return its stdout
///
/// Fails with [`Error::Command`] when the program exits with a non-zero status.
pub fn run<P: AsRef<OsStr>>(program: P, args: &[&str]) -> Result<String> {
    let program = program.as_ref();
    debug!(?program, ?args, "running command");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    check_output(program, output)
}

/// Run a program, feeding `input` to its stdin, and return its stdout
pub fn run_with_input<P: AsRef<OsStr>>(program: P, args: &[&str], input: &str) -> Result<String> {
    let program = program.as_ref();
    debug!(?program, ?args, "running command with piped stdin");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    check_output(program, output)
}

/// Run a program and report whether it exited successfully
///
/// Never fails: a missing program or a non-zero exit both yield `false`.
/// Unless `silent`, the command line is echoed and the child's output is
/// passed through to the terminal.
pub fn call<P: AsRef<OsStr>>(program: P, args: &[&str], silent: bool) -> bool {
    let program = program.as_ref();
    let mut command = Command::new(program);
    command.args(args);

    if silent {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    } else {
        println!(
            "{} {} {} {}",
            "RUN COMMAND --".yellow(),
            Path::new(program).display(),
            args.join(" "),
            "--".yellow()
        );
    }

    match command.status() {
        Ok(status) => status.success(),
        Err(err) => {
            debug!(?program, %err, "command could not be started");
            false
        }
    }
}

/// Run a single command line through `sh -c` and return its stdout
pub fn run_shell(command: &str) -> Result<String> {
    run("sh", &["-c", command])
}

/// The login name of the local user, as the shell sees it
///
/// Empty when `USER` is unset, as in cron jobs and most containers.
pub fn local_username() -> String {
    match run_shell("echo $USER") {
        Ok(name) => name.trim().to_string(),
        Err(err) => {
            warn!(%err, "could not determine the local user");
            String::new()
        }
    }
}

fn spawn_error(program: &OsStr, err: std::io::Error) -> Error {
    Error::Command(format!(
        "failed to execute {}: {}",
        Path::new(program).display(),
        err
    ))
}

fn check_output(program: &OsStr, output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Command(format!(
            "{} exited with {}: {}",
            Path::new(program).display(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
