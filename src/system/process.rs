use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::RenderError;

/// Exit status `git diff` and difftastic use to report "differences found".
pub const DIFF_FOUND_EXIT_CODE: i32 = 1;

/// Run a diff-producing command and return its stdout.
/// Exit 0 and the "differences found" status are both success.
pub async fn run_diff_tool(cmd: &mut Command, label: &str) -> Result<String, RenderError> {
    let output = cmd.output().await.map_err(|e| RenderError::Spawn {
        label: label.to_string(),
        message: e.to_string(),
    })?;
    diff_tool_output(output, label)
}

/// Classify a finished diff-tool process.
pub fn diff_tool_output(output: Output, label: &str) -> Result<String, RenderError> {
    match output.status.code() {
        Some(0) | Some(DIFF_FOUND_EXIT_CODE) => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        code => Err(RenderError::Exit {
            label: label.to_string(),
            // Killed by a signal: no code to report.
            code: code.unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Spawn `cmd`, feed `input` on stdin, and collect the output.
pub async fn run_with_stdin(cmd: &mut Command, input: &[u8]) -> std::io::Result<Output> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await?;
        // Dropping closes the pipe so the child sees EOF.
        drop(stdin);
    }

    child.wait_with_output().await
}

/// Locate an executable on `PATH`.
pub fn find_executable(name: &str) -> Option<std::path::PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
