//! Subprocess plumbing shared by the tool adapters.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;

use super::{ProviderFailure, SourceUnit};

/// Captured output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Write the unit to a fresh `.py` file owned by the caller.
///
/// The file is removed when the returned handle is dropped.
pub fn scratch_copy(unit: &SourceUnit) -> Result<NamedTempFile, ProviderFailure> {
    let mut file = tempfile::Builder::new()
        .prefix("pyreview_")
        .suffix(".py")
        .tempfile()?;
    file.write_all(unit.code.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Run `program` with `args` and capture its output.
///
/// The child is killed if the returned future is dropped before it exits.
pub async fn run_tool(program: &str, args: &[&str]) -> Result<ToolOutput, ProviderFailure> {
    tracing::debug!(program, ?args, "running tool");
    let mut command = Command::new(program);
    command.args(args);
    capture(command).await
}

/// Like [`run_tool`], with `dir` as the working directory.
pub async fn run_tool_in(
    dir: &Path,
    program: &str,
    args: &[&str],
) -> Result<ToolOutput, ProviderFailure> {
    tracing::debug!(program, ?args, dir = %dir.display(), "running tool");
    let mut command = Command::new(program);
    command.args(args).current_dir(dir);
    capture(command).await
}

async fn capture(mut command: Command) -> Result<ToolOutput, ProviderFailure> {
    let output = command
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(ToolOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// First non-empty stderr line, for error messages.
pub fn stderr_summary(output: &ToolOutput) -> String {
    output
        .stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}
