use std::{path::Path, process::Stdio};

mod output;

pub use output::*;
use tokio::process::Command;

/// Runs `argv[0] argv[1..]` directly (no shell), capturing stdout/stderr.
///
/// This is the primitive the remote executor uses to spawn one child process
/// per remote operation: `argv` is typically a transport wrapper (`ssh`,
/// `sh -c`, ...) followed by the operation-specific arguments.
pub async fn run_command(
  argv: &[String],
  cwd: impl Into<Option<&Path>>,
) -> CommandOutput {
  let Some((program, rest)) = argv.split_first() else {
    return CommandOutput::from_err(
      std::io::Error::other("command argv is empty"),
      None,
    );
  };

  let mut cmd = Command::new(program);
  cmd
    .args(rest)
    .kill_on_drop(true)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

  if let Some(cwd) = cwd.into() {
    match cwd.canonicalize() {
      Ok(cwd) => {
        cmd.current_dir(cwd);
      }
      Err(e) => return CommandOutput::from_err(e, None),
    }
  }

  let mut child = match cmd.spawn() {
    Ok(child) => child,
    Err(e) => return CommandOutput::from_err(e, None),
  };
  let pid = child.id();

  CommandOutput::from(child.wait_with_output().await, pid)
}

/// Same as [`run_command`], but wraps `argv` in `sh -c "<joined argv>"` so
/// shell constructs (pipes, `&&`, redirection) are usable in the built
/// command line.
pub async fn run_shell_command(
  command_line: &str,
  cwd: impl Into<Option<&Path>>,
) -> CommandOutput {
  run_command(
    &[
      "sh".to_string(),
      "-c".to_string(),
      command_line.to_string(),
    ],
    cwd,
  )
  .await
}
