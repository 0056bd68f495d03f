/// Mirrors a child process's exit: the engine never inspects OS process
/// types directly, only this small value type (§9 design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
  Ok,
  AbnormalTermination,
}

/// Result of one remote operation: a process spawned over some transport,
/// awaited to completion.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
  pub pid: Option<u32>,
  pub status: ExecStatus,
  /// `true` iff the operation itself reports success (exit code 0), as
  /// distinct from whether the process terminated normally at all.
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

impl RemoteHandle {
  /// `status=Ok ∧ result=success`, the aggregation rule used by every
  /// mapping iterator and phase.
  pub fn succeeded(&self) -> bool {
    self.status == ExecStatus::Ok && self.success
  }

  pub fn from_command_output(output: command::CommandOutput) -> Self {
    let status = if output.status.code().is_some() {
      ExecStatus::Ok
    } else {
      ExecStatus::AbnormalTermination
    };
    RemoteHandle {
      pid: output.pid,
      status,
      success: output.success(),
      stdout: output.stdout,
      stderr: output.stderr,
    }
  }
}
