use thiserror::Error;

/// One variant per error kind from the error handling design (§7): each
/// carries enough context to log meaningfully, and each maps to exactly one
/// [`crate::driver::DeployStatus`] at the driver boundary.
#[derive(Debug, Error)]
pub enum CoordinatorError {
  #[error("remote operation '{operation}' failed on target '{target}': {stderr}")]
  RemoteOpFailed {
    target: String,
    operation: String,
    stderr: String,
  },

  #[error("activation failed; rollback to the previous configuration succeeded")]
  ActivationRollback,

  #[error(
    "activation failed and rollback also failed; manual intervention required"
  )]
  ActivationCatastrophe,

  #[error("migration failed: {0}")]
  MigrationFailed(String),

  #[error("profile publish failed: {0}")]
  ProfileSetFailed(String),

  #[error("lock acquisition failed: {0}")]
  LockFailed(String),

  #[error("activation dependency cycle detected")]
  CycleDetected,
}
