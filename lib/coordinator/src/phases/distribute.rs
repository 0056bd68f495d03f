use executor::{Executor, RemoteClient};
use manifest::{DistributionItem, TargetsTable};

use crate::{error::CoordinatorError, iter::fan_out};

/// §4.3 (C4): transfers each distribution item's closure to its target.
/// Fatal on any failure — the driver aborts before any lock or activation
/// side-effect has occurred.
pub async fn distribute<C: RemoteClient>(
  executor: &Executor<C>,
  distribution: &[DistributionItem],
  targets: &TargetsTable,
) -> Result<(), CoordinatorError> {
  let (all_succeeded, completions) = fan_out(distribution.iter(), |item| {
    let target = targets
      .get(&item.target)
      .expect("manifest validated: target exists");
    executor.run(target, executor.client.copy_closure(target, &item.closure))
  })
  .await;

  if all_succeeded {
    tracing::info!(count = distribution.len(), "distribute phase complete");
    return Ok(());
  }

  let mut first_failure = None;
  for (item, handle) in &completions {
    if !handle.succeeded() {
      tracing::error!(
        target_name = %item.target,
        closure = %item.closure,
        stderr = %handle.stderr,
        "copy_closure failed"
      );
      first_failure.get_or_insert_with(|| item.target.clone());
    }
  }

  Err(CoordinatorError::RemoteOpFailed {
    target: first_failure.unwrap_or_default(),
    operation: "copy_closure".to_string(),
    stderr: "one or more targets failed to receive their closure".to_string(),
  })
}
