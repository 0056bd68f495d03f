use std::collections::HashSet;

use executor::{Executor, RemoteClient};
use manifest::{DistributionItem, Target, TargetsTable};

use crate::{
  error::CoordinatorError,
  hooks::{run_hook, Hook},
  iter::fan_out,
};

fn distinct_targets<'a>(
  distribution: &[DistributionItem],
  targets: &'a TargetsTable,
) -> Vec<&'a Target> {
  let mut seen = HashSet::new();
  let mut result = Vec::new();
  for item in distribution {
    if seen.insert(item.target.as_str()) {
      if let Some(target) = targets.get(&item.target) {
        result.push(target);
      }
    }
  }
  result
}

/// §4.4 (C5): `preHook` runs once, then every target appearing in the
/// distribution array is sent a `lock_component` call — one per target, no
/// per-target cap beyond the default executor bound.
pub async fn lock<C: RemoteClient>(
  executor: &Executor<C>,
  distribution: &[DistributionItem],
  targets: &TargetsTable,
  profile: &str,
  pre_hook: &Hook,
) -> Result<(), CoordinatorError> {
  run_hook("lock:pre", pre_hook);

  let hosts = distinct_targets(distribution, targets);
  let (all_succeeded, completions) = fan_out(hosts.iter().copied(), |target| {
    executor.run(target, executor.client.lock_component(target, profile))
  })
  .await;

  if all_succeeded {
    tracing::info!(targets = hosts.len(), "lock phase complete");
    return Ok(());
  }

  for (target, handle) in &completions {
    if !handle.succeeded() {
      tracing::error!(target_name = %target.name, stderr = %handle.stderr, "lock_component failed");
    }
  }
  Err(CoordinatorError::LockFailed(
    "one or more targets failed to lock".to_string(),
  ))
}

/// Symmetric to [`lock`]: invoked on every exit path once locks have been
/// acquired (§5 ordering guarantees, §8 property 6), regardless of what
/// happened in between. `postHook` runs after the unlock dispatch.
pub async fn unlock<C: RemoteClient>(
  executor: &Executor<C>,
  distribution: &[DistributionItem],
  targets: &TargetsTable,
  profile: &str,
  post_hook: &Hook,
) -> Result<(), CoordinatorError> {
  let hosts = distinct_targets(distribution, targets);
  let (all_succeeded, completions) = fan_out(hosts.iter().copied(), |target| {
    executor.run(target, executor.client.unlock_component(target, profile))
  })
  .await;

  run_hook("lock:post", post_hook);

  if all_succeeded {
    tracing::info!(targets = hosts.len(), "unlock phase complete");
    return Ok(());
  }

  for (target, handle) in &completions {
    if !handle.succeeded() {
      tracing::error!(target_name = %target.name, stderr = %handle.stderr, "unlock_component failed");
    }
  }
  Err(CoordinatorError::LockFailed(
    "one or more targets failed to unlock".to_string(),
  ))
}
