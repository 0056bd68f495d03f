use std::collections::HashSet;

use executor::{Executor, RemoteClient};
use manifest::{find_matching_component, subtract_snapshot_keys, SnapshotMapping, Target, TargetsTable};

use crate::{error::CoordinatorError, iter::fan_out};

fn distinct_target_containers<'a>(
  mappings: &[SnapshotMapping],
  targets: &'a TargetsTable,
) -> Vec<(&'a Target, String)> {
  let mut seen = HashSet::new();
  let mut result = Vec::new();
  for mapping in mappings {
    let pair = (mapping.key.target.clone(), mapping.key.container.clone());
    if seen.insert(pair.clone()) {
      if let Some(target) = targets.get(&mapping.key.target) {
        result.push((target, mapping.key.container.clone()));
      }
    }
  }
  result
}

struct Transfer {
  mapping: SnapshotMapping,
  from_target: String,
}

/// §4.6 (C7), run only when migration isn't skipped. Seven sub-steps over
/// the snapshot array; any failing sub-step escalates to
/// `MigrationFailed`, which the driver maps to `DEPLOY_STATE_FAIL` — the
/// activation already happened, so the new code is running even if state
/// isn't fully migrated yet.
///
/// `targets` must contain every target referenced by either
/// `old_snapshots` or `new_snapshots` — same requirement as
/// [`crate::phases::activate`], since an old snapshot can sit on a target
/// the new manifest no longer lists.
pub async fn migrate<C: RemoteClient>(
  executor: &Executor<C>,
  targets: &TargetsTable,
  old_snapshots: &[SnapshotMapping],
  new_snapshots: &mut [SnapshotMapping],
  keep: usize,
) -> Result<(), CoordinatorError> {
  // 1. Clear transferred flags on all new snapshot mappings.
  for mapping in new_snapshots.iter_mut() {
    mapping.transferred = false;
  }

  // 2. Lock state on every (target, container) pair in the new array.
  let state_pairs = distinct_target_containers(new_snapshots, targets);
  let (all_succeeded, _) = fan_out(state_pairs.iter(), |pair: &(&Target, String)| {
    let target = pair.0;
    let container = pair.1.as_str();
    executor.run(target, executor.client.lock_snapshots(target, container))
  })
  .await;
  if !all_succeeded {
    return Err(CoordinatorError::MigrationFailed(
      "state lock step failed".to_string(),
    ));
  }

  // 3. Snapshot mutable state on each obsolete mapping (S_old \ S_new).
  let obsolete: Vec<SnapshotMapping> = subtract_snapshot_keys(old_snapshots, new_snapshots)
    .into_iter()
    .cloned()
    .collect();
  let (all_succeeded, _) = fan_out(obsolete.iter(), |mapping| {
    let target = targets
      .get(&mapping.key.target)
      .expect("target exists in the old or new manifest's target table");
    executor.run(target, executor.client.snapshot(target, mapping))
  })
  .await;
  if !all_succeeded {
    return Err(CoordinatorError::MigrationFailed(
      "snapshot step failed".to_string(),
    ));
  }

  // 4. Transfer snapshots from obsolete targets to new targets where the
  // same component moved; mark transferred=true on success.
  let transfers: Vec<Transfer> = new_snapshots
    .iter()
    .filter_map(|new_mapping| {
      find_matching_component(old_snapshots, &new_mapping.key.component, &new_mapping.key.container)
        .filter(|old_mapping| old_mapping.key.target != new_mapping.key.target)
        .map(|old_mapping| Transfer {
          mapping: new_mapping.clone(),
          from_target: old_mapping.key.target.clone(),
        })
    })
    .collect();

  let (all_succeeded, completions) = fan_out(transfers.iter(), |transfer| {
    let from_target = targets
      .get(&transfer.from_target)
      .expect("target exists in the old or new manifest's target table");
    let to_target = targets
      .get(&transfer.mapping.key.target)
      .expect("target exists in the old or new manifest's target table");
    executor.run(
      to_target,
      executor
        .client
        .retrieve_snapshots(from_target, to_target, &transfer.mapping),
    )
  })
  .await;

  for (transfer, handle) in &completions {
    if handle.succeeded() {
      if let Some(mapping) = new_snapshots
        .iter_mut()
        .find(|m| m.key == transfer.mapping.key)
      {
        mapping.transferred = true;
      }
    }
  }
  if !all_succeeded {
    return Err(CoordinatorError::MigrationFailed(
      "snapshot transfer step failed".to_string(),
    ));
  }

  // 5. Restore snapshots on each new target for components with a matching
  // obsolete mapping.
  let restores: Vec<SnapshotMapping> = new_snapshots
    .iter()
    .filter(|m| {
      find_matching_component(old_snapshots, &m.key.component, &m.key.container).is_some()
    })
    .cloned()
    .collect();
  let (all_succeeded, _) = fan_out(restores.iter(), |mapping| {
    let target = targets
      .get(&mapping.key.target)
      .expect("target exists in the old or new manifest's target table");
    executor.run(target, executor.client.restore(target, mapping))
  })
  .await;
  if !all_succeeded {
    return Err(CoordinatorError::MigrationFailed(
      "restore step failed".to_string(),
    ));
  }

  // 6. Unlock state.
  let (all_succeeded, _) = fan_out(state_pairs.iter(), |pair: &(&Target, String)| {
    let target = pair.0;
    let container = pair.1.as_str();
    executor.run(target, executor.client.unlock_snapshots(target, container))
  })
  .await;
  if !all_succeeded {
    return Err(CoordinatorError::MigrationFailed(
      "state unlock step failed".to_string(),
    ));
  }

  // 7. Garbage-collect old snapshot generations, retaining `keep` most
  // recent per (component, container, target).
  let mut seen = HashSet::new();
  let mut gc_keys = Vec::new();
  for mapping in new_snapshots.iter().chain(old_snapshots.iter()) {
    let key = (
      mapping.key.target.clone(),
      mapping.key.component.clone(),
      mapping.key.container.clone(),
    );
    if seen.insert(key.clone()) {
      gc_keys.push(key);
    }
  }

  let (all_succeeded, _) = fan_out(gc_keys.iter(), |(target_name, component, container)| {
    let target = targets
      .get(target_name)
      .expect("target exists in the old or new manifest's target table");
    executor.run(
      target,
      executor.client.delete_snapshots(target, component, container, keep),
    )
  })
  .await;
  if !all_succeeded {
    return Err(CoordinatorError::MigrationFailed(
      "snapshot garbage collection failed".to_string(),
    ));
  }

  tracing::info!(
    transferred = transfers.len(),
    gc_targets = gc_keys.len(),
    "migrate phase complete"
  );
  Ok(())
}
