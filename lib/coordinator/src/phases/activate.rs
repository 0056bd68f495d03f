use executor::{Executor, RemoteClient};
use manifest::{
  find_by_key, subtract_activation_keys, ActivationKey, ActivationMapping, TargetsTable,
};

use crate::{
  error::CoordinatorError,
  hooks::{run_hook, Hook},
  iter::{dependency_order, fan_out},
};

/// Successful outcome of one activate-phase run, logged once at phase end.
/// A failed run never reaches this type — it surfaces as
/// [`CoordinatorError::ActivationRollback`] or
/// [`CoordinatorError::ActivationCatastrophe`] instead (§7).
#[derive(Debug, Clone)]
pub struct TransitionReport {
  pub deactivated: usize,
  pub activated: usize,
}

/// §4.5 (C6), the central algorithm: diffs `old_activation` against
/// `new_activation`, deactivates what's obsolete (leaves first), then
/// activates what's fresh (roots first), rolling back on failure in either
/// pass.
///
/// `targets` must contain every target referenced by either
/// `old_activation` or `new_activation` — callers deploying an upgrade that
/// decommissions a target need to pass the union of the old and new
/// manifests' target tables, since the obsolete mappings being deactivated
/// still need to resolve against the old target.
pub async fn activate<C: RemoteClient>(
  executor: &Executor<C>,
  targets: &TargetsTable,
  old_activation: &[ActivationMapping],
  new_activation: &[ActivationMapping],
  pre_hook: &Hook,
  post_hook: &Hook,
) -> Result<TransitionReport, CoordinatorError> {
  run_hook("activate:pre", pre_hook);

  let obsolete: Vec<ActivationMapping> = subtract_activation_keys(old_activation, new_activation)
    .into_iter()
    .cloned()
    .collect();
  let fresh: Vec<ActivationMapping> = subtract_activation_keys(new_activation, old_activation)
    .into_iter()
    .cloned()
    .collect();

  // Deactivation pass: reverse topological order of the old graph,
  // restricted to the obsolete subset (leaves — i.e. dependents — first).
  let mut deactivation_levels = dependency_order(&obsolete)?;
  deactivation_levels.reverse();

  let mut deactivated_in_order: Vec<ActivationKey> = Vec::new();
  for level in deactivation_levels {
    let (all_succeeded, completions) = fan_out(level.into_iter(), |mapping| {
      let target = targets
        .get(&mapping.key.target)
        .expect("target exists in the old or new manifest's target table");
      executor.run(target, executor.client.deactivate(target, mapping))
    })
    .await;

    for (mapping, handle) in &completions {
      if handle.succeeded() {
        deactivated_in_order.push(mapping.key.clone());
      }
    }

    if !all_succeeded {
      tracing::error!("deactivation step failed, rolling back");
      return Err(
        rollback_deactivation(executor, targets, &obsolete, &deactivated_in_order).await,
      );
    }
  }

  // Activation pass: topological order of the new graph, restricted to the
  // fresh subset (dependencies before dependents).
  let activation_levels = dependency_order(&fresh)?;

  let mut activated_in_order: Vec<ActivationKey> = Vec::new();
  for level in activation_levels {
    let (all_succeeded, completions) = fan_out(level.into_iter(), |mapping| {
      let target = targets
        .get(&mapping.key.target)
        .expect("target exists in the old or new manifest's target table");
      executor.run(target, executor.client.activate(target, mapping))
    })
    .await;

    for (mapping, handle) in &completions {
      if handle.succeeded() {
        activated_in_order.push(mapping.key.clone());
      }
    }

    if !all_succeeded {
      tracing::error!("activation step failed, rolling back");
      return Err(
        rollback_activation(
          executor,
          targets,
          &fresh,
          &obsolete,
          &activated_in_order,
          &deactivated_in_order,
        )
        .await,
      );
    }
  }

  run_hook("activate:post", post_hook);

  let report = TransitionReport {
    deactivated: deactivated_in_order.len(),
    activated: activated_in_order.len(),
  };
  tracing::info!(
    deactivated = report.deactivated,
    activated = report.activated,
    "activate phase complete"
  );
  Ok(report)
}

/// Step 3 rollback: re-activate everything deactivated so far, in reverse
/// order. Returns [`CoordinatorError::ActivationRollback`] if every
/// re-activation succeeds, [`CoordinatorError::ActivationCatastrophe`] if
/// any of them also fails.
async fn rollback_deactivation<C: RemoteClient>(
  executor: &Executor<C>,
  targets: &TargetsTable,
  obsolete: &[ActivationMapping],
  deactivated_in_order: &[ActivationKey],
) -> CoordinatorError {
  let mut rollback_ok = true;

  for key in deactivated_in_order.iter().rev() {
    let mapping = find_by_key(obsolete, key).expect("key came from the obsolete set");
    let target = targets
      .get(&key.target)
      .expect("target exists in the old or new manifest's target table");
    let handle = executor.run(target, executor.client.activate(target, mapping)).await;
    if !handle.succeeded() {
      tracing::error!(target_name = %target.name, service = %key.service, "rollback re-activation failed");
      rollback_ok = false;
    }
  }

  tracing::error!(
    rolled_back = deactivated_in_order.len(),
    rollback_ok,
    "activate phase failed during deactivation"
  );
  if rollback_ok {
    CoordinatorError::ActivationRollback
  } else {
    CoordinatorError::ActivationCatastrophe
  }
}

/// Step 3 rollback for the activation pass: deactivate everything activated
/// in this pass (reverse order), then re-activate the obsolete mappings
/// deactivated in step 1 (reverse of their deactivation order). Returns
/// [`CoordinatorError::ActivationRollback`] if every step succeeds,
/// [`CoordinatorError::ActivationCatastrophe`] otherwise.
async fn rollback_activation<C: RemoteClient>(
  executor: &Executor<C>,
  targets: &TargetsTable,
  fresh: &[ActivationMapping],
  obsolete: &[ActivationMapping],
  activated_in_order: &[ActivationKey],
  deactivated_in_order: &[ActivationKey],
) -> CoordinatorError {
  let mut rollback_ok = true;

  for key in activated_in_order.iter().rev() {
    let mapping = find_by_key(fresh, key).expect("key came from the fresh set");
    let target = targets
      .get(&key.target)
      .expect("target exists in the old or new manifest's target table");
    let handle = executor.run(target, executor.client.deactivate(target, mapping)).await;
    if !handle.succeeded() {
      tracing::error!(target_name = %target.name, service = %key.service, "rollback deactivation failed");
      rollback_ok = false;
    }
  }

  for key in deactivated_in_order.iter().rev() {
    let mapping = find_by_key(obsolete, key).expect("key came from the obsolete set");
    let target = targets
      .get(&key.target)
      .expect("target exists in the old or new manifest's target table");
    let handle = executor.run(target, executor.client.activate(target, mapping)).await;
    if !handle.succeeded() {
      tracing::error!(target_name = %target.name, service = %key.service, "rollback re-activation failed");
      rollback_ok = false;
    }
  }

  tracing::error!(
    rolled_back = activated_in_order.len() + deactivated_in_order.len(),
    rollback_ok,
    "activate phase failed during activation"
  );
  if rollback_ok {
    CoordinatorError::ActivationRollback
  } else {
    CoordinatorError::ActivationCatastrophe
  }
}
