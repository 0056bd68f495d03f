use std::path::Path;

use executor::{Executor, RemoteClient};
use manifest::{ActivationMapping, Manifest, SnapshotMapping, Target, TargetsTable};

use crate::{
  error::CoordinatorError,
  flags::DeployFlags,
  hooks::Hook,
  phases::{activate, distribute, lock, migrate, set_profiles, unlock},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
  Ok,
  Fail,
  StateFail,
}

/// Everything [`deploy`] needs besides the [`RemoteClient`] it dispatches
/// through — mirrors the parameter list of the public `deploy` operation
/// in §6.
pub struct DeployParams<'a> {
  pub new_manifest: &'a Manifest,
  pub old_manifest: Option<&'a Manifest>,
  pub new_manifest_path: &'a Path,
  pub profile_name: &'a str,
  pub coordinator_profile_dir: &'a Path,
  pub max_concurrent_transfers: usize,
  pub keep: usize,
  pub flags: DeployFlags,
  pub pre_hook: Hook,
  pub post_hook: Hook,
}

/// §4.8 (C9): orchestrates `distribute → lock → activate → migrate →
/// profiles → unlock` in order, short-circuiting on failure. Every failure
/// point maps onto exactly one `DeployStatus` per the table in §4.8/§7.
pub async fn deploy<C: RemoteClient>(client: C, params: DeployParams<'_>) -> DeployStatus {
  // The union of both manifests' targets: an upgrade that decommissions a
  // target still needs that target resolvable while its obsolete mappings
  // are deactivated and its old snapshots are migrated away.
  let capped_targets = cap_targets(
    params.new_manifest.targets.iter().chain(
      params
        .old_manifest
        .map(|m| m.targets.iter())
        .into_iter()
        .flatten(),
    ),
    params.max_concurrent_transfers,
  );
  let executor = Executor::new(client, &capped_targets).await;

  let empty_activation: Vec<ActivationMapping> = Vec::new();
  let empty_snapshots: Vec<SnapshotMapping> = Vec::new();

  let old_activation: &[ActivationMapping] = if params.flags.no_upgrade {
    &empty_activation
  } else {
    params
      .old_manifest
      .map(|m| m.activation.as_slice())
      .unwrap_or(&empty_activation)
  };
  let old_snapshots: &[SnapshotMapping] = if params.flags.no_upgrade {
    &empty_snapshots
  } else {
    params
      .old_manifest
      .map(|m| m.snapshots.as_slice())
      .unwrap_or(&empty_snapshots)
  };

  if let Err(e) = distribute(
    &executor,
    &params.new_manifest.distribution,
    &capped_targets,
  )
  .await
  {
    tracing::error!(error = %e, "distribute phase failed");
    return DeployStatus::Fail;
  }

  if !params.flags.no_lock {
    if let Err(e) = lock(
      &executor,
      &params.new_manifest.distribution,
      &capped_targets,
      params.profile_name,
      &params.pre_hook,
    )
    .await
    {
      tracing::error!(error = %e, "lock phase failed");
      return DeployStatus::Fail;
    }
  }

  let transition = activate(
    &executor,
    &capped_targets,
    old_activation,
    &params.new_manifest.activation,
    &params.pre_hook,
    &params.post_hook,
  )
  .await;

  match transition {
    Ok(report) => {
      tracing::info!(
        deactivated = report.deactivated,
        activated = report.activated,
        "transition status"
      );
    }
    Err(CoordinatorError::ActivationRollback) => {
      tracing::error!("activate phase failed, rollback to the previous configuration succeeded");
      return finish(&executor, &params, &capped_targets, DeployStatus::Fail).await;
    }
    Err(CoordinatorError::ActivationCatastrophe) => {
      tracing::error!("activate phase failed and rollback also failed; manual intervention required");
      return finish(&executor, &params, &capped_targets, DeployStatus::StateFail).await;
    }
    Err(e) => {
      tracing::error!(error = %e, "activate phase aborted before dispatching any operation");
      return finish(&executor, &params, &capped_targets, DeployStatus::Fail).await;
    }
  }

  let mut new_snapshots = params.new_manifest.snapshots.clone();
  if !params.flags.no_migration {
    if let Err(e) = migrate(
      &executor,
      &capped_targets,
      old_snapshots,
      &mut new_snapshots,
      params.keep,
    )
    .await
    {
      tracing::error!(error = %e, "migrate phase failed");
      return finish(&executor, &params, &capped_targets, DeployStatus::StateFail).await;
    }
  }

  // SET_NO_TARGET_PROFILES / SET_NO_COORDINATOR_PROFILE are sub-flags of
  // the profile phase in §4.7; the public flag bitset in §6 doesn't expose
  // them, so both sub-steps always run here.
  let status = match set_profiles(
    &executor,
    &capped_targets,
    &params.new_manifest.profiles,
    false,
    false,
    params.coordinator_profile_dir,
    params.profile_name,
    params.new_manifest_path,
  )
  .await
  {
    Ok(()) => DeployStatus::Ok,
    Err(e) => {
      tracing::error!(error = %e, "profile publish failed");
      DeployStatus::Fail
    }
  };

  if params.flags.delete_old && status == DeployStatus::Ok {
    tracing::info!(
      "requesting removal of old profile generations (delegated to the package store, out of scope here)"
    );
  }

  finish(&executor, &params, &capped_targets, status).await
}

/// Runs unlock on every exit path once lock has succeeded (§8 property 6),
/// folding an unlock failure into the final status only as a downgrade
/// from `Ok`, never masking an existing failure.
async fn finish<C: RemoteClient>(
  executor: &Executor<C>,
  params: &DeployParams<'_>,
  targets: &TargetsTable,
  status: DeployStatus,
) -> DeployStatus {
  if params.flags.no_lock {
    return status;
  }

  match unlock(
    executor,
    &params.new_manifest.distribution,
    targets,
    params.profile_name,
    &params.post_hook,
  )
  .await
  {
    Ok(()) => status,
    Err(e) => {
      tracing::error!(error = %e, "unlock phase failed (diagnostic only)");
      if status == DeployStatus::Ok {
        DeployStatus::Fail
      } else {
        status
      }
    }
  }
}

/// Builds a capped target table from one or more target iterators. Earlier
/// entries win on name collision, so callers that chain the new manifest's
/// targets before the old manifest's keep the new definition authoritative.
fn cap_targets<'a>(
  targets: impl Iterator<Item = (&'a String, &'a Target)>,
  max_concurrent_transfers: usize,
) -> TargetsTable {
  let mut result = TargetsTable::new();
  for (name, target) in targets {
    result.entry(name.clone()).or_insert_with(|| {
      let mut capped = target.clone();
      capped.concurrent_transfers =
        capped.concurrent_transfers.min(max_concurrent_transfers.max(1));
      capped
    });
  }
  result
}
