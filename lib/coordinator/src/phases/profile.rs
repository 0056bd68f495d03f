use std::path::Path;

use executor::{Executor, RemoteClient};
use manifest::{ProfileMappingTable, TargetsTable};

use crate::{error::CoordinatorError, iter::fan_out};

struct ProfileAssignment<'a> {
  target: &'a str,
  profile: &'a str,
  closure: &'a str,
}

/// §4.7 (C8). Two sub-steps gated by flag bits. The original source's
/// `set_profiles` short-circuits with `&&`: the coordinator profile is only
/// published once every target profile set succeeds, so this preserves
/// that ordering rather than running both unconditionally.
pub async fn set_profiles<C: RemoteClient>(
  executor: &Executor<C>,
  targets: &TargetsTable,
  profiles: &ProfileMappingTable,
  skip_target_profiles: bool,
  skip_coordinator_profile: bool,
  coordinator_profile_dir: &Path,
  profile_name: &str,
  manifest_path: &Path,
) -> Result<(), CoordinatorError> {
  if !skip_target_profiles {
    set_target_profiles(executor, targets, profiles).await?;
  }

  if !skip_coordinator_profile {
    set_coordinator_profile(coordinator_profile_dir, profile_name, manifest_path)?;
  }

  Ok(())
}

async fn set_target_profiles<C: RemoteClient>(
  executor: &Executor<C>,
  targets: &TargetsTable,
  profiles: &ProfileMappingTable,
) -> Result<(), CoordinatorError> {
  let assignments: Vec<ProfileAssignment> = profiles
    .iter()
    .map(|(target, profile, closure)| ProfileAssignment {
      target,
      profile,
      closure,
    })
    .collect();

  let (all_succeeded, completions) = fan_out(assignments.iter(), |assignment| {
    let target = targets
      .get(assignment.target)
      .expect("manifest validated: target exists");
    executor.run(
      target,
      executor
        .client
        .set_profile(target, assignment.profile, assignment.closure),
    )
  })
  .await;

  if all_succeeded {
    tracing::info!(targets = assignments.len(), "target profiles published");
    return Ok(());
  }

  for (assignment, handle) in &completions {
    if !handle.succeeded() {
      tracing::error!(
        target_name = assignment.target,
        profile = assignment.profile,
        stderr = %handle.stderr,
        "set_profile failed"
      );
    }
  }
  Err(CoordinatorError::ProfileSetFailed(
    "one or more targets failed to publish their profile".to_string(),
  ))
}

/// Publishes the manifest as the coordinator's own profile: a crash-safe
/// symlink swap under `<coordinator_profile_dir>/<profile_name>` (§6). Uses
/// create-then-rename so either the old or the new link is observable,
/// never neither.
fn set_coordinator_profile(
  coordinator_profile_dir: &Path,
  profile_name: &str,
  manifest_path: &Path,
) -> Result<(), CoordinatorError> {
  std::fs::create_dir_all(coordinator_profile_dir).map_err(|e| {
    CoordinatorError::ProfileSetFailed(format!(
      "could not create coordinator profile directory: {e}"
    ))
  })?;

  let link_path = coordinator_profile_dir.join(profile_name);
  let staging_path =
    coordinator_profile_dir.join(format!(".{profile_name}.new.{}", std::process::id()));

  if staging_path.exists() {
    let _ = std::fs::remove_file(&staging_path);
  }

  std::os::unix::fs::symlink(manifest_path, &staging_path).map_err(|e| {
    CoordinatorError::ProfileSetFailed(format!("could not stage coordinator profile symlink: {e}"))
  })?;

  std::fs::rename(&staging_path, &link_path).map_err(|e| {
    CoordinatorError::ProfileSetFailed(format!(
      "could not publish coordinator profile symlink: {e}"
    ))
  })?;

  tracing::info!(profile = profile_name, manifest = %manifest_path.display(), "coordinator profile published");
  Ok(())
}
