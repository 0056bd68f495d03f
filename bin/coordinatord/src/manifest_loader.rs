use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use manifest::Manifest;

/// Loads a [`Manifest`] from a JSON file on disk. This stands in for the
/// real on-disk manifest parser, which is explicitly out of scope: the
/// engine only ever consumes the in-memory [`Manifest`] model.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read manifest at {}", path.display()))?;
  let manifest: Manifest = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse manifest at {}", path.display()))?;
  manifest
    .validate()
    .with_context(|| format!("manifest at {} failed validation", path.display()))?;
  Ok(manifest)
}

/// Resolves the manifest path the coordinator profile symlink currently
/// points at, if the profile exists. Used to recover the old manifest for
/// an upgrade when the caller doesn't supply one explicitly.
pub fn resolve_active_manifest_path(
  coordinator_profile_dir: &Path,
  profile_name: &str,
) -> Option<PathBuf> {
  let link = coordinator_profile_dir.join(profile_name);
  std::fs::read_link(&link).ok()
}
