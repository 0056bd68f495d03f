//! In-memory representation of a desired distributed deployment
//! configuration (§3 of the deployment coordinator design).
//!
//! This crate owns the data model only. Producing a [`Manifest`] from an
//! on-disk representation (XML, in Disnix's case) is deliberately out of
//! scope here — see `bin/coordinatord`'s JSON loader for a minimal stand-in.

mod activation;
mod profile;
mod snapshot;
mod target;

pub use activation::*;
pub use profile::*;
pub use snapshot::*;
pub use target::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionItem {
  pub target: String,
  /// Path to the build closure to transfer to `target`.
  pub closure: String,
}

/// Root entity describing a complete desired deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub distribution: Vec<DistributionItem>,
  #[serde(default)]
  pub activation: Vec<ActivationMapping>,
  #[serde(default)]
  pub snapshots: Vec<SnapshotMapping>,
  #[serde(default)]
  pub profiles: ProfileMappingTable,
  #[serde(default)]
  pub targets: TargetsTable,
}

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("distribution item references unknown target '{0}'")]
  UnknownDistributionTarget(String),
  #[error("activation mapping {0:?} references unknown target")]
  UnknownActivationTarget(ActivationKey),
  #[error("snapshot mapping {0:?} references unknown target")]
  UnknownSnapshotTarget(SnapshotKey),
  #[error("duplicate activation key {0:?}")]
  DuplicateActivationKey(ActivationKey),
  #[error("duplicate snapshot key {0:?}")]
  DuplicateSnapshotKey(SnapshotKey),
}

impl Manifest {
  /// Checks the invariants from §3: every mapping references a target that
  /// exists, and keys are unique within each array.
  pub fn validate(&self) -> Result<(), ManifestError> {
    for item in &self.distribution {
      if !self.targets.contains_key(&item.target) {
        return Err(ManifestError::UnknownDistributionTarget(
          item.target.clone(),
        ));
      }
    }

    let mut seen_activation = std::collections::HashSet::new();
    for mapping in &self.activation {
      if !self.targets.contains_key(&mapping.key.target) {
        return Err(ManifestError::UnknownActivationTarget(
          mapping.key.clone(),
        ));
      }
      if !seen_activation.insert(&mapping.key) {
        return Err(ManifestError::DuplicateActivationKey(
          mapping.key.clone(),
        ));
      }
    }

    let mut seen_snapshot = std::collections::HashSet::new();
    for mapping in &self.snapshots {
      if !self.targets.contains_key(&mapping.key.target) {
        return Err(ManifestError::UnknownSnapshotTarget(
          mapping.key.clone(),
        ));
      }
      if !seen_snapshot.insert(&mapping.key) {
        return Err(ManifestError::DuplicateSnapshotKey(
          mapping.key.clone(),
        ));
      }
    }

    Ok(())
  }
}
