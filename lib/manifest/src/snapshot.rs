use serde::{Deserialize, Serialize};

/// Uniquely identifies a mutable-state transfer for a (component, container,
/// target) triple.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SnapshotKey {
  pub component: String,
  pub container: String,
  pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMapping {
  pub key: SnapshotKey,
  /// Full path to the corresponding service, used to derive the snapshot
  /// generation's storage location on the owning target.
  pub service: String,
  pub service_type: String,
  #[serde(default)]
  pub transferred: bool,
}

/// Finds the keys present in `a` but not in `b`, by key equality.
pub fn subtract_snapshot_keys<'a>(
  a: &'a [SnapshotMapping],
  b: &'a [SnapshotMapping],
) -> Vec<&'a SnapshotMapping> {
  a.iter().filter(|m| !b.iter().any(|o| o.key == m.key)).collect()
}

pub fn find_matching_component<'a>(
  mappings: &'a [SnapshotMapping],
  component: &str,
  container: &str,
) -> Option<&'a SnapshotMapping> {
  mappings.iter().find(|m| {
    m.key.component == component && m.key.container == container
  })
}
