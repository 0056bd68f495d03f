use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Uniquely identifies a desired (service, container, target) placement.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActivationKey {
  pub service: String,
  pub container: String,
  pub target: String,
}

/// A desired service placement with its dependency edges.
///
/// Deactivated/activated status while walking the dependency graph during
/// the activate/deactivate passes is phase-local working state tracked by
/// `coordinator::iter::dependency_order`, not part of the manifest as
/// parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationMapping {
  pub key: ActivationKey,
  pub service_type: String,
  /// Keys of activation mappings this one depends on. Forms a DAG; a cycle
  /// is surfaced as an error by the traversal, never silently ignored.
  pub dependencies: Vec<ActivationKey>,
  pub arguments: HashMap<String, String>,
}

impl ActivationMapping {
  pub fn key(&self) -> &ActivationKey {
    &self.key
  }
}

/// Finds the keys present in `a` but not in `b`, by key equality, preserving
/// `a`'s insertion order (the tie-break rule for topologically-independent
/// mappings).
pub fn subtract_activation_keys<'a>(
  a: &'a [ActivationMapping],
  b: &'a [ActivationMapping],
) -> Vec<&'a ActivationMapping> {
  a.iter().filter(|m| !b.iter().any(|o| o.key == m.key)).collect()
}

pub fn find_by_key<'a>(
  mappings: &'a [ActivationMapping],
  key: &ActivationKey,
) -> Option<&'a ActivationMapping> {
  mappings.iter().find(|m| &m.key == key)
}
