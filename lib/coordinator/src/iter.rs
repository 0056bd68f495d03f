use std::{
  collections::{HashMap, HashSet},
  future::Future,
};

use executor::RemoteHandle;
use manifest::ActivationMapping;

use crate::error::CoordinatorError;

/// The per-host fan-out iterator from §4.2 (C3): dispatches `spawn` for
/// every mapping concurrently and collects completions. Per-target
/// concurrency is already bounded by the [`executor::Executor`] each
/// `spawn` closure dispatches through, so this level only needs to join the
/// futures and aggregate `allSucceeded`.
pub async fn fan_out<'m, M, F, Fut>(
  mappings: impl IntoIterator<Item = &'m M>,
  spawn: F,
) -> (bool, Vec<(&'m M, RemoteHandle)>)
where
  M: 'm,
  F: Fn(&'m M) -> Fut,
  Fut: Future<Output = RemoteHandle>,
{
  let futures = mappings.into_iter().map(|mapping| {
    let fut = spawn(mapping);
    async move { (mapping, fut.await) }
  });
  let completions = futures_util::future::join_all(futures).await;
  let all_succeeded = completions.iter().all(|(_, handle)| handle.succeeded());
  (all_succeeded, completions)
}

/// Splits `mappings` into dependency-respecting levels: every mapping in
/// level *N* depends (within `mappings`) only on mappings in levels `< N`.
/// Dependencies pointing outside `mappings` are treated as already
/// satisfied — the activate phase only recurses into the `Fresh`/`Obsolete`
/// subsets, not the full activation array.
///
/// This is Kahn's algorithm with the reverse-dependency adjacency
/// precomputed once, processing a whole ready frontier per level rather
/// than one node at a time, so independent mappings within a level can be
/// dispatched concurrently by the caller. Insertion order is preserved
/// within a level (the tie-break rule for topologically independent
/// mappings). A leftover, unprocessed mapping after the frontier empties
/// means the subgraph has a cycle.
pub fn dependency_order(
  mappings: &[ActivationMapping],
) -> Result<Vec<Vec<&ActivationMapping>>, CoordinatorError> {
  let keys: HashSet<_> = mappings.iter().map(|m| &m.key).collect();

  let mut in_degree = HashMap::new();
  let mut dependents: HashMap<_, Vec<&ActivationMapping>> = HashMap::new();
  for mapping in mappings {
    let present_deps = mapping
      .dependencies
      .iter()
      .filter(|dep| keys.contains(dep))
      .count();
    in_degree.insert(&mapping.key, present_deps);
    for dep in &mapping.dependencies {
      if keys.contains(dep) {
        dependents.entry(dep).or_default().push(mapping);
      }
    }
  }

  let mut remaining: HashSet<_> = mappings.iter().map(|m| &m.key).collect();
  let mut levels = Vec::new();

  while !remaining.is_empty() {
    let level: Vec<&ActivationMapping> = mappings
      .iter()
      .filter(|m| remaining.contains(&m.key) && in_degree[&m.key] == 0)
      .collect();

    if level.is_empty() {
      return Err(CoordinatorError::CycleDetected);
    }

    for mapping in &level {
      remaining.remove(&mapping.key);
    }
    for mapping in &level {
      if let Some(deps) = dependents.get(&mapping.key) {
        for dependent in deps {
          if let Some(degree) = in_degree.get_mut(&dependent.key) {
            *degree -= 1;
          }
        }
      }
    }

    levels.push(level);
  }

  Ok(levels)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap as Map;

  use manifest::ActivationKey;

  use super::*;

  fn mapping(service: &str, deps: &[&str]) -> ActivationMapping {
    ActivationMapping {
      key: ActivationKey {
        service: service.to_string(),
        container: "default".to_string(),
        target: "host1".to_string(),
      },
      service_type: "process".to_string(),
      dependencies: deps
        .iter()
        .map(|d| ActivationKey {
          service: d.to_string(),
          container: "default".to_string(),
          target: "host1".to_string(),
        })
        .collect(),
      arguments: Map::new(),
    }
  }

  #[test]
  fn orders_dependencies_before_dependents() {
    let mappings = vec![mapping("c", &["b"]), mapping("b", &["a"]), mapping("a", &[])];
    let levels = dependency_order(&mappings).unwrap();
    let flattened: Vec<&str> = levels
      .iter()
      .flatten()
      .map(|m| m.key.service.as_str())
      .collect();
    assert_eq!(flattened, vec!["a", "b", "c"]);
  }

  #[test]
  fn detects_cycles() {
    let mappings = vec![mapping("a", &["b"]), mapping("b", &["a"])];
    assert!(matches!(
      dependency_order(&mappings),
      Err(CoordinatorError::CycleDetected)
    ));
  }

  #[test]
  fn independent_mappings_share_a_level() {
    let mappings = vec![mapping("a", &[]), mapping("b", &[])];
    let levels = dependency_order(&mappings).unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].len(), 2);
  }
}
