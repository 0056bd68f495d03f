use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A reachable machine participating in the deployment. Targets are
/// immutable for the duration of a deploy call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
  pub name: String,
  /// Identifies which transport/client-interface reaches this target
  /// (e.g. `ssh`, `disnix-ssh-client`). Opaque to the coordinator.
  pub client_interface: String,
  pub containers: Vec<String>,
  /// Upper bound on concurrently in-flight remote operations for this
  /// target, enforced by `executor`'s per-host semaphore.
  pub concurrent_transfers: usize,
}

pub type TargetsTable = HashMap<String, Target>;
