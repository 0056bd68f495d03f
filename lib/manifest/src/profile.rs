use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-target mapping of profile name to the closure path that should be
/// published under it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileMappingTable(
  pub HashMap<String, HashMap<String, String>>,
);

impl ProfileMappingTable {
  pub fn iter(
    &self,
  ) -> impl Iterator<Item = (&str, &str, &str)> {
    self.0.iter().flat_map(|(target, profiles)| {
      profiles
        .iter()
        .map(move |(profile, closure)| (target.as_str(), profile.as_str(), closure.as_str()))
    })
  }
}
