use std::sync::OnceLock;

use serde::Deserialize;

/// Environment-sourced configuration, loaded once and memoized the way the
/// teacher's `core_config()` does. Fields not given in the environment fall
/// back to the defaults below; a `.env` file in the working directory is
/// read first via `dotenvy`.
#[derive(Debug, Deserialize)]
pub struct CoordinatorConfig {
  #[serde(default = "default_max_concurrent_transfers")]
  pub max_concurrent_transfers: usize,
  #[serde(default = "default_keep")]
  pub keep: usize,
  #[serde(default = "default_coordinator_profile_dir")]
  pub coordinator_profile_dir: String,
  #[serde(default = "default_transport_prefix")]
  pub transport_prefix: String,
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

fn default_max_concurrent_transfers() -> usize {
  4
}

fn default_keep() -> usize {
  1
}

fn default_coordinator_profile_dir() -> String {
  "/var/lib/coordinatord/profiles".to_string()
}

fn default_transport_prefix() -> String {
  "ssh".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

/// Reads `COORDINATOR_*` environment variables (after loading `.env`, if
/// present) into a [`CoordinatorConfig`], memoized for the life of the
/// process.
pub fn coordinator_config() -> &'static CoordinatorConfig {
  static CONFIG: OnceLock<CoordinatorConfig> = OnceLock::new();
  CONFIG.get_or_init(|| {
    dotenvy::dotenv().ok();
    envy::prefixed("COORDINATOR_")
      .from_env()
      .expect("invalid COORDINATOR_* environment configuration")
  })
}
