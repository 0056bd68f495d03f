mod config;
mod manifest_loader;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use coordinator::{noop_hook, DeployFlags, DeployParams, DeployStatus};
use executor::ProcessRemoteClient;
use logger::LogConfig;

/// Drives a single distributed deployment: copies closures to every target,
/// locks affected components, transitions activation from the old manifest
/// to the new one, migrates state, and publishes profiles.
#[derive(Debug, Parser)]
#[command(name = "coordinatord", version, about)]
struct Cli {
  /// Path to the JSON manifest describing the desired deployment.
  #[arg(long)]
  new_manifest: PathBuf,

  /// Path to the JSON manifest describing the currently active deployment.
  /// Omit to recover it from the coordinator profile symlink under
  /// `--coordinator-profile-dir`; if that symlink doesn't exist either,
  /// deploys as if nothing is currently active (a full activation, same
  /// effect as `--no-upgrade` for the activation diff).
  #[arg(long)]
  old_manifest: Option<PathBuf>,

  /// Profile name used for locking and for the published target/coordinator
  /// profiles.
  #[arg(long, default_value = "default")]
  profile: String,

  /// Directory where the coordinator's own profile symlinks are published.
  /// Overrides `COORDINATOR_COORDINATOR_PROFILE_DIR` when given.
  #[arg(long)]
  coordinator_profile_dir: Option<PathBuf>,

  /// Skip the lock/unlock phases entirely.
  #[arg(long)]
  no_lock: bool,

  /// Skip the migrate phase.
  #[arg(long)]
  no_migration: bool,

  /// Treat the old manifest as empty: full activation, no diff.
  #[arg(long)]
  no_upgrade: bool,

  /// After a successful deploy, request removal of old profile generations.
  #[arg(long)]
  delete_old: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  let cfg = config::coordinator_config();

  if let Err(e) = logger::init(&LogConfig {
    level: cfg.log_level.clone(),
    ..Default::default()
  }) {
    eprintln!("failed to initialize logging: {e:#}");
  }

  let new_manifest = match manifest_loader::load_manifest(&cli.new_manifest) {
    Ok(m) => m,
    Err(e) => {
      tracing::error!(error = %e, "failed to load new manifest");
      return ExitCode::FAILURE;
    }
  };

  let coordinator_profile_dir = cli
    .coordinator_profile_dir
    .unwrap_or_else(|| PathBuf::from(cfg.coordinator_profile_dir.clone()));

  let resolved_old_manifest_path = cli.old_manifest.clone().or_else(|| {
    manifest_loader::resolve_active_manifest_path(&coordinator_profile_dir, &cli.profile)
  });

  let old_manifest = match resolved_old_manifest_path.as_deref() {
    Some(path) => match manifest_loader::load_manifest(path) {
      Ok(m) => Some(m),
      Err(e) => {
        tracing::error!(error = %e, path = %path.display(), "failed to load old manifest");
        return ExitCode::FAILURE;
      }
    },
    None => None,
  };

  let client = ProcessRemoteClient::new(vec![cfg.transport_prefix.clone()]);

  let flags = DeployFlags {
    no_lock: cli.no_lock,
    no_migration: cli.no_migration,
    no_upgrade: cli.no_upgrade,
    delete_old: cli.delete_old,
  };

  let params = DeployParams {
    new_manifest: &new_manifest,
    old_manifest: old_manifest.as_ref(),
    new_manifest_path: &cli.new_manifest,
    profile_name: &cli.profile,
    coordinator_profile_dir: &coordinator_profile_dir,
    max_concurrent_transfers: cfg.max_concurrent_transfers,
    keep: cfg.keep,
    flags,
    pre_hook: noop_hook(),
    post_hook: noop_hook(),
  };

  match coordinator::deploy(client, params).await {
    DeployStatus::Ok => ExitCode::SUCCESS,
    DeployStatus::Fail => ExitCode::FAILURE,
    DeployStatus::StateFail => ExitCode::from(2),
  }
}
