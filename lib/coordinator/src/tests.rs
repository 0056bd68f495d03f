use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex},
};

use executor::{ExecStatus, RemoteClient, RemoteHandle};
use manifest::{
  ActivationKey, ActivationMapping, DistributionItem, Manifest, ProfileMappingTable, Target,
  TargetsTable,
};

use crate::{
  driver::{deploy, DeployParams, DeployStatus},
  flags::DeployFlags,
  hooks::noop_hook,
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
  fn record(&self, op: impl Into<String>) {
    self.0.lock().unwrap().push(op.into());
  }

  fn calls(&self) -> Vec<String> {
    self.0.lock().unwrap().clone()
  }

  fn position_of(&self, needle: &str) -> Option<usize> {
    self.calls().iter().position(|c| c.contains(needle))
  }
}

#[derive(Clone, Default)]
struct FakeClient {
  recorder: Recorder,
  fail: Arc<Mutex<HashSet<String>>>,
}

impl FakeClient {
  fn failing(labels: &[&str]) -> Self {
    let client = Self::default();
    client
      .fail
      .lock()
      .unwrap()
      .extend(labels.iter().map(|s| s.to_string()));
    client
  }

  fn handle_for(&self, label: String) -> RemoteHandle {
    let failed = self.fail.lock().unwrap().contains(&label);
    self.recorder.record(label);
    RemoteHandle {
      pid: None,
      status: ExecStatus::Ok,
      success: !failed,
      stdout: String::new(),
      stderr: if failed { "boom".to_string() } else { String::new() },
    }
  }
}

fn mapping_label(target: &Target, mapping: &ActivationMapping) -> String {
  format!(
    "{}@{}@{}",
    mapping.key.service, mapping.key.container, target.name
  )
}

impl RemoteClient for FakeClient {
  async fn copy_closure(&self, target: &Target, closure: &str) -> RemoteHandle {
    self.handle_for(format!("copy_closure:{}:{}", target.name, closure))
  }

  async fn lock_component(&self, target: &Target, _profile: &str) -> RemoteHandle {
    self.handle_for(format!("lock:{}", target.name))
  }

  async fn unlock_component(&self, target: &Target, _profile: &str) -> RemoteHandle {
    self.handle_for(format!("unlock:{}", target.name))
  }

  async fn activate(&self, target: &Target, mapping: &ActivationMapping) -> RemoteHandle {
    self.handle_for(format!("activate:{}", mapping_label(target, mapping)))
  }

  async fn deactivate(&self, target: &Target, mapping: &ActivationMapping) -> RemoteHandle {
    self.handle_for(format!("deactivate:{}", mapping_label(target, mapping)))
  }

  async fn snapshot(&self, target: &Target, mapping: &manifest::SnapshotMapping) -> RemoteHandle {
    self.handle_for(format!("snapshot:{}:{}", target.name, mapping.key.component))
  }

  async fn retrieve_snapshots(
    &self,
    from_target: &Target,
    to_target: &Target,
    mapping: &manifest::SnapshotMapping,
  ) -> RemoteHandle {
    self.handle_for(format!(
      "retrieve:{}->{}:{}",
      from_target.name, to_target.name, mapping.key.component
    ))
  }

  async fn restore(&self, target: &Target, mapping: &manifest::SnapshotMapping) -> RemoteHandle {
    self.handle_for(format!("restore:{}:{}", target.name, mapping.key.component))
  }

  async fn delete_snapshots(
    &self,
    target: &Target,
    component: &str,
    container: &str,
    _keep: usize,
  ) -> RemoteHandle {
    self.handle_for(format!("gc:{}:{}:{}", target.name, component, container))
  }

  async fn lock_snapshots(&self, target: &Target, container: &str) -> RemoteHandle {
    self.handle_for(format!("lock_snapshots:{}:{}", target.name, container))
  }

  async fn unlock_snapshots(&self, target: &Target, container: &str) -> RemoteHandle {
    self.handle_for(format!("unlock_snapshots:{}:{}", target.name, container))
  }

  async fn set_profile(&self, target: &Target, profile: &str, _closure: &str) -> RemoteHandle {
    self.handle_for(format!("set_profile:{}:{}", target.name, profile))
  }
}

fn target(name: &str) -> Target {
  Target {
    name: name.to_string(),
    client_interface: "ssh".to_string(),
    containers: vec!["default".to_string()],
    concurrent_transfers: 4,
  }
}

fn key(service: &str, target: &str) -> ActivationKey {
  ActivationKey {
    service: service.to_string(),
    container: "default".to_string(),
    target: target.to_string(),
  }
}

fn activation(service: &str, target: &str, deps: &[(&str, &str)]) -> ActivationMapping {
  ActivationMapping {
    key: key(service, target),
    service_type: "process".to_string(),
    dependencies: deps.iter().map(|(s, t)| key(s, t)).collect(),
    arguments: HashMap::new(),
  }
}

fn targets_table(names: &[&str]) -> TargetsTable {
  names.iter().map(|n| (n.to_string(), target(n))).collect()
}

fn deploy_params<'a>(
  new_manifest: &'a Manifest,
  old_manifest: Option<&'a Manifest>,
  profile_dir: &'a std::path::Path,
  manifest_path: &'a std::path::Path,
  flags: DeployFlags,
) -> DeployParams<'a> {
  DeployParams {
    new_manifest,
    old_manifest,
    new_manifest_path: manifest_path,
    profile_name: "default",
    coordinator_profile_dir: profile_dir,
    max_concurrent_transfers: 4,
    keep: 1,
    flags,
    pre_hook: noop_hook(),
    post_hook: noop_hook(),
  }
}

/// S1: fresh deploy, `web` depends on `db`. `activate(db)` must complete
/// before `activate(web)` begins.
#[tokio::test]
async fn fresh_deploy_respects_dependency_order() {
  let client = FakeClient::default();
  let mut new_manifest = Manifest {
    targets: targets_table(&["host1", "host2"]),
    distribution: vec![
      DistributionItem {
        target: "host1".to_string(),
        closure: "/nix/store/db".to_string(),
      },
      DistributionItem {
        target: "host2".to_string(),
        closure: "/nix/store/web".to_string(),
      },
    ],
    activation: vec![
      activation("web", "host2", &[("db", "host1")]),
      activation("db", "host1", &[]),
    ],
    snapshots: vec![],
    profiles: ProfileMappingTable::default(),
  };
  new_manifest.validate().unwrap();

  let dir = tempfile::tempdir().unwrap();
  let manifest_path = dir.path().join("manifest.json");
  std::fs::write(&manifest_path, "{}").unwrap();

  let status = deploy(
    client.clone(),
    deploy_params(
      &new_manifest,
      None,
      dir.path(),
      &manifest_path,
      DeployFlags::default(),
    ),
  )
  .await;

  assert_eq!(status, DeployStatus::Ok);

  let db_idx = client.recorder.position_of("activate:db@default@host1").unwrap();
  let web_idx = client.recorder.position_of("activate:web@default@host2").unwrap();
  assert!(db_idx < web_idx, "db must activate before web");
  assert!(std::fs::symlink_metadata(dir.path().join("default")).is_ok());
}

/// S2: upgrade `{a,b,c}` → `{b,c,d}` with no dependencies. Only `a`
/// deactivates and only `d` activates.
#[tokio::test]
async fn upgrade_touches_only_the_diff() {
  let client = FakeClient::default();
  let targets = targets_table(&["host1"]);

  let old_manifest = Manifest {
    targets: targets.clone(),
    distribution: vec![],
    activation: vec![
      activation("a", "host1", &[]),
      activation("b", "host1", &[]),
      activation("c", "host1", &[]),
    ],
    snapshots: vec![],
    profiles: ProfileMappingTable::default(),
  };
  let new_manifest = Manifest {
    targets,
    distribution: vec![],
    activation: vec![
      activation("b", "host1", &[]),
      activation("c", "host1", &[]),
      activation("d", "host1", &[]),
    ],
    snapshots: vec![],
    profiles: ProfileMappingTable::default(),
  };

  let dir = tempfile::tempdir().unwrap();
  let manifest_path = dir.path().join("manifest.json");
  std::fs::write(&manifest_path, "{}").unwrap();

  let status = deploy(
    client.clone(),
    deploy_params(
      &new_manifest,
      Some(&old_manifest),
      dir.path(),
      &manifest_path,
      DeployFlags::default(),
    ),
  )
  .await;

  assert_eq!(status, DeployStatus::Ok);
  let calls = client.recorder.calls();
  assert!(calls.iter().any(|c| c == "deactivate:a@default@host1"));
  assert!(!calls.iter().any(|c| c.starts_with("deactivate:b")));
  assert!(!calls.iter().any(|c| c.starts_with("deactivate:c")));
  assert!(calls.iter().any(|c| c == "activate:d@default@host1"));
  assert!(!calls.iter().any(|c| c.starts_with("activate:b")));
  assert!(!calls.iter().any(|c| c.starts_with("activate:c")));
}

/// S3: `activate(c)` fails in `{a,b,c}` with `b→a, c→b`. Rollback
/// deactivates `b` then `a`; the deploy fails and no profile is published.
#[tokio::test]
async fn activation_failure_rolls_back_in_reverse_order() {
  let client = FakeClient::failing(&["activate:c@default@host1"]);
  let new_manifest = Manifest {
    targets: targets_table(&["host1"]),
    distribution: vec![],
    activation: vec![
      activation("a", "host1", &[]),
      activation("b", "host1", &[("a", "host1")]),
      activation("c", "host1", &[("b", "host1")]),
    ],
    snapshots: vec![],
    profiles: ProfileMappingTable::default(),
  };

  let dir = tempfile::tempdir().unwrap();
  let manifest_path = dir.path().join("manifest.json");
  std::fs::write(&manifest_path, "{}").unwrap();

  let status = deploy(
    client.clone(),
    deploy_params(
      &new_manifest,
      None,
      dir.path(),
      &manifest_path,
      DeployFlags::default(),
    ),
  )
  .await;

  assert_eq!(status, DeployStatus::Fail);

  let calls = client.recorder.calls();
  let deactivate_b = calls.iter().position(|c| c == "deactivate:b@default@host1");
  let deactivate_a = calls.iter().position(|c| c == "deactivate:a@default@host1");
  assert!(deactivate_b.is_some());
  assert!(deactivate_a.is_some());
  assert!(deactivate_b < deactivate_a, "b rolls back before a");
  assert!(!calls.iter().any(|c| c.starts_with("set_profile")));
  assert!(std::fs::symlink_metadata(dir.path().join("default")).is_err());
}

/// S5: `NO_LOCK` suppresses both lock dispatches entirely.
#[tokio::test]
async fn no_lock_flag_skips_lock_dispatch() {
  let client = FakeClient::default();
  let new_manifest = Manifest {
    targets: targets_table(&["host1"]),
    distribution: vec![DistributionItem {
      target: "host1".to_string(),
      closure: "/nix/store/a".to_string(),
    }],
    activation: vec![activation("a", "host1", &[])],
    snapshots: vec![],
    profiles: ProfileMappingTable::default(),
  };

  let dir = tempfile::tempdir().unwrap();
  let manifest_path = dir.path().join("manifest.json");
  std::fs::write(&manifest_path, "{}").unwrap();

  let flags = DeployFlags {
    no_lock: true,
    ..Default::default()
  };
  let status = deploy(
    client.clone(),
    deploy_params(&new_manifest, None, dir.path(), &manifest_path, flags),
  )
  .await;

  assert_eq!(status, DeployStatus::Ok);
  let calls = client.recorder.calls();
  assert!(!calls.iter().any(|c| c.starts_with("lock:")));
  assert!(!calls.iter().any(|c| c.starts_with("unlock:")));
}

/// Property 4: redeploying the already-active manifest with `NO_MIGRATION`
/// dispatches zero activate/deactivate calls.
#[tokio::test]
async fn idempotent_redeploy_dispatches_no_transitions() {
  let client = FakeClient::default();
  let manifest = Manifest {
    targets: targets_table(&["host1"]),
    distribution: vec![],
    activation: vec![activation("a", "host1", &[])],
    snapshots: vec![],
    profiles: ProfileMappingTable::default(),
  };

  let dir = tempfile::tempdir().unwrap();
  let manifest_path = dir.path().join("manifest.json");
  std::fs::write(&manifest_path, "{}").unwrap();

  let flags = DeployFlags {
    no_migration: true,
    ..Default::default()
  };
  let status = deploy(
    client.clone(),
    deploy_params(&manifest, Some(&manifest), dir.path(), &manifest_path, flags),
  )
  .await;

  assert_eq!(status, DeployStatus::Ok);
  let calls = client.recorder.calls();
  assert!(!calls.iter().any(|c| c.starts_with("activate:")));
  assert!(!calls.iter().any(|c| c.starts_with("deactivate:")));
}
