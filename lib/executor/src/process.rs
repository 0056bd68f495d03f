use manifest::{ActivationMapping, SnapshotMapping, Target};

use crate::{client::RemoteClient, handle::RemoteHandle};

/// Default [`RemoteClient`]: reaches every target by spawning a transport
/// command (`ssh`, by default) wrapping a `disnix-*` remote tool, mirroring
/// how each `exec_*` call in the original tool shells out to its own
/// small helper binary per target.
///
/// `transport_prefix` is the argv prepended to every call, e.g.
/// `["ssh", "-o", "BatchMode=yes"]`; the target's name is appended as the
/// transport's destination argument.
#[derive(Debug, Clone)]
pub struct ProcessRemoteClient {
  transport_prefix: Vec<String>,
}

impl ProcessRemoteClient {
  pub fn new(transport_prefix: Vec<String>) -> Self {
    Self { transport_prefix }
  }

  fn argv(&self, target: &Target, remote_argv: Vec<String>) -> Vec<String> {
    let mut argv = self.transport_prefix.clone();
    argv.push(target.name.clone());
    argv.extend(remote_argv);
    argv
  }

  async fn dispatch(&self, target: &Target, remote_argv: Vec<String>) -> RemoteHandle {
    let argv = self.argv(target, remote_argv);
    tracing::debug!(target_name = %target.name, argv = ?argv, "dispatching remote operation");
    RemoteHandle::from_command_output(command::run_command(&argv, None).await)
  }
}

impl RemoteClient for ProcessRemoteClient {
  async fn copy_closure(&self, target: &Target, closure: &str) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec!["disnix-copy-closure".into(), closure.to_string()],
      )
      .await
  }

  async fn lock_component(&self, target: &Target, profile: &str) -> RemoteHandle {
    self
      .dispatch(target, vec!["disnix-lock".into(), profile.to_string()])
      .await
  }

  async fn unlock_component(&self, target: &Target, profile: &str) -> RemoteHandle {
    self
      .dispatch(target, vec!["disnix-unlock".into(), profile.to_string()])
      .await
  }

  async fn activate(&self, target: &Target, mapping: &ActivationMapping) -> RemoteHandle {
    let mut argv = vec![
      "disnix-activate".into(),
      "--type".to_string(),
      mapping.service_type.clone(),
      "--container".to_string(),
      mapping.key.container.clone(),
      mapping.key.service.clone(),
    ];
    for (name, value) in &mapping.arguments {
      argv.push("--arg".into());
      argv.push(format!("{name}={value}"));
    }
    self.dispatch(target, argv).await
  }

  async fn deactivate(&self, target: &Target, mapping: &ActivationMapping) -> RemoteHandle {
    let mut argv = vec![
      "disnix-deactivate".into(),
      "--type".to_string(),
      mapping.service_type.clone(),
      "--container".to_string(),
      mapping.key.container.clone(),
      mapping.key.service.clone(),
    ];
    for (name, value) in &mapping.arguments {
      argv.push("--arg".into());
      argv.push(format!("{name}={value}"));
    }
    self.dispatch(target, argv).await
  }

  async fn snapshot(&self, target: &Target, mapping: &SnapshotMapping) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec![
          "disnix-snapshot".into(),
          "--type".to_string(),
          mapping.service_type.clone(),
          "--container".to_string(),
          mapping.key.container.clone(),
          mapping.service.clone(),
        ],
      )
      .await
  }

  async fn retrieve_snapshots(
    &self,
    from_target: &Target,
    to_target: &Target,
    mapping: &SnapshotMapping,
  ) -> RemoteHandle {
    self
      .dispatch(
        to_target,
        vec![
          "disnix-retrieve-snapshots".into(),
          "--from".to_string(),
          from_target.name.clone(),
          "--container".to_string(),
          mapping.key.container.clone(),
          mapping.key.component.clone(),
        ],
      )
      .await
  }

  async fn restore(&self, target: &Target, mapping: &SnapshotMapping) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec![
          "disnix-restore".into(),
          "--type".to_string(),
          mapping.service_type.clone(),
          "--container".to_string(),
          mapping.key.container.clone(),
          mapping.service.clone(),
        ],
      )
      .await
  }

  async fn delete_snapshots(
    &self,
    target: &Target,
    component: &str,
    container: &str,
    keep: usize,
  ) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec![
          "disnix-delete-snapshots".into(),
          "--container".to_string(),
          container.to_string(),
          "--keep".to_string(),
          keep.to_string(),
          component.to_string(),
        ],
      )
      .await
  }

  async fn lock_snapshots(&self, target: &Target, container: &str) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec!["disnix-lock-snapshots".into(), container.to_string()],
      )
      .await
  }

  async fn unlock_snapshots(&self, target: &Target, container: &str) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec!["disnix-unlock-snapshots".into(), container.to_string()],
      )
      .await
  }

  async fn set_profile(&self, target: &Target, profile: &str, closure: &str) -> RemoteHandle {
    self
      .dispatch(
        target,
        vec![
          "disnix-set-profile".into(),
          profile.to_string(),
          closure.to_string(),
        ],
      )
      .await
  }
}
