use std::future::Future;

use manifest::{ActivationMapping, SnapshotMapping, Target};

use crate::handle::RemoteHandle;

/// The collaborator contract from §6: a family of `exec_*` calls, each
/// taking a target and operation-specific arguments, each spawning one
/// remote process and resolving to its [`RemoteHandle`].
///
/// This trait is the abstract interface; the concrete transport (ssh,
/// disnix-client, or anything else) is an external collaborator. See
/// [`crate::process::ProcessRemoteClient`] for the process-spawning
/// implementation the engine ships with.
pub trait RemoteClient: Send + Sync {
  fn copy_closure(
    &self,
    target: &Target,
    closure: &str,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn lock_component(
    &self,
    target: &Target,
    profile: &str,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn unlock_component(
    &self,
    target: &Target,
    profile: &str,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn activate(
    &self,
    target: &Target,
    mapping: &ActivationMapping,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn deactivate(
    &self,
    target: &Target,
    mapping: &ActivationMapping,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn snapshot(
    &self,
    target: &Target,
    mapping: &SnapshotMapping,
  ) -> impl Future<Output = RemoteHandle> + Send;

  /// Transfers a snapshot generation of `mapping`'s component from
  /// `from_target` onto `to_target`.
  fn retrieve_snapshots(
    &self,
    from_target: &Target,
    to_target: &Target,
    mapping: &SnapshotMapping,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn restore(
    &self,
    target: &Target,
    mapping: &SnapshotMapping,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn delete_snapshots(
    &self,
    target: &Target,
    component: &str,
    container: &str,
    keep: usize,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn lock_snapshots(
    &self,
    target: &Target,
    container: &str,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn unlock_snapshots(
    &self,
    target: &Target,
    container: &str,
  ) -> impl Future<Output = RemoteHandle> + Send;

  fn set_profile(
    &self,
    target: &Target,
    profile: &str,
    closure: &str,
  ) -> impl Future<Output = RemoteHandle> + Send;
}
