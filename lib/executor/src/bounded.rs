use std::{future::Future, sync::Arc};

use cache::CloneCache;
use manifest::{Target, TargetsTable};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{client::RemoteClient, handle::RemoteHandle};

/// Wraps a [`RemoteClient`] with per-target bounded concurrency (§4.1,
/// §5.2): every call is gated on a semaphore sized from that target's
/// `concurrent_transfers`, so no more than that many operations are ever
/// in flight against the same host at once.
///
/// Targets are immutable for the lifetime of a deployment (§3), so the
/// semaphore table is built once at construction and never grows; lookups
/// after that are infallible.
pub struct Executor<C> {
  pub client: C,
  semaphores: CloneCache<String, Arc<Semaphore>>,
}

impl<C: RemoteClient> Executor<C> {
  pub async fn new(client: C, targets: &TargetsTable) -> Self {
    let semaphores = CloneCache::default();
    for target in targets.values() {
      semaphores
        .insert(
          target.name.clone(),
          Arc::new(Semaphore::new(target.concurrent_transfers.max(1))),
        )
        .await;
    }
    Self { client, semaphores }
  }

  async fn acquire(&self, target: &Target) -> OwnedSemaphorePermit {
    let semaphore = self
      .semaphores
      .get(&target.name)
      .await
      .expect("executor was constructed with this target's table");
    semaphore
      .acquire_owned()
      .await
      .expect("semaphore is never closed")
  }

  /// Runs `op` against `target`, suspending until a concurrency slot is
  /// free. `op` is typically a call into `self.client`.
  pub async fn run<Fut>(&self, target: &Target, op: Fut) -> RemoteHandle
  where
    Fut: Future<Output = RemoteHandle>,
  {
    let _permit = self.acquire(target).await;
    op.await
  }
}
