//! Remote execution primitive (§4.1, C2): runs operations against targets
//! as external processes, bounded by a per-target concurrency cap.

mod bounded;
mod client;
mod handle;
mod process;

pub use bounded::*;
pub use client::*;
pub use handle::*;
pub use process::*;

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use manifest::Target;

  use super::*;

  fn target(name: &str, cap: usize) -> Target {
    Target {
      name: name.to_string(),
      client_interface: "ssh".to_string(),
      containers: vec!["default".to_string()],
      concurrent_transfers: cap,
    }
  }

  #[derive(Clone)]
  struct CountingClient {
    in_flight: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    max_observed: std::sync::Arc<std::sync::atomic::AtomicUsize>,
  }

  impl RemoteClient for CountingClient {
    async fn copy_closure(&self, _target: &Target, _closure: &str) -> RemoteHandle {
      use std::sync::atomic::Ordering;
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_observed.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(std::time::Duration::from_millis(10)).await;
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      RemoteHandle {
        pid: None,
        status: ExecStatus::Ok,
        success: true,
        stdout: String::new(),
        stderr: String::new(),
      }
    }

    async fn lock_component(&self, _t: &Target, _p: &str) -> RemoteHandle {
      unimplemented!()
    }
    async fn unlock_component(&self, _t: &Target, _p: &str) -> RemoteHandle {
      unimplemented!()
    }
    async fn activate(
      &self,
      _t: &Target,
      _m: &manifest::ActivationMapping,
    ) -> RemoteHandle {
      unimplemented!()
    }
    async fn deactivate(
      &self,
      _t: &Target,
      _m: &manifest::ActivationMapping,
    ) -> RemoteHandle {
      unimplemented!()
    }
    async fn snapshot(
      &self,
      _t: &Target,
      _m: &manifest::SnapshotMapping,
    ) -> RemoteHandle {
      unimplemented!()
    }
    async fn retrieve_snapshots(
      &self,
      _f: &Target,
      _t: &Target,
      _m: &manifest::SnapshotMapping,
    ) -> RemoteHandle {
      unimplemented!()
    }
    async fn restore(
      &self,
      _t: &Target,
      _m: &manifest::SnapshotMapping,
    ) -> RemoteHandle {
      unimplemented!()
    }
    async fn delete_snapshots(
      &self,
      _t: &Target,
      _c: &str,
      _con: &str,
      _keep: usize,
    ) -> RemoteHandle {
      unimplemented!()
    }
    async fn lock_snapshots(&self, _t: &Target, _c: &str) -> RemoteHandle {
      unimplemented!()
    }
    async fn unlock_snapshots(&self, _t: &Target, _c: &str) -> RemoteHandle {
      unimplemented!()
    }
    async fn set_profile(&self, _t: &Target, _p: &str, _c: &str) -> RemoteHandle {
      unimplemented!()
    }
  }

  #[tokio::test]
  async fn bounds_concurrency_per_target() {
    let mut targets = HashMap::new();
    targets.insert("host1".to_string(), target("host1", 2));

    let client = CountingClient {
      in_flight: Default::default(),
      max_observed: Default::default(),
    };
    let executor = Executor::new(client.clone(), &targets).await;
    let host = targets.get("host1").unwrap();

    let futures = (0..6).map(|_| {
      executor.run(host, client.copy_closure(host, "/nix/store/x"))
    });
    futures_util::future::join_all(futures).await;

    assert_eq!(
      client.max_observed.load(std::sync::atomic::Ordering::SeqCst),
      2
    );
  }
}
