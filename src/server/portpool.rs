//! The Port Pool (spec.md §3/§5): a bounded FIFO of passive-mode port
//! numbers, leased per-PASV and returned on transfer teardown, following
//! `slftpd/config.py`'s `asyncio.Queue`-backed `Config.ports` — re-expressed
//! with `tokio::sync::Mutex<VecDeque<u16>>` plus a `Notify` since `tokio`
//! has no bounded-queue-with-timed-pop primitive as convenient as asyncio's
//! `Queue.get()` + `wait_for`.

use std::collections::VecDeque;
use std::ops::Range;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

/// Bounded FIFO of passive ports. `lease` blocks up to 1s (spec.md §3/§4.4);
/// `return_port` never blocks and is safe to call from a task that is
/// racing session teardown against a just-in-time connection (spec.md §5).
#[derive(Debug)]
pub struct PortPool {
    ports: Mutex<VecDeque<u16>>,
    notify: Notify,
}

impl PortPool {
    pub fn new(range: Range<u16>) -> Self {
        PortPool {
            ports: Mutex::new(range.collect()),
            notify: Notify::new(),
        }
    }

    /// Leases a port, waiting up to 1 second for one to free up (spec.md
    /// §4.4: "If no lease is available within 1 s, reply `500`").
    pub async fn lease(&self) -> Option<u16> {
        tokio::time::timeout(Duration::from_secs(1), self.lease_forever()).await.ok()
    }

    async fn lease_forever(&self) -> u16 {
        loop {
            {
                let mut ports = self.ports.lock().await;
                if let Some(port) = ports.pop_front() {
                    return port;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Returns a previously-leased port to the pool. Idempotent-safe in the
    /// sense that returning an already-present port merely duplicates it in
    /// the FIFO rather than corrupting state — callers are responsible for
    /// the "exactly once" half of the invariant (spec.md §3).
    pub async fn return_port(&self, port: u16) {
        self.ports.lock().await.push_back(port);
        self.notify.notify_one();
    }

    #[cfg(test)]
    pub async fn size(&self) -> usize {
        self.ports.lock().await.len()
    }
}
