//! Queue of hosts that entered maintenance.
//!
//! The host manager enqueues every host it starts draining. The consumer is
//! a separate drainer that moves tasks off those hosts and then reports the
//! hosts as drained.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::trace;

/// Errors from the maintenance queue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The batch does not fit; nothing was enqueued.
    #[error("maintenance queue full: capacity {capacity}, requested {requested}")]
    Full { capacity: usize, requested: usize },

    /// No host arrived before the timeout.
    #[error("timed out waiting for a host in maintenance")]
    Timeout,
}

/// Hand-off of hosts in maintenance to the drainer.
#[async_trait]
pub trait MaintenanceQueue: Send + Sync {
    /// Enqueue a batch of hostnames, all or nothing.
    async fn enqueue(&self, hostnames: &[String]) -> Result<(), QueueError>;

    /// Wait up to `timeout` for the next hostname.
    async fn dequeue(&self, timeout: Duration) -> Result<String, QueueError>;

    /// Next hostname if one is queued.
    async fn try_dequeue(&self) -> Option<String>;

    /// Number of queued hostnames.
    async fn len(&self) -> usize;
}

/// Bounded in-memory queue.
#[derive(Debug)]
pub struct InMemoryMaintenanceQueue {
    hosts: Mutex<VecDeque<String>>,
    capacity: usize,
    notify: Notify,
}

impl InMemoryMaintenanceQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            hosts: Mutex::new(VecDeque::new()),
            capacity,
            notify: Notify::new(),
        }
    }
}

#[async_trait]
impl MaintenanceQueue for InMemoryMaintenanceQueue {
    async fn enqueue(&self, hostnames: &[String]) -> Result<(), QueueError> {
        let mut hosts = self.hosts.lock().await;
        if hosts.len() + hostnames.len() > self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
                requested: hostnames.len(),
            });
        }

        hosts.extend(hostnames.iter().cloned());
        trace!(enqueued = hostnames.len(), depth = hosts.len(), "Hosts enqueued");
        drop(hosts);

        for _ in hostnames {
            self.notify.notify_one();
        }
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<String, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if let Some(hostname) = self.hosts.lock().await.pop_front() {
                return Ok(hostname);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(QueueError::Timeout);
            }
        }
    }

    async fn try_dequeue(&self) -> Option<String> {
        self.hosts.lock().await.pop_front()
    }

    async fn len(&self) -> usize {
        self.hosts.lock().await.len()
    }
}
