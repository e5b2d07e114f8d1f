//! # Dispatcher
//!
//! Fire-and-forget delivery on top of a [`Transport`].
//!
//! ## Design
//!
//! - One bounded `mpsc` queue and one worker task per peer, created on first use.
//! - `unicast`/`broadcast` never wait: a full queue drops the payload.
//! - Every send runs under `send_timeout`.
//! - Outcomes are counted in [`DeliveryStats`].
//! - `shutdown` closes the queues and waits for the workers to drain them.
//!
//! Per-peer queues are FIFO, so a leader always receives its unicast batch
//! before the cross-shard broadcast of the same tick.

use shared_types::Peer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::DeliverySnapshot;
use crate::ports::Transport;

type Payload = Arc<Vec<u8>>;

/// Dispatcher tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Per-peer queue depth.
    pub queue_capacity: usize,
    /// Deadline for one send.
    pub send_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            send_timeout: Duration::from_millis(2000),
        }
    }
}

/// Delivery counters, updated by workers without locking.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    unicasts: AtomicU64,
    broadcasts: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    dropped: AtomicU64,
}

impl DeliveryStats {
    /// Current values.
    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            unicasts: self.unicasts.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Per-peer queues in front of a transport.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    settings: DispatchSettings,
    stats: Arc<DeliveryStats>,
    queues: HashMap<String, mpsc::Sender<Payload>>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a dispatcher. Workers are spawned lazily, so this must be
    /// used from within a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, settings: DispatchSettings) -> Self {
        Self {
            transport,
            settings,
            stats: Arc::new(DeliveryStats::default()),
            queues: HashMap::new(),
            workers: Vec::new(),
        }
    }

    /// Queue `payload` for `peer` without waiting.
    pub fn unicast(&mut self, peer: &Peer, payload: Vec<u8>) {
        if self.enqueue(peer, Arc::new(payload)) {
            self.stats.unicasts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Queue the same `payload` for every peer without waiting.
    pub fn broadcast(&mut self, peers: &[Peer], payload: Vec<u8>) {
        self.stats.broadcasts.fetch_add(1, Ordering::Relaxed);
        let payload = Arc::new(payload);
        for peer in peers {
            self.enqueue(peer, payload.clone());
        }
    }

    /// Broadcast that waits for queue space instead of dropping.
    ///
    /// Used for the stop message, which must not be lost to a full queue.
    pub async fn broadcast_final(&mut self, peers: &[Peer], payload: Vec<u8>) {
        self.stats.broadcasts.fetch_add(1, Ordering::Relaxed);
        let payload = Arc::new(payload);
        for peer in peers {
            let queue = self.queue_for(peer).clone();
            if queue.send(payload.clone()).await.is_err() {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(peer = %peer, "Peer queue closed, stop message dropped");
            }
        }
    }

    /// Close every queue and wait until the workers have drained them.
    pub async fn shutdown(&mut self) -> DeliverySnapshot {
        self.queues.clear();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                warn!(error = %e, "Dispatch worker panicked");
            }
        }
        self.stats.snapshot()
    }

    fn enqueue(&mut self, peer: &Peer, payload: Payload) -> bool {
        match self.queue_for(peer).try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(peer = %peer, "Peer queue full, payload dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(peer = %peer, "Peer queue closed, payload dropped");
                false
            }
        }
    }

    fn queue_for(&mut self, peer: &Peer) -> &mpsc::Sender<Payload> {
        let endpoint = peer.endpoint();
        if !self.queues.contains_key(&endpoint) {
            let (tx, rx) = mpsc::channel(self.settings.queue_capacity.max(1));
            let worker = tokio::spawn(run_worker(
                peer.clone(),
                rx,
                self.transport.clone(),
                self.settings.send_timeout,
                self.stats.clone(),
            ));
            self.workers.push(worker);
            self.queues.insert(endpoint.clone(), tx);
        }
        &self.queues[&endpoint]
    }
}

async fn run_worker(
    peer: Peer,
    mut rx: mpsc::Receiver<Payload>,
    transport: Arc<dyn Transport>,
    send_timeout: Duration,
    stats: Arc<DeliveryStats>,
) {
    while let Some(payload) = rx.recv().await {
        match tokio::time::timeout(send_timeout, transport.send(&peer, &payload)).await {
            Ok(Ok(())) => {
                stats.sent.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                debug!(peer = %peer, error = %e, "Send failed");
            }
            Err(_) => {
                stats.timed_out.fetch_add(1, Ordering::Relaxed);
                debug!(peer = %peer, timeout_ms = send_timeout.as_millis() as u64, "Send timed out");
            }
        }
    }
}
