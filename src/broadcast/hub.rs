use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::presence::{Domain, LivenessMonitor, PresenceStore};

use super::events::DashboardEvent;

pub const DEFAULT_OBSERVER_QUEUE: usize = 256;

/// Serialized JSON message, shared by every observer it is delivered to.
pub type Outbound = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receiving end handed to a newly subscribed observer. The first queued
/// message is always the snapshot. The channel closes when the hub drops
/// the observer.
pub struct Subscription {
    pub id: ObserverId,
    pub messages: mpsc::Receiver<Outbound>,
}

/// Fans dashboard events out to every subscribed observer.
///
/// Each observer gets a bounded queue. A closed or full queue counts as a
/// failed send: the observer is removed after the pass and never sees
/// another message. Publishing never waits on an observer.
pub struct BroadcastHub {
    store: Arc<PresenceStore>,
    liveness: LivenessMonitor,
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<Outbound>>>,
    // Serializes prune-then-deliver passes so per-unit order matches publish order.
    publish_gate: Mutex<()>,
    next_id: AtomicU64,
    queue_depth: usize,
}

impl BroadcastHub {
    pub fn new(store: Arc<PresenceStore>, liveness: LivenessMonitor, queue_depth: usize) -> Self {
        Self {
            store,
            liveness,
            observers: Mutex::new(HashMap::new()),
            publish_gate: Mutex::new(()),
            next_id: AtomicU64::new(1),
            queue_depth: queue_depth.max(1),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().expect("observer set lock poisoned").len()
    }

    /// Adds an observer whose queue starts with a snapshot of both domains.
    ///
    /// Staleness found while taking the snapshot is published to the
    /// existing observers first, so the snapshot never shows a unit as live
    /// that the others already know went offline.
    pub fn subscribe(&self) -> Subscription {
        let _gate = self.publish_gate.lock().expect("publish gate poisoned");

        let stale = self.prune_events();
        if !stale.is_empty() {
            self.deliver(&stale);
        }

        let drones = self.store.snapshot_all(Domain::Aerial);
        let officers = self.store.snapshot_all(Domain::Personnel);
        let (tx, rx) = mpsc::channel(self.queue_depth);
        if let Some(snapshot) = encode(&DashboardEvent::snapshot(&drones, &officers)) {
            // Fresh queue with capacity >= 1 cannot be full.
            let _ = tx.try_send(snapshot);
        }

        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let count = {
            let mut observers = self.observers.lock().expect("observer set lock poisoned");
            observers.insert(id, tx);
            observers.len()
        };
        log::info!(
            "Dashboard {} subscribed ({} drones, {} officers, {} observers)",
            id,
            drones.len(),
            officers.len(),
            count
        );

        Subscription { id, messages: rx }
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        let removed = self
            .observers
            .lock()
            .expect("observer set lock poisoned")
            .remove(&id)
            .is_some();
        if removed {
            log::info!("Dashboard {} unsubscribed", id);
        }
    }

    /// Prunes stale units, then delivers their status events followed by
    /// `event` to every observer. Returns how many observers got `event`.
    ///
    /// A unit that is offline in the store once pruning is done is never
    /// announced live by `event`.
    pub fn publish(&self, mut event: DashboardEvent) -> usize {
        let _gate = self.publish_gate.lock().expect("publish gate poisoned");

        let mut batch = self.prune_events();
        event.sync_liveness(&self.store);
        if let Some(payload) = encode(&event) {
            batch.push(payload);
        }
        let delivered = self.deliver(&batch);
        log::debug!(
            "Published event for {} to {} observers",
            event.unit_id().unwrap_or("all units"),
            delivered
        );
        delivered
    }

    fn prune_events(&self) -> Vec<Outbound> {
        self.liveness
            .prune_all(&self.store, Utc::now())
            .iter()
            .filter_map(|change| encode(&DashboardEvent::went_stale(change)))
            .collect()
    }

    /// Sends `batch` in order to a copy of the observer set, then removes
    /// the observers whose queue rejected a message.
    fn deliver(&self, batch: &[Outbound]) -> usize {
        let targets: Vec<(ObserverId, mpsc::Sender<Outbound>)> = self
            .observers
            .lock()
            .expect("observer set lock poisoned")
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut failed = Vec::new();
        for (id, tx) in &targets {
            if batch.iter().any(|msg| tx.try_send(msg.clone()).is_err()) {
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            let mut observers = self.observers.lock().expect("observer set lock poisoned");
            for id in &failed {
                if observers.remove(id).is_some() {
                    log::warn!("Dropping dashboard {}: send failed", id);
                }
            }
        }

        targets.len() - failed.len()
    }
}

fn encode(event: &DashboardEvent) -> Option<Outbound> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            log::error!("Failed to serialize dashboard event: {}", e);
            None
        }
    }
}
