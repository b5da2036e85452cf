use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;

pub const DEFAULT_VIEWER_QUEUE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerId(u64);

pub struct ViewerSubscription {
    pub id: ViewerId,
    pub frames: mpsc::Receiver<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame handed to this many viewers.
    Relayed(usize),
    /// Sender is no longer the active producer; frame dropped.
    Superseded,
}

#[derive(Default)]
struct Members {
    producer: Option<ProducerId>,
    viewers: HashMap<ViewerId, mpsc::Sender<Bytes>>,
}

/// Single-producer, many-viewer relay for binary video frames.
///
/// Frames are forwarded as-is. A viewer only sees frames relayed after it
/// attached; a viewer whose queue is closed or full is dropped.
pub struct VideoRelay {
    members: Mutex<Members>,
    next_id: AtomicU64,
    viewer_queue: usize,
}

impl VideoRelay {
    pub fn new(viewer_queue: usize) -> Self {
        Self {
            members: Mutex::new(Members::default()),
            next_id: AtomicU64::new(1),
            viewer_queue: viewer_queue.max(1),
        }
    }

    fn members(&self) -> std::sync::MutexGuard<'_, Members> {
        self.members.lock().expect("video relay lock poisoned")
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Takes over the producer slot. A previous producer is superseded but
    /// not closed; its later frames are ignored.
    pub fn attach_producer(&self) -> ProducerId {
        let id = ProducerId(self.next_id());
        let previous = self.members().producer.replace(id);
        match previous {
            Some(_) => log::info!("Video producer replaced"),
            None => log::info!("Video producer connected"),
        }
        id
    }

    /// Frees the slot if `id` still holds it.
    pub fn detach_producer(&self, id: ProducerId) {
        let mut members = self.members();
        if members.producer == Some(id) {
            members.producer = None;
            log::info!("Video producer disconnected");
        }
    }

    pub fn has_producer(&self) -> bool {
        self.members().producer.is_some()
    }

    pub fn attach_viewer(&self) -> ViewerSubscription {
        let id = ViewerId(self.next_id());
        let (tx, rx) = mpsc::channel(self.viewer_queue);
        let count = {
            let mut members = self.members();
            members.viewers.insert(id, tx);
            members.viewers.len()
        };
        log::info!("Video viewer attached ({} viewers)", count);
        ViewerSubscription { id, frames: rx }
    }

    pub fn detach_viewer(&self, id: ViewerId) {
        self.members().viewers.remove(&id);
    }

    pub fn viewer_count(&self) -> usize {
        self.members().viewers.len()
    }

    /// Relays a frame from `producer` to a copy of the current viewer set.
    pub fn frame_in(&self, producer: ProducerId, frame: Bytes) -> FrameOutcome {
        let viewers: Vec<(ViewerId, mpsc::Sender<Bytes>)> = {
            let members = self.members();
            if members.producer != Some(producer) {
                return FrameOutcome::Superseded;
            }
            members
                .viewers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut failed = Vec::new();
        for (id, tx) in &viewers {
            // Bytes clones share the buffer.
            if tx.try_send(frame.clone()).is_err() {
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            let mut members = self.members();
            for id in &failed {
                members.viewers.remove(id);
            }
            log::debug!("Dropped {} video viewers", failed.len());
        }

        FrameOutcome::Relayed(viewers.len() - failed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_reach_viewers_unmodified() {
        let relay = VideoRelay::new(4);
        let producer = relay.attach_producer();
        let mut a = relay.attach_viewer();
        let mut b = relay.attach_viewer();

        let frame = Bytes::from_static(&[0xff, 0xd8, 0x00, 0x01, 0xff, 0xd9]);
        assert_eq!(relay.frame_in(producer, frame.clone()), FrameOutcome::Relayed(2));

        assert_eq!(a.frames.try_recv().unwrap(), frame);
        assert_eq!(b.frames.try_recv().unwrap(), frame);
    }

    #[test]
    fn late_viewer_gets_no_backlog() {
        let relay = VideoRelay::new(4);
        let producer = relay.attach_producer();
        relay.frame_in(producer, Bytes::from_static(b"first"));

        let mut late = relay.attach_viewer();
        assert!(late.frames.try_recv().is_err());

        relay.frame_in(producer, Bytes::from_static(b"second"));
        assert_eq!(late.frames.try_recv().unwrap(), Bytes::from_static(b"second"));
        assert!(late.frames.try_recv().is_err());
    }

    #[test]
    fn replaced_producer_is_ignored() {
        let relay = VideoRelay::new(4);
        let old = relay.attach_producer();
        let mut viewer = relay.attach_viewer();
        relay.frame_in(old, Bytes::from_static(b"old-1"));

        let new = relay.attach_producer();
        assert_eq!(relay.frame_in(old, Bytes::from_static(b"old-2")), FrameOutcome::Superseded);
        relay.frame_in(new, Bytes::from_static(b"new-1"));

        assert_eq!(viewer.frames.try_recv().unwrap(), Bytes::from_static(b"old-1"));
        assert_eq!(viewer.frames.try_recv().unwrap(), Bytes::from_static(b"new-1"));
        assert!(viewer.frames.try_recv().is_err());
    }

    #[test]
    fn stale_detach_does_not_clear_new_producer() {
        let relay = VideoRelay::new(4);
        let old = relay.attach_producer();
        let new = relay.attach_producer();
        relay.detach_producer(old);
        assert!(relay.has_producer());
        relay.detach_producer(new);
        assert!(!relay.has_producer());
    }

    #[test]
    fn closed_or_slow_viewers_are_dropped() {
        let relay = VideoRelay::new(1);
        let producer = relay.attach_producer();
        let closed = relay.attach_viewer();
        let _slow = relay.attach_viewer();
        let mut fast = relay.attach_viewer();
        drop(closed);

        assert_eq!(relay.frame_in(producer, Bytes::from_static(b"1")), FrameOutcome::Relayed(2));
        assert_eq!(relay.viewer_count(), 2);
        fast.frames.try_recv().unwrap();

        assert_eq!(relay.frame_in(producer, Bytes::from_static(b"2")), FrameOutcome::Relayed(1));
        assert_eq!(relay.viewer_count(), 1);
        assert_eq!(fast.frames.try_recv().unwrap(), Bytes::from_static(b"2"));
    }

    #[test]
    fn detached_viewer_stops_receiving() {
        let relay = VideoRelay::new(4);
        let producer = relay.attach_producer();
        let mut viewer = relay.attach_viewer();
        relay.detach_viewer(viewer.id);
        assert_eq!(relay.frame_in(producer, Bytes::from_static(b"x")), FrameOutcome::Relayed(0));
        assert!(viewer.frames.try_recv().is_err());
    }
}
