use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::Message;

use super::frame::OutboundFrame;
use super::FrameSink;

pub type SubscriberId = u64;

struct Subscriber {
    peer: SocketAddr,
    tx: mpsc::Sender<Message>,
    connected_at: DateTime<Utc>,
}

/// Outcome of one fan-out pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Queue full; frame dropped for that subscriber only.
    pub skipped: usize,
    /// Connection gone; removed from the registry.
    pub removed: usize,
}

/// Concurrency-safe set of live subscribers.
///
/// Each subscriber owns a bounded outbound queue drained by its connection
/// task. Broadcasting never awaits: it snapshots the senders, releases the
/// lock and uses `try_send`.
#[derive(Clone)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
    next_id: Arc<AtomicU64>,
    queue_depth: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Add a subscriber and hand back the receiving end of its queue.
    pub fn register(&self, peer: SocketAddr) -> (SubscriberId, mpsc::Receiver<Message>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.subscribers.write().insert(
            id,
            Subscriber {
                peer,
                tx,
                connected_at: Utc::now(),
            },
        );
        (id, rx)
    }

    pub fn unregister(&self, id: SubscriberId) -> bool {
        match self.subscribers.write().remove(&id) {
            Some(sub) => {
                let secs = (Utc::now() - sub.connected_at).num_seconds();
                log::debug!("Subscriber {} ({}) removed after {}s", id, sub.peer, secs);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Send the same message to every subscriber registered at call time.
    pub fn broadcast(&self, message: Message) -> BroadcastReport {
        let snapshot: Vec<(SubscriberId, SocketAddr, mpsc::Sender<Message>)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, sub)| (*id, sub.peer, sub.tx.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        for (id, peer, tx) in snapshot {
            match tx.try_send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::debug!("Subscriber {} ({}) is behind, skipping frame", id, peer);
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            if self.unregister(id) {
                report.removed += 1;
            }
        }
        report
    }
}

impl FrameSink for SubscriberRegistry {
    fn publish(&self, frame: &OutboundFrame) {
        match frame.to_json() {
            Ok(json) => {
                let report = self.broadcast(Message::text(json));
                if report.removed > 0 {
                    log::info!("Removed {} closed subscriber(s)", report.removed);
                }
                log::trace!(
                    "Frame delivered to {} subscriber(s), {} skipped",
                    report.delivered,
                    report.skipped
                );
            }
            Err(e) => log::error!("Failed to serialize frame: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    fn text(s: &str) -> Message {
        Message::text(s.to_string())
    }

    #[test]
    fn broadcast_reaches_every_subscriber() {
        let registry = SubscriberRegistry::new(4);
        let (_, mut a) = registry.register(peer());
        let (_, mut b) = registry.register(peer());

        let report = registry.broadcast(text("frame"));
        assert_eq!(report.delivered, 2);
        assert_eq!(a.try_recv().unwrap(), text("frame"));
        assert_eq!(b.try_recv().unwrap(), text("frame"));
    }

    #[test]
    fn full_queue_skips_only_that_subscriber() {
        let registry = SubscriberRegistry::new(1);
        let (_, _slow) = registry.register(peer());
        let (_, mut fast) = registry.register(peer());

        registry.broadcast(text("one"));
        assert_eq!(fast.try_recv().unwrap(), text("one"));

        let report = registry.broadcast(text("two"));
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                skipped: 1,
                removed: 0
            }
        );
        assert_eq!(fast.try_recv().unwrap(), text("two"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn closed_subscriber_is_removed() {
        let registry = SubscriberRegistry::new(4);
        let (_, gone) = registry.register(peer());
        let (_, mut alive) = registry.register(peer());
        drop(gone);

        let report = registry.broadcast(text("x"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(alive.try_recv().unwrap(), text("x"));
    }

    #[test]
    fn late_registration_misses_earlier_frames() {
        let registry = SubscriberRegistry::new(4);
        registry.broadcast(text("early"));
        let (_, mut rx) = registry.register(peer());
        registry.broadcast(text("late"));
        assert_eq!(rx.try_recv().unwrap(), text("late"));
        assert!(rx.try_recv().is_err());
    }

    fn frame_numbers(rx: &mut mpsc::Receiver<Message>) -> Vec<u64> {
        let mut seen = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            seen.push(msg.to_text().unwrap().parse().unwrap());
        }
        seen
    }

    #[test]
    fn churn_during_broadcast_never_duplicates_or_drops() {
        const FRAMES: u64 = 2000;
        const CHURNERS: usize = 4;

        let registry = SubscriberRegistry::new(FRAMES as usize + 1);
        let (steady_id, mut steady) = registry.register(peer());
        // Number of broadcasts that have fully returned.
        let completed = AtomicU64::new(0);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for n in 0..FRAMES {
                    let report = registry.broadcast(text(&n.to_string()));
                    assert_eq!(report.skipped, 0);
                    completed.store(n + 1, Ordering::SeqCst);
                }
            });

            for _ in 0..CHURNERS {
                scope.spawn(|| {
                    while completed.load(Ordering::SeqCst) < FRAMES {
                        let (id, mut rx) = registry.register(peer());
                        let before = completed.load(Ordering::SeqCst);
                        for _ in 0..50 {
                            std::thread::yield_now();
                        }
                        let after = completed.load(Ordering::SeqCst);
                        assert!(registry.unregister(id));

                        let seen = frame_numbers(&mut rx);
                        // Consecutive frames, each delivered once.
                        assert!(seen.windows(2).all(|w| w[1] == w[0] + 1), "{:?}", seen);
                        // Every broadcast that started after registering and
                        // finished before unregistering was received.
                        for n in before + 1..after {
                            assert!(seen.contains(&n), "frame {} missing from {:?}", n, seen);
                        }
                    }
                });
            }
        });

        let seen = frame_numbers(&mut steady);
        assert_eq!(seen, (0..FRAMES).collect::<Vec<_>>());
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(steady_id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = SubscriberRegistry::new(4);
        let (id, _rx) = registry.register(peer());
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert_eq!(registry.len(), 0);
    }
}
