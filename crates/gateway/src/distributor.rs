//! Subscriber distribution fabric: holds the live subscriber set and fans a
//! published event out to every subscriber whose filter matches it
//! (spec.md §4.9). Transport-agnostic — a subscriber is just a channel that
//! can carry one UTF-8 text frame per send, so this can be exercised without
//! a real WebSocket (see the `tests/` integration suite).

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

use sa_domain::event::CommunicationEvent;
use sa_domain::filter::FilterCriteria;

/// Bound on a subscriber's outbound queue. A subscriber that can't keep up
/// (queue full) is treated the same as a broken connection: evicted on the
/// next publish.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Returned by `subscribe`, used to `unsubscribe` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberHandle(u64);

struct Subscriber {
    id: u64,
    sink: mpsc::Sender<String>,
    filter: FilterCriteria,
}

#[derive(Debug, Serialize)]
struct WelcomeFilters<'a> {
    conversation_id: &'a Option<String>,
    workforce: &'a Option<String>,
}

#[derive(Debug, Serialize)]
struct WelcomeFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'static str,
    filters: WelcomeFilters<'a>,
}

/// A subscriber's outbound channel is created by the caller; this struct
/// only ever sees the sending half, so it never reads client frames.
pub struct Distributor {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Default for Distributor {
    fn default() -> Self {
        Self::new()
    }
}

impl Distributor {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a bounded channel sized for one subscriber's outbound queue.
    pub fn make_sink() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY)
    }

    /// Registers a subscriber and sends its welcome frame. Returns `Err` if
    /// the welcome frame fails to serialize — the caller should close the
    /// connection with code 4500 in that case and never register it
    /// (spec.md §4.10).
    pub fn subscribe(&self, sink: mpsc::Sender<String>, filter: FilterCriteria) -> Result<SubscriberHandle, ()> {
        let welcome = WelcomeFrame {
            kind: "connection_established",
            message: "Connected to observability dashboard",
            filters: WelcomeFilters {
                conversation_id: &filter.conversation_id,
                workforce: &filter.workforce,
            },
        };
        let welcome_text = serde_json::to_string(&welcome).map_err(|_| ())?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = sink.try_send(welcome_text);

        self.subscribers.write().push(Subscriber { id, sink, filter: filter.clone() });

        tracing::info!(
            filter = %filter.describe(),
            total_connections = self.count(),
            "subscriber connected"
        );

        Ok(SubscriberHandle(id))
    }

    /// Idempotent: unsubscribing an already-removed handle is a no-op.
    pub fn unsubscribe(&self, handle: SubscriberHandle) {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|s| s.id != handle.0);
        if subs.len() < before {
            tracing::info!(remaining = subs.len(), "subscriber disconnected");
        }
    }

    /// Serializes the event exactly once, then delivers it to every
    /// subscriber whose filter matches. Subscribers whose send fails are
    /// evicted after the iteration, under a single deferred write-lock pass
    /// — additions and removals during the iteration are tolerated because
    /// it runs over a read-locked snapshot (spec.md §5).
    pub fn publish(&self, event: &CommunicationEvent) {
        let Ok(payload) = serde_json::to_string(&event.to_dict()) else {
            tracing::warn!("failed to serialize event for publish, dropping");
            return;
        };

        let mut dead = Vec::new();
        {
            let subs = self.subscribers.read();
            if subs.is_empty() {
                return;
            }
            for sub in subs.iter() {
                if !sub.filter.matches(event) {
                    continue;
                }
                if sub.sink.try_send(payload.clone()).is_err() {
                    dead.push(sub.id);
                }
            }
        }

        if !dead.is_empty() {
            let mut subs = self.subscribers.write();
            subs.retain(|s| !dead.contains(&s.id));
            tracing::info!(evicted = dead.len(), remaining = subs.len(), "evicted broken subscribers");
        }
    }

    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }
}
