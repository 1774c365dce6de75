//! Record change notifications
//!
//! Views register a [`Listener`] per [`EventKind`] when they become active and
//! remove it when they go away. Whatever code mutates the history emits a
//! [`RecordEvent`] afterwards; it never needs a handle on the views.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::events::{EventKind, RecordEvent};

/// Callback invoked synchronously on emission. Identity is the `Arc` pointer:
/// clone the same `Listener` to register and later remove it.
pub type Listener = Arc<dyn Fn(&RecordEvent) + Send + Sync>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&RecordEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
    event_tx: broadcast::Sender<RecordEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            listeners: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Register `listener` for `kind`. Returns `false` if that exact listener
    /// was already registered for it.
    pub fn on(&self, kind: EventKind, listener: &Listener) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let registered = listeners.entry(kind).or_default();

        if registered.iter().any(|l| Arc::ptr_eq(l, listener)) {
            return false;
        }

        registered.push(listener.clone());
        tracing::debug!("Listener registered for {} ({} total)", kind, registered.len());
        true
    }

    /// Remove `listener` from `kind`. Returns `false` if it was not registered.
    pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };

        let before = registered.len();
        registered.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = registered.len() != before;

        if registered.is_empty() {
            listeners.remove(&kind);
        }

        if removed {
            tracing::debug!("Listener removed for {}", kind);
        }
        removed
    }

    /// Deliver `event` to every listener registered for its kind and to async
    /// subscribers. A panicking listener is logged and skipped; the rest still
    /// run. Returns how many listeners completed.
    pub fn emit(&self, event: RecordEvent) -> usize {
        let kind = event.kind();

        // Snapshot so listeners may call on/off while we dispatch
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for listener in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| (**listener)(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        "Listener for {} panicked: {}",
                        kind,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        tracing::debug!(
            "Emitted {} to {}/{} listeners",
            kind,
            delivered,
            snapshot.len()
        );

        // No subscribers is fine
        let _ = self.event_tx.send(event);

        delivered
    }

    /// Receive every emitted event asynchronously
    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.event_tx.subscribe()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration that lasts as long as the value does, the way a view
/// subscribes on activation and unsubscribes on deactivation
pub struct Subscription {
    bus: Arc<EventBus>,
    kinds: Vec<EventKind>,
    listener: Listener,
}

impl Subscription {
    pub fn new(bus: Arc<EventBus>, kinds: &[EventKind], listener: Listener) -> Self {
        for kind in kinds {
            bus.on(*kind, &listener);
        }

        Self {
            bus,
            kinds: kinds.to_vec(),
            listener,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for kind in &self.kinds {
            self.bus.off(*kind, &self.listener);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use habitimer_core::models::TimerRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting_listener() -> (Listener, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let l = listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (l, count)
    }

    fn sample_record() -> TimerRecord {
        let start = Utc::now();
        TimerRecord::new(start, start + Duration::minutes(5)).unwrap()
    }

    #[test]
    fn test_emit_without_listeners() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(RecordEvent::added(sample_record())), 0);
        assert_eq!(bus.listener_count(EventKind::RecordAdded), 0);
    }

    #[test]
    fn test_duplicate_registration_delivers_once() {
        let bus = EventBus::new();
        let (l, count) = counting_listener();

        assert!(bus.on(EventKind::RecordAdded, &l));
        assert!(!bus.on(EventKind::RecordAdded, &l));
        assert_eq!(bus.listener_count(EventKind::RecordAdded), 1);

        bus.emit(RecordEvent::added(sample_record()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_closures_are_distinct_listeners() {
        let bus = EventBus::new();
        let (a, count_a) = counting_listener();
        let (b, count_b) = counting_listener();

        bus.on(EventKind::AllRecordsCleared, &a);
        bus.on(EventKind::AllRecordsCleared, &b);

        assert_eq!(bus.emit(RecordEvent::AllRecordsCleared), 2);
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_stops_delivery() {
        let bus = EventBus::new();
        let (l, count) = counting_listener();

        bus.on(EventKind::RecordDeleted, &l);
        assert!(bus.off(EventKind::RecordDeleted, &l));
        assert!(!bus.off(EventKind::RecordDeleted, &l));
        assert!(!bus.off(EventKind::RecordUpdated, &l));

        bus.emit(RecordEvent::deleted("r1".to_string()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(EventKind::RecordDeleted), 0);
    }

    #[test]
    fn test_kinds_are_independent() {
        let bus = EventBus::new();
        let (l, count) = counting_listener();

        bus.on(EventKind::RecordAdded, &l);
        bus.emit(RecordEvent::deleted("r1".to_string()));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.emit(RecordEvent::added(sample_record()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_payload_passed_through() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let l = listener(move |event| sink.lock().unwrap().push(event.clone()));

        bus.on(EventKind::RecordUpdated, &l);
        let record = sample_record();
        bus.emit(RecordEvent::updated(record.clone()));

        assert_eq!(*seen.lock().unwrap(), vec![RecordEvent::updated(record)]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let failing = listener(|_| panic!("view went away"));
        let (l, count) = counting_listener();

        bus.on(EventKind::AllRecordsCleared, &failing);
        bus.on(EventKind::AllRecordsCleared, &l);

        assert_eq!(bus.emit(RecordEvent::AllRecordsCleared), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Still registered; the bus never evicts
        assert_eq!(bus.listener_count(EventKind::AllRecordsCleared), 2);
    }

    #[test]
    fn test_listener_can_unregister_itself() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));

        let l = {
            let bus = bus.clone();
            let count = count.clone();
            let slot = slot.clone();
            listener(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot.lock().unwrap().take() {
                    bus.off(EventKind::RecordAdded, &me);
                }
            })
        };
        *slot.lock().unwrap() = Some(l.clone());

        bus.on(EventKind::RecordAdded, &l);
        bus.emit(RecordEvent::added(sample_record()));
        bus.emit(RecordEvent::added(sample_record()));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_unregisters_on_drop() {
        let bus = Arc::new(EventBus::new());
        let (l, count) = counting_listener();

        {
            let _subscription = Subscription::new(bus.clone(), &EventKind::ALL, l);
            assert_eq!(bus.listener_count(EventKind::RecordDeleted), 1);
            bus.emit(RecordEvent::AllRecordsCleared);
        }

        for kind in EventKind::ALL {
            assert_eq!(bus.listener_count(kind), 0);
        }
        bus.emit(RecordEvent::AllRecordsCleared);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_subscriber_receives_events() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(RecordEvent::AllRecordsCleared);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, RecordEvent::AllRecordsCleared);
    }
}
