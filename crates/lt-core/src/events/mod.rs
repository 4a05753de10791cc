//! Topic-keyed event bus

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

/// Identifies one registered callback so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Topic-keyed publish/subscribe bus.
///
/// Callbacks may subscribe or unsubscribe from inside a dispatch: the
/// callback list is snapshotted per publish and membership is re-checked
/// before every invocation, so a callback removed mid-dispatch is skipped.
pub struct EventBus<E> {
    topics: Mutex<AHashMap<String, Vec<(SubscriptionId, Callback<E>)>>>,
    next_id: AtomicU64,
}

impl<E> EventBus<E> {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(AHashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a callback for a topic
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.topics
            .lock()
            .entry(topic.into())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a previously registered callback
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.lock();
        for subscribers in topics.values_mut() {
            if let Some(pos) = subscribers.iter().position(|(sid, _)| *sid == id) {
                subscribers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Publish an event to every live subscriber of a topic
    pub fn publish(&self, topic: &str, event: &E) {
        let snapshot: Vec<(SubscriptionId, Callback<E>)> = {
            let topics = self.topics.lock();
            match topics.get(topic) {
                Some(subscribers) => subscribers.clone(),
                None => return,
            }
        };

        for (id, callback) in snapshot {
            // The lock is not held while the callback runs, so callbacks
            // are free to subscribe or unsubscribe.
            let still_registered = {
                let topics = self.topics.lock();
                topics
                    .get(topic)
                    .map_or(false, |subs| subs.iter().any(|(sid, _)| *sid == id))
            };
            if still_registered {
                callback(event);
            }
        }
    }

    /// Number of callbacks currently registered for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, Vec::len)
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus: EventBus<String> = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            bus.subscribe("change", move |event: &String| {
                seen.lock().push(format!("{tag}:{event}"));
            });
        }

        bus.publish("change", &"x".to_string());
        bus.publish("other", &"y".to_string());

        assert_eq!(*seen.lock(), vec!["a:x".to_string(), "b:x".to_string()]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Arc::new(Mutex::new(0u32));

        let id = {
            let count = count.clone();
            bus.subscribe("change", move |_| *count.lock() += 1)
        };

        bus.publish("change", &1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish("change", &2);

        assert_eq!(*count.lock(), 1);
        assert_eq!(bus.subscriber_count("change"), 0);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_skips_removed_callback() {
        let bus: Arc<EventBus<u32>> = Arc::new(EventBus::new());
        let second_calls = Arc::new(Mutex::new(0u32));

        let second_id = {
            let second_calls = second_calls.clone();
            bus.subscribe("change", move |_| *second_calls.lock() += 1)
        };

        // Re-register so the removing callback runs first.
        bus.unsubscribe(second_id);
        let bus_ref = bus.clone();
        let removed = Arc::new(Mutex::new(None));
        {
            let removed = removed.clone();
            bus.subscribe("change", move |_| {
                if let Some(id) = removed.lock().take() {
                    bus_ref.unsubscribe(id);
                }
            });
        }
        let second_id = {
            let second_calls = second_calls.clone();
            bus.subscribe("change", move |_| *second_calls.lock() += 1)
        };
        *removed.lock() = Some(second_id);

        bus.publish("change", &1);
        assert_eq!(*second_calls.lock(), 0);
    }
}
