//! Topic registry and subscription handles.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for the handler table because:
//! 1. Operations are O(handlers) clones or removals
//! 2. Lock is never held while a handler runs or across `.await`
//! 3. Removed handlers are dropped after the lock is released

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use super::stream::TopicStream;
use super::topic::Topic;

type ErasedHandler = Arc<dyn Fn(&(dyn Any + 'static)) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TopicKey {
    name: &'static str,
    payload: TypeId,
}

impl TopicKey {
    fn of<T: 'static>(topic: &Topic<T>) -> Self {
        Self {
            name: topic.name(),
            payload: TypeId::of::<T>(),
        }
    }
}

struct HandlerEntry {
    id: u64,
    active: Arc<AtomicBool>,
    handler: ErasedHandler,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    topics: Mutex<HashMap<TopicKey, Vec<HandlerEntry>>>,
}

impl Registry {
    fn insert(&self, key: TopicKey, active: Arc<AtomicBool>, handler: ErasedHandler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.topics
            .lock()
            .entry(key)
            .or_default()
            .push(HandlerEntry {
                id,
                active,
                handler,
            });
        id
    }

    fn remove(&self, key: &TopicKey, id: u64) -> Option<HandlerEntry> {
        let mut topics = self.topics.lock();
        let handlers = topics.get_mut(key)?;
        let position = handlers.iter().position(|entry| entry.id == id)?;
        let entry = handlers.remove(position);
        if handlers.is_empty() {
            topics.remove(key);
        }
        Some(entry)
    }

    fn snapshot(&self, key: &TopicKey) -> Vec<(Arc<AtomicBool>, ErasedHandler)> {
        self.topics
            .lock()
            .get(key)
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|entry| (entry.active.clone(), entry.handler.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn count(&self, key: &TopicKey) -> usize {
        self.topics.lock().get(key).map_or(0, Vec::len)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventBus
// ─────────────────────────────────────────────────────────────────────────────

/// In-process publish/subscribe registry keyed by typed [`Topic`]s.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every handler currently subscribed to `topic`.
    ///
    /// Handlers run synchronously, in subscription order, before this call
    /// returns. A handler disposed by an earlier handler of the same publish
    /// is skipped. Returns the number of handlers invoked; publishing to a
    /// topic nobody listens on is a no-op.
    pub fn publish<T>(&self, topic: &Topic<T>, payload: T) -> usize
    where
        T: Send + Sync + 'static,
    {
        let handlers = self.registry.snapshot(&TopicKey::of(topic));
        if handlers.is_empty() {
            tracing::trace!(topic = topic.name(), "publish with no subscribers");
            return 0;
        }

        let payload_ref: &(dyn Any + 'static) = &payload;
        let mut delivered = 0;
        for (active, handler) in handlers {
            if active.load(Ordering::Acquire) {
                handler(payload_ref);
                delivered += 1;
            }
        }
        tracing::trace!(topic = topic.name(), delivered, "published");
        delivered
    }

    /// Register `handler` for `topic`.
    ///
    /// The handler stays registered for as long as the returned
    /// [`Subscription`] lives.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<T, F>(&self, topic: &Topic<T>, handler: F) -> Subscription
    where
        T: Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let key = TopicKey::of(topic);
        let active = Arc::new(AtomicBool::new(true));
        let erased: ErasedHandler = Arc::new(move |payload: &(dyn Any + 'static)| {
            if let Some(payload) = payload.downcast_ref::<T>() {
                handler(payload);
            }
        });
        let id = self.registry.insert(key, active.clone(), erased);

        Subscription {
            registry: Arc::downgrade(&self.registry),
            key,
            id,
            active,
        }
    }

    /// Subscribe and receive payloads through an async stream instead of a
    /// callback.
    pub fn subscribe_stream<T>(&self, topic: &Topic<T>) -> TopicStream<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(topic, move |payload: &T| {
            let _ = tx.send(payload.clone());
        });
        TopicStream::new(rx, subscription)
    }

    /// Number of live handlers on `topic`.
    pub fn subscriber_count<T: 'static>(&self, topic: &Topic<T>) -> usize {
        self.registry.count(&TopicKey::of(topic))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.registry.topics.lock().len();
        f.debug_struct("EventBus").field("topics", &topics).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription
// ─────────────────────────────────────────────────────────────────────────────

/// Owned registration of one handler on one topic.
///
/// Dropping the handle (or calling [`Subscription::dispose`]) removes the
/// handler. The handle does not keep the bus alive.
pub struct Subscription {
    registry: Weak<Registry>,
    key: TopicKey,
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }

    /// Name of the topic this handle is registered on.
    pub fn topic_name(&self) -> &'static str {
        self.key.name
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            // Bound so the handler is dropped after the registry lock is released.
            let removed = registry.remove(&self.key, self.id);
            drop(removed);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.key.name)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const NUMBERS: Topic<u32> = Topic::new("numbers");
    const WORDS: Topic<String> = Topic::new("words");

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(&NUMBERS, 1), 0);
    }

    #[test]
    fn test_delivery_in_publish_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.subscribe(&NUMBERS, move |n| sink.lock().push(*n));

        for n in 0..5 {
            bus.publish(&NUMBERS, n);
        }
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let sub = bus.subscribe(&NUMBERS, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(bus.subscriber_count(&NUMBERS), 1);

        bus.publish(&NUMBERS, 1);
        sub.dispose();
        bus.publish(&NUMBERS, 2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(&NUMBERS), 0);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = EventBus::new();
        let words = Arc::new(Mutex::new(Vec::new()));
        let sink = words.clone();
        let _sub = bus.subscribe(&WORDS, move |w: &String| sink.lock().push(w.clone()));

        bus.publish(&NUMBERS, 7);
        bus.publish(&WORDS, "hello".to_string());
        assert_eq!(*words.lock(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_same_name_different_payload_does_not_cross() {
        const ALIAS: Topic<u64> = Topic::new("numbers");
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = bus.subscribe(&NUMBERS, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(&ALIAS, 1), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_may_publish_reentrantly() {
        let bus = EventBus::new();
        let words = Arc::new(Mutex::new(Vec::new()));
        let sink = words.clone();
        let _words_sub = bus.subscribe(&WORDS, move |w: &String| sink.lock().push(w.clone()));

        let inner_bus = bus.clone();
        let _numbers_sub = bus.subscribe(&NUMBERS, move |n| {
            inner_bus.publish(&WORDS, format!("got {n}"));
        });

        bus.publish(&NUMBERS, 3);
        assert_eq!(*words.lock(), vec!["got 3".to_string()]);
    }

    #[test]
    fn test_handler_disposed_mid_publish_is_skipped() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let second: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = second.clone();
        let _first = bus.subscribe(&NUMBERS, move |_| {
            slot.lock().take();
        });
        let counter = hits.clone();
        *second.lock() = Some(bus.subscribe(&NUMBERS, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(bus.publish(&NUMBERS, 1), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = EventBus::new();
        let sub = bus.subscribe(&NUMBERS, |_| {});
        drop(bus);
        assert!(!sub.is_active());
        drop(sub);
    }

    #[tokio::test]
    async fn test_stream_receives_and_unsubscribes_on_drop() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe_stream(&WORDS);
        assert_eq!(stream.topic_name(), "words");

        bus.publish(&WORDS, "a".to_string());
        bus.publish(&WORDS, "b".to_string());
        assert_eq!(stream.recv().await.as_deref(), Some("a"));
        assert_eq!(stream.try_recv().as_deref(), Some("b"));
        assert_eq!(stream.try_recv(), None);

        drop(stream);
        assert_eq!(bus.subscriber_count(&WORDS), 0);
    }
}
