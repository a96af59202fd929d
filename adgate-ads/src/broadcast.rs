//! Typed observable with replay-on-subscribe.
//!
//! # Contract
//!
//! - **Replay**: if a value has been published, a new subscriber receives
//!   the latest value once, asynchronously (never inside `subscribe`). A
//!   subscriber that already saw that value through a regular publish is
//!   not replayed again.
//! - **Order**: each publish reaches subscribers in registration order.
//! - **Isolation**: a panicking callback is logged and skipped; the rest
//!   of the pass still runs.
//! - **Stable passes**: the subscriber list is snapshotted per publish, so
//!   unsubscribing mid-pass does not change who that pass reaches.
//! - **Serialized delivery**: a publish is fully delivered before the next
//!   one starts, including publishes made from inside a callback.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, warn};

/// Subscriber callback.
pub type Callback<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
    /// Version of the newest value this subscriber has been handed.
    last_seen: AtomicU64,
    active: AtomicBool,
}

enum Pending<T> {
    Publish(u64, Arc<T>),
    Replay(Arc<Subscriber<T>>),
}

struct Queue<T> {
    pending: VecDeque<Pending<T>>,
    delivering: bool,
    /// Latest published value and its version. Versions start at 1.
    latest: Option<(u64, Arc<T>)>,
}

struct Shared<T> {
    subscribers: Mutex<Vec<Arc<Subscriber<T>>>>,
    queue: Mutex<Queue<T>>,
    next_id: AtomicU64,
}

/// Fan-out hub for values of type `T`.
pub struct Broadcaster<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Default for Broadcaster<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcaster<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a broadcaster with no value and no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: Mutex::new(Vec::new()),
                queue: Mutex::new(Queue {
                    pending: VecDeque::new(),
                    delivering: false,
                    latest: None,
                }),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `callback`. See the module docs for replay semantics.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let subscriber = Arc::new(Subscriber {
            id: self.shared.next_id.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
            last_seen: AtomicU64::new(0),
            active: AtomicBool::new(true),
        });
        let id = subscriber.id;
        self.shared.lock_subscribers().push(subscriber.clone());

        let has_value = self.shared.lock_queue().latest.is_some();
        if has_value {
            let shared = self.shared.clone();
            let replay = move || {
                shared.enqueue(Pending::Replay(subscriber));
                shared.drain();
            };
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move { replay() });
                }
                Err(_) => {
                    std::thread::spawn(replay);
                }
            }
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Publishes `value` to every subscriber.
    pub fn publish(&self, value: T) -> Arc<T> {
        self.publish_with(|_| value)
    }

    /// Builds the value under the publish lock, passing it the version it
    /// will carry, then publishes it. Concurrent publishers therefore never
    /// reorder versions.
    pub fn publish_with<F>(&self, build: F) -> Arc<T>
    where
        F: FnOnce(u64) -> T,
    {
        let value = {
            let mut queue = self.shared.lock_queue();
            let version = queue.latest.as_ref().map_or(1, |(v, _)| v + 1);
            let value = Arc::new(build(version));
            queue.latest = Some((version, value.clone()));
            queue
                .pending
                .push_back(Pending::Publish(version, value.clone()));
            value
        };
        self.shared.drain();
        value
    }

    /// Latest published value.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<T>> {
        self.shared.lock_queue().latest.as_ref().map(|(_, v)| v.clone())
    }

    /// Version of the latest published value, zero before the first publish.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.lock_queue().latest.as_ref().map_or(0, |(v, _)| *v)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock_subscribers().len()
    }
}

impl<T> Shared<T>
where
    T: Send + Sync + 'static,
{
    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Arc<Subscriber<T>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_queue(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enqueue(&self, item: Pending<T>) {
        self.lock_queue().pending.push_back(item);
    }

    /// Delivers queued items until the queue is empty. If another caller is
    /// already delivering, it picks up our items instead.
    fn drain(&self) {
        {
            let mut queue = self.lock_queue();
            if queue.delivering {
                return;
            }
            queue.delivering = true;
        }
        loop {
            let (item, latest) = {
                let mut queue = self.lock_queue();
                match queue.pending.pop_front() {
                    Some(item) => (item, queue.latest.clone()),
                    None => {
                        queue.delivering = false;
                        return;
                    }
                }
            };
            match item {
                Pending::Publish(version, value) => {
                    let subscribers = self.lock_subscribers().clone();
                    for subscriber in subscribers {
                        deliver(&subscriber, version, &value);
                    }
                }
                Pending::Replay(subscriber) => {
                    if !subscriber.active.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Some((version, value)) = latest {
                        deliver(&subscriber, version, &value);
                    }
                }
            }
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.lock_subscribers();
        match subscribers.iter().position(|s| s.id == id) {
            Some(index) => {
                let removed = subscribers.remove(index);
                removed.active.store(false, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

fn deliver<T>(subscriber: &Subscriber<T>, version: u64, value: &Arc<T>) {
    if subscriber.last_seen.fetch_max(version, Ordering::SeqCst) >= version {
        return;
    }
    let callback = subscriber.callback.clone();
    if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
        warn!(subscriber = subscriber.id, version, "Status subscriber panicked");
    }
}

/// Handle returned by [`Broadcaster::subscribe`].
///
/// Dropping it leaves the callback registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription<T> {
    id: u64,
    shared: Weak<Shared<T>>,
}

impl<T> Subscription<T>
where
    T: Send + Sync + 'static,
{
    /// Removes the callback. Idempotent; returns true the first time.
    pub fn unsubscribe(&self) -> bool {
        let removed = self
            .shared
            .upgrade()
            .is_some_and(|shared| shared.remove(self.id));
        if removed {
            debug!(subscriber = self.id, "Unsubscribed");
        }
        removed
    }

    /// Subscriber id, unique per broadcaster.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
