use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use futures::task::AtomicWaker;
use parking_lot::Mutex;

/// Per-subscriber mailbox holding at most one undelivered value
struct Slot<T> {
    value: Mutex<Option<T>>,
    waker: AtomicWaker,
    closed: AtomicBool,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            waker: AtomicWaker::new(),
            closed: AtomicBool::new(false),
        }
    }
}

/// Broadcasts "latest value" notifications to any number of subscribers.
///
/// Each subscriber owns a single slot. Publishing overwrites whatever the
/// subscriber has not picked up yet, so a slow consumer only ever sees the most
/// recent change. Subscribers joining late get nothing that was published
/// before they subscribed.
pub struct ChangeNotifier<T> {
    slots: Mutex<Vec<Weak<Slot<T>>>>,
}

impl<T> Default for ChangeNotifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ChangeNotifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &format!("<{} subscribers>", self.subscriber_count()))
            .finish()
    }
}

impl<T> ChangeNotifier<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber with an empty slot
    pub fn subscribe(&self) -> ChangeSubscription<T> {
        let slot = Arc::new(Slot::new());
        self.slots.lock().push(Arc::downgrade(&slot));
        ChangeSubscription { slot }
    }

    /// Number of subscribers that are still alive
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.strong_count() > 0).count()
    }
}

impl<T: Clone> ChangeNotifier<T> {
    /// Replace the pending value of every live subscriber with `value`
    pub fn publish(&self, value: T) {
        let mut slots = self.slots.lock();
        slots.retain(|weak| match weak.upgrade() {
            Some(slot) => {
                *slot.value.lock() = Some(value.clone());
                slot.waker.wake();
                true
            }
            None => false,
        });
    }
}

impl<T> Drop for ChangeNotifier<T> {
    fn drop(&mut self) {
        for slot in self.slots.get_mut().drain(..).filter_map(|weak| weak.upgrade()) {
            slot.closed.store(true, Ordering::Release);
            slot.waker.wake();
        }
    }
}

/// Receiving end of a [`ChangeNotifier`].
///
/// Use [`ChangeSubscription::try_next`] from a frame loop, or consume it as a
/// [`Stream`] from async code. The stream ends once the notifier is dropped and
/// the last pending value has been taken.
pub struct ChangeSubscription<T> {
    slot: Arc<Slot<T>>,
}

impl<T> std::fmt::Debug for ChangeSubscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> ChangeSubscription<T> {
    /// Take the pending value, if any, without waiting
    pub fn try_next(&mut self) -> Option<T> {
        self.slot.value.lock().take()
    }

    /// True once the notifier is gone; a final pending value may still be available
    pub fn is_closed(&self) -> bool {
        self.slot.closed.load(Ordering::Acquire)
    }
}

impl<T> Stream for ChangeSubscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        // Register before checking so a publish in between still wakes us
        this.slot.waker.register(cx.waker());

        if let Some(value) = this.try_next() {
            return Poll::Ready(Some(value));
        }
        if this.is_closed() {
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}
