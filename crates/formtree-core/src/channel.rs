#![forbid(unsafe_code)]

//! Push-based change notification for form nodes.
//!
//! - [`ChangeChannel`]: a shared subscriber list that emits a value to every
//!   live subscriber, synchronously and in registration order.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`SubscriptionScope`]: collects subscriptions for one observer lifetime
//!   (e.g. a rendered input bound to several nodes).
//!
//! # Architecture
//!
//! `ChangeChannel<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` function pointers; the strong
//! side lives in the [`Subscription`]. Dead entries are pruned lazily during
//! emission.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. No internal borrow is held while a callback runs, so callbacks may read
//!    the emitting node, subscribe, or drop subscriptions.
//! 3. A subscriber registered during an emission does not receive that
//!    emission.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    emission.
//! 5. The channel never closes on its own.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ChannelInner<T> {
    subscribers: Vec<Weak<Callback<T>>>,
    emissions: u64,
}

/// Shared emit/subscribe primitive.
///
/// Cloning a channel yields another handle to the same subscriber list.
pub struct ChangeChannel<T> {
    inner: Rc<RefCell<ChannelInner<T>>>,
}

impl<T> Clone for ChangeChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for ChangeChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ChangeChannel<T> {
    /// Create a channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelInner {
                subscribers: Vec::new(),
                emissions: 0,
            })),
        }
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _callback: Box::new(strong),
        }
    }

    /// Deliver `value` to every live subscriber.
    pub fn emit(&self, value: &T) {
        let live: Vec<Rc<Callback<T>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.emissions += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        tracing::trace!(subscribers = live.len(), "change emitted");
        for callback in live {
            callback(value);
        }
    }

    /// Number of subscribers whose [`Subscription`] is still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Total number of emissions since creation.
    #[must_use]
    pub fn emission_count(&self) -> u64 {
        self.inner.borrow().emissions
    }
}

impl<T> std::fmt::Debug for ChangeChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ChangeChannel")
            .field("subscribers", &inner.subscribers.len())
            .field("emissions", &inner.emissions)
            .finish()
    }
}

/// RAII guard for a channel subscription.
///
/// Type-erased so subscriptions to channels of different payload types can
/// be held together (see [`SubscriptionScope`]).
#[must_use = "dropping the subscription immediately unsubscribes"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Collects subscriptions for a logical scope.
///
/// When the scope is dropped, every held subscription is released.
///
/// # Invariants
///
/// 1. After drop, no callback registered through this scope fires.
/// 2. `clear()` releases everything immediately; the scope stays reusable.
#[derive(Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep an existing subscription alive for the lifetime of this scope.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to a channel within this scope. Returns `self` for chaining.
    pub fn subscribe<T: 'static>(
        &mut self,
        channel: &ChangeChannel<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub = channel.subscribe(callback);
        self.subscriptions.push(sub);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release all subscriptions now.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl std::fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
