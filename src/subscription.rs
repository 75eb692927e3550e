//! Cancellation tokens.
//!
//! Every subscription owns a [`CompositeSubscription`]; operators register the
//! resources they need released (inner subscriptions, timers, workers) into
//! it, so cancelling the outermost token tears the whole tree down.

use std::{
  any::Any,
  fmt::{Debug, Formatter},
  panic::{self, AssertUnwindSafe},
  sync::atomic::{AtomicUsize, Ordering},
};

use smallvec::SmallVec;

use crate::rc::{MutArc, RcDeref, RcDerefMut};

mod serial;
pub use serial::SerialSubscription;

/// Subscription returns from `Observable.subscribe(Subscriber)` to allow
///  unsubscribing.
pub trait SubscriptionLike {
  /// This allows deregistering an stream before it has finished receiving all
  /// events (i.e. before onCompleted is called).
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

pub type BoxSubscription = Box<dyn SubscriptionLike + Send>;

impl Debug for Box<dyn SubscriptionLike + Send> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Box<dyn SubscriptionLike>")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

impl<T: ?Sized> SubscriptionLike for Box<T>
where
  T: SubscriptionLike,
{
  #[inline]
  fn unsubscribe(&mut self) {
    let s = &mut **self;
    s.unsubscribe()
  }

  #[inline]
  fn is_closed(&self) -> bool {
    let s = &**self;
    s.is_closed()
  }
}

impl<T: SubscriptionLike> SubscriptionLike for Option<T> {
  fn unsubscribe(&mut self) {
    if let Some(s) = self {
      s.unsubscribe()
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().map_or(true, T::is_closed) }
}

/// Key returned by [`CompositeSubscription::add`], used to detach the child
/// again without cancelling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(usize);

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

/// A thread-safe container of child subscriptions. Unsubscribing it
/// unsubscribes every child exactly once; adding a child after it was
/// unsubscribed cancels that child immediately.
#[derive(Clone, Default)]
pub struct CompositeSubscription(MutArc<Inner>);

struct Inner {
  closed: bool,
  teardown: SmallVec<[(SubscriptionKey, BoxSubscription); 1]>,
}

impl Default for Inner {
  fn default() -> Self { Inner { closed: false, teardown: SmallVec::new() } }
}

impl Debug for CompositeSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.0.rc_deref();
    f.debug_struct("CompositeSubscription")
      .field("closed", &inner.closed)
      .field("teardown_count", &inner.teardown.len())
      .finish()
  }
}

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  /// Adds `subscription` as a child. If this composite is already closed the
  /// child is unsubscribed right away instead of being stored.
  pub fn add<S: SubscriptionLike + Send + 'static>(&self, subscription: S) -> SubscriptionKey {
    let key = SubscriptionKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed));
    if self.is_same(&subscription) {
      return key;
    }
    let mut subscription: BoxSubscription = Box::new(subscription);
    {
      let mut inner = self.0.rc_deref_mut();
      if !inner.closed {
        inner.teardown.retain(|(_, v)| !v.is_closed());
        inner.teardown.push((key, subscription));
        return key;
      }
    }
    subscription.unsubscribe();
    key
  }

  /// Detaches the child registered under `key` without unsubscribing it.
  pub fn remove(&self, key: SubscriptionKey) -> Option<BoxSubscription> {
    let mut inner = self.0.rc_deref_mut();
    let idx = inner.teardown.iter().position(|(k, _)| *k == key)?;
    Some(inner.teardown.remove(idx).1)
  }

  pub fn teardown_size(&self) -> usize { self.0.rc_deref().teardown.len() }

  fn is_same(&self, other: &dyn Any) -> bool {
    other
      .downcast_ref::<Self>()
      .is_some_and(|other| self.0.ptr_eq(&other.0))
  }
}

impl SubscriptionLike for CompositeSubscription {
  fn unsubscribe(&mut self) {
    let teardown = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };

    // Every child gets its chance to release resources even if a sibling
    // panics; the last panic is raised again once all of them ran.
    let mut last_panic = None;
    for (_, mut child) in teardown {
      if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| child.unsubscribe())) {
        tracing::warn!("a teardown panicked while unsubscribing a composite subscription");
        last_panic = Some(payload);
      }
    }
    if let Some(payload) = last_panic {
      panic::resume_unwind(payload);
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}

/// A one-shot teardown closure usable wherever a subscription is expected.
pub struct Teardown<F>(Option<F>);

impl<F: FnOnce()> Teardown<F> {
  pub fn new(f: F) -> Self { Teardown(Some(f)) }
}

impl<F: FnOnce()> SubscriptionLike for Teardown<F> {
  fn unsubscribe(&mut self) {
    if let Some(f) = self.0.take() {
      f()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_none() }
}

/// Wrapper around a subscription which provides the
/// `unsubscribe_when_dropped()` method.
#[derive(Debug, Clone)]
pub struct SubscriptionWrapper<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionWrapper<T> {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard(self.0) }

  /// Consumes this wrapper and returns the underlying subscription.
  pub fn into_inner(self) -> T { self.0 }
}

impl<T: SubscriptionLike> SubscriptionLike for SubscriptionWrapper<T> {
  #[inline]
  fn unsubscribe(&mut self) { self.0.unsubscribe() }
  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
