use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
  observer::{BoxObserver, ContractSafe, Observer},
  rc::MutArc,
  subscription::{CompositeSubscription, SubscriptionKey, SubscriptionLike},
};

/// Implements the Observer trait and Subscription trait. While the Observer is
/// the public API for consuming the values of an Observable, all Observers get
/// converted to a Subscriber, in order to provide Subscription capabilities.
///
/// The subscription is the composite token of this particular subscription:
/// producers and operators add whatever must be released on cancellation to
/// it.
#[derive(Clone)]
pub struct Subscriber<O> {
  pub observer: O,
  pub subscription: CompositeSubscription,
}

/// The subscriber handed to `create` closures. It is cheap to clone, so a
/// producer can move copies into threads or scheduled actions.
pub type Emitter<Item, Err> = Subscriber<MutArc<Option<BoxObserver<Item, Err>>>>;

impl<O> Subscriber<O> {
  pub fn new(observer: O, subscription: CompositeSubscription) -> Self {
    Subscriber { observer, subscription }
  }

  /// A subscriber with a fresh composite token.
  pub fn from_observer(observer: O) -> Self { Self::new(observer, CompositeSubscription::new()) }

  /// Registers a resource to release when this subscription ends.
  #[inline]
  pub fn add<S: SubscriptionLike + Send + 'static>(&self, teardown: S) -> SubscriptionKey {
    self.subscription.add(teardown)
  }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) {
    if !self.subscription.is_closed() {
      self.observer.next(value)
    }
  }

  fn error(&mut self, err: Err) {
    if !self.subscription.is_closed() {
      self.observer.error(err);
      self.subscription.unsubscribe();
    }
  }

  fn complete(&mut self) {
    if !self.subscription.is_closed() {
      self.observer.complete();
      self.subscription.unsubscribe();
    }
  }

  #[inline]
  fn is_finished(&self) -> bool { self.subscription.is_closed() || self.observer.is_finished() }
}

impl<O> SubscriptionLike for Subscriber<O> {
  #[inline]
  fn unsubscribe(&mut self) { self.subscription.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}

impl<O: ContractSafe> ContractSafe for Subscriber<O> {}

/// Enforces the notification grammar on top of an arbitrary consumer.
///
/// A single atomic `done` flag guards delivery: events after a terminal event
/// are dropped, and a consumer that finished itself (a failing fallible
/// callback) flips the flag and cancels the upstream. A terminal event is
/// delivered once and then the subscription is cancelled, even when the
/// consumer's handler panics.
pub struct SafeSubscriber<O> {
  observer: O,
  done: AtomicBool,
  subscription: CompositeSubscription,
}

/// Cancels the subscription when dropped, including while unwinding out of a
/// terminal handler.
struct UnsubscribeOnDrop(CompositeSubscription);

impl Drop for UnsubscribeOnDrop {
  fn drop(&mut self) { self.0.unsubscribe() }
}

impl<O> SafeSubscriber<O> {
  pub fn new(observer: O, subscription: CompositeSubscription) -> Self {
    SafeSubscriber { observer, done: AtomicBool::new(false), subscription }
  }

  /// Marks the subscriber done, returns `false` if it already was.
  #[inline]
  fn mark_done(&self) -> bool { !self.done.swap(true, Ordering::AcqRel) }
}

impl<Item, Err, O> Observer<Item, Err> for SafeSubscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.done.load(Ordering::Acquire) {
      return;
    }
    self.observer.next(value);
    if self.observer.is_finished() && self.mark_done() {
      self.subscription.unsubscribe();
    }
  }

  fn error(&mut self, err: Err) {
    if self.mark_done() {
      let _guard = UnsubscribeOnDrop(self.subscription.clone());
      self.observer.error(err);
    }
  }

  fn complete(&mut self) {
    if self.mark_done() {
      let _guard = UnsubscribeOnDrop(self.subscription.clone());
      self.observer.complete();
    }
  }

  #[inline]
  fn is_finished(&self) -> bool { self.done.load(Ordering::Acquire) }
}

impl<O> ContractSafe for SafeSubscriber<O> {}
