//! Interception of subscriptions, for instrumentation.
//!
//! Hooks are values, attached to one descriptor with
//! [`hooked`](crate::observable::ObservableExt::hooked). There is no global
//! registry: only descendants of the hooked descriptor are affected.
//!
//! ```rust
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! use rxflow::{hooks::SubscribeHooks, prelude::*};
//!
//! #[derive(Default)]
//! struct CountSubscriptions(AtomicUsize);
//!
//! impl SubscribeHooks for CountSubscriptions {
//!   fn on_subscribe_start(&self) { self.0.fetch_add(1, Ordering::Relaxed); }
//! }
//!
//! let hooks = Arc::new(CountSubscriptions::default());
//! let source = observable::from_iter(0..3).hooked(hooks.clone());
//! source.clone().subscribe(|_| {});
//! source.subscribe(|_| {});
//! assert_eq!(hooks.0.load(Ordering::Relaxed), 2);
//! ```

use std::{fmt::Debug, sync::Arc};

use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  subscriber::Subscriber,
};

/// Callbacks invoked around every subscription of a hooked descriptor. All
/// of them default to doing nothing.
pub trait SubscribeHooks: Send + Sync + 'static {
  /// Before the source is subscribed.
  fn on_subscribe_start(&self) {}

  /// After `actual_subscribe` of the source returned.
  fn on_subscribe_return(&self) {}

  /// An error is about to be delivered downstream.
  fn on_error(&self, _err: &dyn Debug) {}
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl SubscribeHooks for NoopHooks {}

impl<H: SubscribeHooks + ?Sized> SubscribeHooks for Arc<H> {
  fn on_subscribe_start(&self) { (**self).on_subscribe_start() }

  fn on_subscribe_return(&self) { (**self).on_subscribe_return() }

  fn on_error(&self, err: &dyn Debug) { (**self).on_error(err) }
}

pub struct HookedOp<S, H> {
  source: S,
  hooks: Arc<H>,
}

impl<S: Clone, H> Clone for HookedOp<S, H> {
  fn clone(&self) -> Self { HookedOp { source: self.source.clone(), hooks: self.hooks.clone() } }
}

impl<S, H> HookedOp<S, H> {
  pub(crate) fn new(source: S, hooks: H) -> Self { HookedOp { source, hooks: Arc::new(hooks) } }
}

struct HookedObserver<O, H> {
  down: Subscriber<O>,
  hooks: Arc<H>,
}

impl<Item, Err, O, H> Observer<Item, Err> for HookedObserver<O, H>
where
  Err: Debug,
  O: Observer<Item, Err>,
  H: SubscribeHooks,
{
  #[inline]
  fn next(&mut self, value: Item) { self.down.next(value) }

  fn error(&mut self, err: Err) {
    self.hooks.on_error(&err);
    self.down.error(err)
  }

  #[inline]
  fn complete(&mut self) { self.down.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.down.is_finished() }
}

impl<S, H, Item, Err> Observable<Item, Err> for HookedOp<S, H>
where
  S: Observable<Item, Err>,
  H: SubscribeHooks,
  Item: Send + 'static,
  Err: Debug + Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let hooks = self.hooks;
    hooks.on_subscribe_start();
    let c_hooks = hooks.clone();
    self
      .source
      .lift(move |down: Subscriber<BoxObserver<Item, Err>>| HookedObserver { down, hooks: c_hooks })
      .actual_subscribe(subscriber);
    hooks.on_subscribe_return();
  }
}
