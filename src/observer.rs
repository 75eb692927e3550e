//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion). A well behaved producer calls them
//! following `next* (error | complete)?`.

use std::{fmt::Debug, panic};

use crate::error::UnhandledError;

mod synchronized;
pub use synchronized::SynchronizedObserver;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. No more events follow.
  fn error(&mut self, err: Err);

  /// Handle completion of the observable. No more events follow.
  fn complete(&mut self);

  /// Checks if the observer will not accept any more events.
  ///
  /// Sources (like `from_iter`) use it to stop emitting early, and the
  /// safety wrapper uses it to notice a consumer that terminated itself
  /// (a failing fallible callback).
  fn is_finished(&self) -> bool { false }
}

/// Marker for observers that enforce the notification grammar themselves, so
/// `subscribe_safe` can hand them to a source without another safety
/// wrapper.
pub trait ContractSafe {}

pub type BoxObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, T> Observer<Item, Err> for Box<T>
where
  T: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_finished(&self) -> bool { (**self).is_finished() }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Only a `next` handler. An error reaching it has nowhere to go, so it is
/// raised as the fatal [`UnhandledError`].
#[derive(Clone)]
pub struct ObserverNext<N> {
  next: N,
  finished: bool,
}

impl<N> ObserverNext<N> {
  pub fn new(next: N) -> Self { ObserverNext { next, finished: false } }
}

impl<Item, Err, N> Observer<Item, Err> for ObserverNext<N>
where
  N: FnMut(Item),
  Err: Debug + Send + 'static,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    self.finished = true;
    panic::panic_any(UnhandledError(err))
  }

  #[inline]
  fn complete(&mut self) { self.finished = true; }

  #[inline]
  fn is_finished(&self) -> bool { self.finished }
}

#[derive(Clone)]
pub struct ObserverErr<N, E> {
  next: N,
  error: E,
  finished: bool,
}

impl<N, E> ObserverErr<N, E> {
  pub fn new(next: N, error: E) -> Self { ObserverErr { next, error, finished: false } }
}

impl<Item, Err, N, E> Observer<Item, Err> for ObserverErr<N, E>
where
  N: FnMut(Item),
  E: FnMut(Err),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    self.finished = true;
    (self.error)(err)
  }

  #[inline]
  fn complete(&mut self) { self.finished = true; }

  #[inline]
  fn is_finished(&self) -> bool { self.finished }
}

#[derive(Clone)]
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
  finished: bool,
}

impl<N, E, C> ObserverAll<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    ObserverAll { next, error, complete, finished: false }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    self.finished = true;
    (self.error)(err)
  }

  fn complete(&mut self) {
    self.finished = true;
    (self.complete)()
  }

  #[inline]
  fn is_finished(&self) -> bool { self.finished }
}

/// Fallible callbacks. A `next` or `complete` handler returning `Err`
/// terminates this observer: the error is handed to its own error handler,
/// exactly once, and the observer reports itself finished so the safety
/// wrapper cancels the upstream.
#[derive(Clone)]
pub struct TryObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
  finished: bool,
}

impl<N, E, C> TryObserverAll<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    TryObserverAll { next, error, complete, finished: false }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for TryObserverAll<N, E, C>
where
  N: FnMut(Item) -> Result<(), Err>,
  E: FnMut(Err),
  C: FnMut() -> Result<(), Err>,
{
  fn next(&mut self, value: Item) {
    if self.finished {
      return;
    }
    if let Err(err) = (self.next)(value) {
      self.error(err);
    }
  }

  fn error(&mut self, err: Err) {
    self.finished = true;
    (self.error)(err)
  }

  fn complete(&mut self) {
    if self.finished {
      return;
    }
    self.finished = true;
    if let Err(err) = (self.complete)() {
      (self.error)(err);
    }
  }

  #[inline]
  fn is_finished(&self) -> bool { self.finished }
}
