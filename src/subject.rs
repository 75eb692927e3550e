//! Subjects are observers and observables at once: every value pushed into a
//! subject is multicast to all of its current subscribers.
//!
//! Emissions are ordered under the subject's lock and delivered after the
//! lock is released, so a subscriber may push into the subject it listens to,
//! or unsubscribe itself, from inside its own callbacks. A reentrant value is
//! queued and delivered after the current one.
//!
//! | Subject | Late subscribers receive |
//! |---------|--------------------------|
//! | [`Subject`] | only what comes next, or the terminal event |
//! | [`ReplaySubject`] | the retained values, then live events |
//! | [`BehaviorSubject`] | the latest value, then live events |
//! | [`AsyncSubject`] | the last value and completion, once completed |

use crate::{
  observable::Observable,
  observer::{ContractSafe, Observer},
};

/// Generates the `Observer`, `Observable`, `Clone` and [`SubjectLike`]
/// implementations of a subject newtype over `SubjectCore`.
macro_rules! impl_subject {
  ($name:ident) => {
    impl<Item, Err> Clone for $name<Item, Err> {
      fn clone(&self) -> Self { $name(self.0.clone()) }
    }

    impl<Item, Err> $crate::observer::Observer<Item, Err> for $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      #[inline]
      fn next(&mut self, value: Item) { self.0.next(value) }

      #[inline]
      fn error(&mut self, err: Err) { self.0.error(err) }

      #[inline]
      fn complete(&mut self) { self.0.complete() }

      #[inline]
      fn is_finished(&self) -> bool { self.0.is_stopped() }
    }

    impl<Item, Err> $crate::observable::Observable<Item, Err> for $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      fn actual_subscribe<O>(self, subscriber: $crate::subscriber::Subscriber<O>)
      where
        O: $crate::observer::Observer<Item, Err> + Send + 'static,
      {
        self.0.subscribe(subscriber)
      }
    }

    impl<Item, Err> $crate::observer::ContractSafe for $name<Item, Err> {}

    impl<Item, Err> $crate::subject::SubjectLike<Item, Err> for $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      #[inline]
      fn is_stopped(&self) -> bool { self.0.is_stopped() }

      #[inline]
      fn observer_count(&self) -> usize { self.0.observer_count() }
    }
  };
}

mod async_subject;
mod behavior_subject;
mod replay_subject;
mod subject_core;
mod subscribers;

pub use async_subject::AsyncSubject;
pub use behavior_subject::BehaviorSubject;
pub use replay_subject::ReplaySubject;
use subject_core::{History, SubjectCore};

/// Common surface of the subject flavours, used by the multicast operators.
pub trait SubjectLike<Item, Err>:
  Observer<Item, Err> + Observable<Item, Err> + ContractSafe + Clone + Send + Sync + 'static
{
  /// Whether a terminal event was received.
  fn is_stopped(&self) -> bool;

  /// Number of currently attached subscribers.
  fn observer_count(&self) -> usize;
}

/// Multicasts to the subscribers attached at the time of each event.
///
/// ```rust
/// use std::{
///   convert::Infallible,
///   sync::{Arc, Mutex},
/// };
///
/// use rxflow::prelude::*;
///
/// let mut subject = Subject::<i32, Infallible>::new();
/// let results = Arc::new(Mutex::new(vec![]));
/// let c_results = results.clone();
/// subject.clone().subscribe(move |v| c_results.lock().unwrap().push(v));
///
/// subject.next(1);
/// subject.next(2);
/// assert_eq!(*results.lock().unwrap(), vec![1, 2]);
/// ```
pub struct Subject<Item, Err>(SubjectCore<Item, Err>);

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { Subject(SubjectCore::new(History::None)) }
}

impl<Item, Err> Default for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl_subject!(Subject);
