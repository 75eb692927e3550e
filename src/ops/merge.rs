//! Fan-in of many observables into one.
//!
//! Every source gets its own child token under the downstream token, so a
//! source that completes releases only itself. The merged stream completes
//! once the outer source completed and no inner source is active. What
//! happens on error is decided by an [`ErrorStrategy`].
//!
//! ```
//! use std::{
//!   convert::Infallible,
//!   sync::{Arc, Mutex},
//! };
//!
//! use rxflow::prelude::*;
//!
//! let numbers = Subject::<i32, Infallible>::new();
//! let even = numbers.clone();
//! let odd = Subject::<i32, Infallible>::new();
//!
//! let got = Arc::new(Mutex::new(vec![]));
//! let c_got = got.clone();
//! even.merge(odd.clone()).subscribe(move |v| c_got.lock().unwrap().push(v));
//!
//! numbers.clone().next(2);
//! odd.clone().next(1);
//! assert_eq!(*got.lock().unwrap(), vec![2, 1]);
//! ```

use std::{collections::VecDeque, fmt::Debug, marker::PhantomData};

use crate::{
  error::CompositeError,
  notification::Notification,
  observable::Observable,
  observer::{Observer, SynchronizedObserver},
  rc::{MutArc, RcDerefMut},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionKey},
};

/// Decides whether a source error ends the merged stream at once or is kept
/// until every source finished.
pub trait ErrorStrategy<Err>: Send + 'static {
  type Out;

  /// Called for each source error. `Some` terminates the merged stream now.
  fn on_error(err: Err, errors: &mut Vec<Err>) -> Option<Self::Out>;

  /// Called once every source finished. `Some` is emitted as the error.
  fn at_end(errors: Vec<Err>) -> Option<Self::Out>;
}

/// The first error terminates the merged stream and cancels every source.
pub struct FailFast;

/// Errors are collected; once every source finished they are emitted
/// together as a [`CompositeError`].
pub struct DelayErrors;

impl<Err> ErrorStrategy<Err> for FailFast {
  type Out = Err;

  #[inline]
  fn on_error(err: Err, _: &mut Vec<Err>) -> Option<Err> { Some(err) }

  #[inline]
  fn at_end(_: Vec<Err>) -> Option<Err> { None }
}

impl<Err: Debug> ErrorStrategy<Err> for DelayErrors {
  type Out = CompositeError<Err>;

  fn on_error(err: Err, errors: &mut Vec<Err>) -> Option<CompositeError<Err>> {
    errors.push(err);
    None
  }

  fn at_end(errors: Vec<Err>) -> Option<CompositeError<Err>> {
    (!errors.is_empty()).then(|| CompositeError::new(errors))
  }
}

/// Merges `sources`, failing fast on the first error.
pub fn merge<S, Item, Err>(sources: Vec<S>) -> MergeAllOp<SourceList<S, Err>, S, Err, FailFast>
where
  S: Observable<Item, Err>,
{
  MergeAllOp::new(SourceList(sources, PhantomData), usize::MAX)
}

/// Merges `sources`, reporting all errors together at the end.
pub fn merge_delay_error<S, Item, Err>(
  sources: Vec<S>,
) -> MergeAllOp<SourceList<S, Err>, S, Err, DelayErrors>
where
  S: Observable<Item, Err>,
  Err: Debug,
{
  MergeAllOp::new(SourceList(sources, PhantomData), usize::MAX)
}

/// An observable of observables that emits the members of a list.
pub struct SourceList<S, Err>(Vec<S>, PhantomData<fn() -> Err>);

impl<S: Clone, Err> Clone for SourceList<S, Err> {
  fn clone(&self) -> Self { SourceList(self.0.clone(), PhantomData) }
}

impl<S, Err> Observable<S, Err> for SourceList<S, Err> {
  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>)
  where
    O: Observer<S, Err> + Send + 'static,
  {
    for source in self.0 {
      if subscriber.is_finished() {
        return;
      }
      subscriber.next(source);
    }
    subscriber.complete();
  }
}

pub struct MergeAllOp<S, Inner, Err, P> {
  source: S,
  concurrent: usize,
  _marker: PhantomData<fn() -> (Inner, Err, P)>,
}

impl<S, Inner, Err, P> MergeAllOp<S, Inner, Err, P> {
  pub(crate) fn new(source: S, concurrent: usize) -> Self {
    MergeAllOp { source, concurrent: concurrent.max(1), _marker: PhantomData }
  }
}

impl<S: Clone, Inner, Err, P> Clone for MergeAllOp<S, Inner, Err, P> {
  fn clone(&self) -> Self { MergeAllOp::new(self.source.clone(), self.concurrent) }
}

struct MergeState<Inner, Err> {
  active: usize,
  queue: VecDeque<Inner>,
  outer_done: bool,
  done: bool,
  errors: Vec<Err>,
}

struct MergeCore<Inner, Item, Err, P: ErrorStrategy<Err>, O> {
  state: MutArc<MergeState<Inner, Err>>,
  down: SynchronizedObserver<Item, P::Out, Subscriber<O>>,
  token: CompositeSubscription,
  concurrent: usize,
}

impl<Inner, Item, Err, P: ErrorStrategy<Err>, O> Clone for MergeCore<Inner, Item, Err, P, O> {
  fn clone(&self) -> Self {
    MergeCore {
      state: self.state.clone(),
      down: self.down.clone(),
      token: self.token.clone(),
      concurrent: self.concurrent,
    }
  }
}

impl<Inner, Item, Err, P, O> MergeCore<Inner, Item, Err, P, O>
where
  Inner: Observable<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  P: ErrorStrategy<Err>,
  P::Out: Send + 'static,
  O: Observer<Item, P::Out> + Send + 'static,
{
  fn subscribe_inner(&self, inner: Inner) {
    let inner_token = CompositeSubscription::new();
    let key = self.token.add(inner_token.clone());
    let observer = InnerObserver { core: self.clone(), key };
    inner.actual_subscribe(Subscriber::new(observer, inner_token));
  }

  fn on_outer_next(&self, inner: Inner) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.done {
        return;
      }
      if state.active >= self.concurrent {
        state.queue.push_back(inner);
        return;
      }
      state.active += 1;
    }
    self.subscribe_inner(inner);
  }

  fn on_inner_done(&self, key: SubscriptionKey) {
    self.token.remove(key);
    let next = {
      let mut state = self.state.rc_deref_mut();
      state.active -= 1;
      match state.queue.pop_front().filter(|_| !state.done) {
        Some(next) => {
          state.active += 1;
          Some(next)
        }
        None => None,
      }
    };
    match next {
      Some(next) => self.subscribe_inner(next),
      None => self.try_finish(),
    }
  }

  fn on_outer_done(&self) {
    self.state.rc_deref_mut().outer_done = true;
    self.try_finish();
  }

  fn try_finish(&self) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.done || !state.outer_done || state.active > 0 {
        return;
      }
      state.done = true;
      let terminal = match P::at_end(std::mem::take(&mut state.errors)) {
        Some(err) => Notification::Error(err),
        None => Notification::Completed,
      };
      self.down.enqueue(terminal);
    }
    self.down.drain();
  }

  /// Returns true when the error was recorded and the source counts as
  /// finished.
  fn on_error(&self, err: Err) -> bool {
    {
      let mut state = self.state.rc_deref_mut();
      if state.done {
        return false;
      }
      match P::on_error(err, &mut state.errors) {
        None => return true,
        Some(err) => {
          state.done = true;
          state.queue.clear();
          self.down.enqueue(Notification::Error(err));
        }
      }
    }
    // Delivering the error tears the downstream token down, and with it every
    // other source.
    self.down.drain();
    false
  }
}

struct OuterObserver<Inner, Item, Err, P: ErrorStrategy<Err>, O>(MergeCore<Inner, Item, Err, P, O>);

impl<Inner, Item, Err, P, O> Observer<Inner, Err> for OuterObserver<Inner, Item, Err, P, O>
where
  Inner: Observable<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  P: ErrorStrategy<Err>,
  P::Out: Send + 'static,
  O: Observer<Item, P::Out> + Send + 'static,
{
  #[inline]
  fn next(&mut self, inner: Inner) { self.0.on_outer_next(inner) }

  fn error(&mut self, err: Err) {
    if self.0.on_error(err) {
      self.0.on_outer_done();
    }
  }

  #[inline]
  fn complete(&mut self) { self.0.on_outer_done() }

  #[inline]
  fn is_finished(&self) -> bool { self.0.down.is_finished() }
}

struct InnerObserver<Inner, Item, Err, P: ErrorStrategy<Err>, O> {
  core: MergeCore<Inner, Item, Err, P, O>,
  key: SubscriptionKey,
}

impl<Inner, Item, Err, P, O> Observer<Item, Err> for InnerObserver<Inner, Item, Err, P, O>
where
  Inner: Observable<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  P: ErrorStrategy<Err>,
  P::Out: Send + 'static,
  O: Observer<Item, P::Out> + Send + 'static,
{
  #[inline]
  fn next(&mut self, value: Item) { self.core.down.next(value) }

  fn error(&mut self, err: Err) {
    if self.core.on_error(err) {
      self.core.on_inner_done(self.key);
    }
  }

  #[inline]
  fn complete(&mut self) { self.core.on_inner_done(self.key) }

  #[inline]
  fn is_finished(&self) -> bool { self.core.down.is_finished() }
}

impl<S, Inner, Item, Err, P> Observable<Item, P::Out> for MergeAllOp<S, Inner, Err, P>
where
  S: Observable<Inner, Err>,
  Inner: Observable<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  P: ErrorStrategy<Err>,
  P::Out: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, P::Out> + Send + 'static,
  {
    let token = subscriber.subscription.clone();
    let outer_token = CompositeSubscription::new();
    token.add(outer_token.clone());
    let core: MergeCore<Inner, Item, Err, P, O> = MergeCore {
      state: MutArc::own(MergeState {
        active: 0,
        queue: VecDeque::new(),
        outer_done: false,
        done: false,
        errors: vec![],
      }),
      down: SynchronizedObserver::new(subscriber),
      token,
      concurrent: self.concurrent,
    };
    self
      .source
      .actual_subscribe(Subscriber::new(OuterObserver(core), outer_token));
  }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{Arc, Mutex},
    time::Duration,
  };

  use crate::{prelude::*, scheduler::TestScheduler};

  type Log = Arc<Mutex<Vec<String>>>;

  fn record<S, E>(source: S, log: &Log) -> SubscriptionWrapper<CompositeSubscription>
  where
    S: Observable<i32, E>,
    E: std::fmt::Debug,
  {
    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    source.subscribe_all(
      move |v| n.lock().unwrap().push(v.to_string()),
      move |err| e.lock().unwrap().push(format!("error {err:?}")),
      move || c.lock().unwrap().push("done".to_owned()),
    )
  }

  #[test]
  fn completes_after_every_source() {
    let log = Log::default();
    let mut a = Subject::<i32, &'static str>::new();
    let mut b = Subject::<i32, &'static str>::new();
    record(observable::merge(vec![a.clone(), b.clone()]), &log);
    a.next(1);
    b.next(2);
    a.complete();
    b.next(3);
    assert_eq!(*log.lock().unwrap(), vec!["1", "2", "3"]);
    b.complete();
    assert_eq!(log.lock().unwrap().last().unwrap(), "done");
  }

  #[test]
  fn first_error_cancels_the_others() {
    let log = Log::default();
    let mut a = Subject::<i32, &'static str>::new();
    let mut b = Subject::<i32, &'static str>::new();
    record(a.clone().merge(b.clone()), &log);
    a.next(1);
    a.error("boom");
    b.next(2);
    assert_eq!(*log.lock().unwrap(), vec!["1", "error \"boom\""]);
    assert_eq!(b.observer_count(), 0);
  }

  #[test]
  fn delayed_errors_are_collected() {
    let log = Log::default();
    let mut a = Subject::<i32, &'static str>::new();
    let mut b = Subject::<i32, &'static str>::new();
    record(observable::merge_delay_error(vec![a.clone(), b.clone()]), &log);
    a.error("a failed");
    b.next(2);
    b.error("b failed");
    assert_eq!(
      *log.lock().unwrap(),
      vec!["2", "error CompositeError { errors: [\"a failed\", \"b failed\"] }"]
    );
  }

  #[test]
  fn pairwise_delay_error_waits_for_the_other_source() {
    let log = Log::default();
    let mut a = Subject::<i32, &'static str>::new();
    let mut b = Subject::<i32, &'static str>::new();
    record(a.clone().merge_delay_error(b.clone()), &log);
    a.error("a failed");
    b.next(1);
    assert_eq!(*log.lock().unwrap(), vec!["1"]);
    b.complete();
    assert_eq!(
      *log.lock().unwrap(),
      vec!["1", "error CompositeError { errors: [\"a failed\"] }"]
    );
  }

  #[test]
  fn concurrency_cap_queues_sources() {
    let log = Log::default();
    let mut a = Subject::<i32, &'static str>::new();
    let mut b = Subject::<i32, &'static str>::new();
    let mut outer = Subject::<Subject<i32, &'static str>, &'static str>::new();
    record(outer.clone().merge_all(1), &log);
    outer.next(a.clone());
    outer.next(b.clone());
    outer.complete();
    b.next(-1);
    a.next(1);
    assert_eq!(b.observer_count(), 0);
    a.complete();
    assert_eq!(b.observer_count(), 1);
    b.next(2);
    b.complete();
    assert_eq!(*log.lock().unwrap(), vec!["1", "2", "done"]);
  }

  #[test]
  fn interleaves_timed_sources() {
    let scheduler = TestScheduler::new();
    let log = Log::default();
    let fast = observable::interval(Duration::from_millis(10), scheduler.clone())
      .lift(|down: Subscriber<BoxObserver<usize, std::convert::Infallible>>| Take(down, 3));
    let slow = observable::timer(Duration::from_millis(25), scheduler.clone());
    let c_log = log.clone();
    fast.merge(slow).subscribe_all(
      move |v| c_log.lock().unwrap().push(v.to_string()),
      |_| {},
      {
        let log = log.clone();
        move || log.lock().unwrap().push("done".to_owned())
      },
    );
    scheduler.advance_by(Duration::from_millis(40));
    assert_eq!(*log.lock().unwrap(), vec!["0", "1", "0", "2", "done"]);
  }

  /// Completes after `n` values.
  struct Take<O>(Subscriber<O>, usize);

  impl<O: Observer<usize, std::convert::Infallible>> Observer<usize, std::convert::Infallible>
    for Take<O>
  {
    fn next(&mut self, value: usize) {
      if self.1 > 0 {
        self.1 -= 1;
        self.0.next(value);
        if self.1 == 0 {
          self.0.complete();
        }
      }
    }

    fn error(&mut self, err: std::convert::Infallible) { self.0.error(err) }

    fn complete(&mut self) { self.0.complete() }

    fn is_finished(&self) -> bool { self.0.is_finished() }
  }
}
