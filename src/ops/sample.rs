//! Sampling operators: the most recent item is held and emitted when a
//! trigger fires, either a notifier observable or a periodic timer. An item is
//! emitted at most once; a trigger with nothing new emits nothing. Completion
//! of the source flushes a held item first.

use std::{marker::PhantomData, time::Duration};

use crate::{
  notification::Notification,
  observable::Observable,
  observer::{Observer, SynchronizedObserver},
  rc::{MutArc, RcDerefMut},
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
  subscription::CompositeSubscription,
};

/// The state both sampling flavors share.
struct Sampler<Item, Err, O> {
  latest: MutArc<Option<Item>>,
  down: SynchronizedObserver<Item, Err, Subscriber<O>>,
}

impl<Item, Err, O> Clone for Sampler<Item, Err, O> {
  fn clone(&self) -> Self { Sampler { latest: self.latest.clone(), down: self.down.clone() } }
}

impl<Item, Err, O: Observer<Item, Err>> Sampler<Item, Err, O> {
  fn new(subscriber: Subscriber<O>) -> Self {
    Sampler { latest: MutArc::own(None), down: SynchronizedObserver::new(subscriber) }
  }

  fn store(&self, value: Item) { *self.latest.rc_deref_mut() = Some(value); }

  fn tick(&self) { self.emit_then(None) }

  /// Enqueues the held item, then `terminal`, and delivers them.
  fn emit_then(&self, terminal: Option<Notification<Item, Err>>) {
    {
      let mut latest = self.latest.rc_deref_mut();
      if let Some(value) = latest.take() {
        self.down.enqueue(Notification::Next(value));
      }
      if let Some(terminal) = terminal {
        self.down.enqueue(terminal);
      }
    }
    self.down.drain();
  }

  fn fail(&self, err: Err) {
    self.latest.rc_deref_mut().take();
    self.down.enqueue(Notification::Error(err));
    self.down.drain();
  }
}

struct SourceObserver<Item, Err, O>(Sampler<Item, Err, O>);

impl<Item, Err, O: Observer<Item, Err>> Observer<Item, Err> for SourceObserver<Item, Err, O> {
  #[inline]
  fn next(&mut self, value: Item) { self.0.store(value) }

  #[inline]
  fn error(&mut self, err: Err) { self.0.fail(err) }

  #[inline]
  fn complete(&mut self) { self.0.emit_then(Some(Notification::Completed)) }

  #[inline]
  fn is_finished(&self) -> bool { self.0.down.is_finished() }
}

/// Emits the latest item whenever `notifier` emits.
pub struct SampleOp<S, N, NItem> {
  source: S,
  notifier: N,
  _marker: PhantomData<fn() -> NItem>,
}

impl<S, N, NItem> SampleOp<S, N, NItem> {
  pub(crate) fn new(source: S, notifier: N) -> Self {
    SampleOp { source, notifier, _marker: PhantomData }
  }
}

impl<S: Clone, N: Clone, NItem> Clone for SampleOp<S, N, NItem> {
  fn clone(&self) -> Self { SampleOp::new(self.source.clone(), self.notifier.clone()) }
}

struct NotifierObserver<Item, Err, O>(Sampler<Item, Err, O>);

impl<Item, Err, O, NItem> Observer<NItem, Err> for NotifierObserver<Item, Err, O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, _: NItem) { self.0.tick() }

  #[inline]
  fn error(&mut self, err: Err) { self.0.fail(err) }

  #[inline]
  fn complete(&mut self) { self.0.emit_then(Some(Notification::Completed)) }

  #[inline]
  fn is_finished(&self) -> bool { self.0.down.is_finished() }
}

impl<S, N, NItem, Item, Err> Observable<Item, Err> for SampleOp<S, N, NItem>
where
  S: Observable<Item, Err>,
  N: Observable<NItem, Err>,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let notifier_token = CompositeSubscription::new();
    let source_token = CompositeSubscription::new();
    subscriber.add(notifier_token.clone());
    subscriber.add(source_token.clone());
    let sampler = Sampler::new(subscriber);
    self
      .notifier
      .actual_subscribe(Subscriber::new(NotifierObserver(sampler.clone()), notifier_token));
    self
      .source
      .actual_subscribe(Subscriber::new(SourceObserver(sampler), source_token));
  }
}

/// Emits the latest item once per `period`.
#[derive(Clone)]
pub struct SampleTimeOp<S, SD> {
  source: S,
  period: Duration,
  scheduler: SD,
}

impl<S, SD> SampleTimeOp<S, SD> {
  pub(crate) fn new(source: S, period: Duration, scheduler: SD) -> Self {
    SampleTimeOp { source, period, scheduler }
  }
}

impl<S, SD, Item, Err> Observable<Item, Err> for SampleTimeOp<S, SD>
where
  S: Observable<Item, Err>,
  SD: Scheduler,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let worker = self.scheduler.create_worker();
    let source_token = CompositeSubscription::new();
    subscriber.add(worker.clone());
    subscriber.add(source_token.clone());
    let sampler = Sampler::new(subscriber);
    let ticker = sampler.clone();
    worker.schedule_periodically(move || ticker.tick(), self.period, self.period);
    self
      .source
      .actual_subscribe(Subscriber::new(SourceObserver(sampler), source_token));
  }
}
