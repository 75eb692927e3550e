//! Stream descriptors and the operator surface.
//!
//! An [`Observable`] is an immutable description of how to produce values for
//! one subscriber. Subscribing runs it once; every subscription is an
//! independent execution. All operators and subscribe entry points live on
//! [`ObservableExt`], which every observable gets for free.

use std::{fmt::Debug, time::Duration};

use crate::{
  hooks::{HookedOp, SubscribeHooks},
  notification::Notification,
  observer::{ContractSafe, Observer, ObserverAll, ObserverErr, ObserverNext, TryObserverAll},
  ops::{
    buffer::{ChunkBoundaryOp, ChunkOp},
    debounce::DebounceOp,
    lift::LiftOp,
    materialize::{DematerializeOp, MaterializeOp, OnErrorReturnOp},
    merge::{self, DelayErrors, FailFast, MergeAllOp},
    observe_on::ObserveOnOp,
    on_error_resume_next::OnErrorResumeNextOp,
    ref_count::RefCount,
    repeat::RepeatOp,
    retry::{RetryConfig, RetryOp, RetryPolicy},
    sample::{SampleOp, SampleTimeOp},
    subscribe_on::SubscribeOnOp,
    throttle::ThrottleFirstOp,
  },
  scheduler::{ImmediateScheduler, Scheduler, TrampolineScheduler},
  subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject, SubjectLike},
  subscriber::{SafeSubscriber, Subscriber},
  subscription::{CompositeSubscription, SubscriptionWrapper},
};

mod boxed;
mod connectable;
mod create;
mod defer;
mod from_iter;
mod interval;
mod timer;
mod trivial;

pub use boxed::BoxOp;
pub use connectable::ConnectableObservable;
pub use create::{create, ObservableFn};
pub use defer::{defer, DeferObservable};
pub use from_iter::{from_iter, of, ObservableIter};
pub use interval::{interval, interval_at, IntervalObservable};
pub use merge::{merge, merge_delay_error};
pub use timer::{timer, TimerObservable};
pub use trivial::{empty, never, throw_err, EmptyObservable, NeverObservable, ThrowObservable};

/// A descriptor of a push based sequence.
///
/// `actual_subscribe` performs all the work for one subscriber: it emits to
/// `subscriber` following `next* (error | complete)?` and registers every
/// resource that must be released on cancellation into
/// `subscriber.subscription`.
pub trait Observable<Item, Err>: Sized {
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static;
}

pub trait ObservableExt<Item, Err>: Observable<Item, Err> {
  // ==================== Subscribe ====================

  /// Subscribes with a `next` handler only. An error reaching this
  /// subscription is raised as the fatal
  /// [`UnhandledError`](crate::error::UnhandledError).
  fn subscribe<N>(self, next: N) -> SubscriptionWrapper<CompositeSubscription>
  where
    N: FnMut(Item) + Send + 'static,
    Err: Debug + Send + 'static,
  {
    self.subscribe_with(ObserverNext::new(next))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionWrapper<CompositeSubscription>
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
  {
    self.subscribe_with(ObserverErr::new(next, error))
  }

  fn subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> SubscriptionWrapper<CompositeSubscription>
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_with(ObserverAll::new(next, error, complete))
  }

  /// Subscribes with fallible callbacks. A `next` or `complete` handler
  /// returning `Err` cancels the upstream and hands that error to `error`,
  /// exactly once.
  fn try_subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> SubscriptionWrapper<CompositeSubscription>
  where
    N: FnMut(Item) -> Result<(), Err> + Send + 'static,
    E: FnMut(Err) + Send + 'static,
    C: FnMut() -> Result<(), Err> + Send + 'static,
  {
    self.subscribe_with(TryObserverAll::new(next, error, complete))
  }

  /// Subscribes any observer, wrapped so it sees a well formed sequence.
  fn subscribe_with<O>(self, observer: O) -> SubscriptionWrapper<CompositeSubscription>
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = CompositeSubscription::new();
    let observer = SafeSubscriber::new(observer, subscription.clone());
    self.actual_subscribe(Subscriber::new(observer, subscription.clone()));
    SubscriptionWrapper(subscription)
  }

  /// Subscribes an observer that already enforces the notification grammar
  /// (a subject, a `SafeSubscriber`) without wrapping it again.
  fn subscribe_safe<O>(self, observer: O) -> SubscriptionWrapper<CompositeSubscription>
  where
    O: Observer<Item, Err> + ContractSafe + Send + 'static,
  {
    let subscription = CompositeSubscription::new();
    self.actual_subscribe(Subscriber::new(observer, subscription.clone()));
    SubscriptionWrapper(subscription)
  }

  // ==================== Composition ====================

  /// Inserts an operator between this observable and its subscribers.
  ///
  /// For every subscription, `operator` receives the downstream subscriber
  /// and returns the observer this observable is subscribed to. Both share the
  /// downstream's cancellation token.
  fn lift<Out, F, U>(self, operator: F) -> LiftOp<Self, F, Item>
  where
    F: FnOnce(Subscriber<crate::observer::BoxObserver<Out, Err>>) -> U,
    U: Observer<Item, Err> + Send + 'static,
  {
    LiftOp::new(self, operator)
  }

  /// Erases the concrete type of this observable.
  fn box_it(self) -> BoxOp<Item, Err>
  where
    Self: Clone + Send + 'static,
    Item: 'static,
    Err: 'static,
  {
    BoxOp::new(self)
  }

  /// Runs `hooks` around every subscription to this observable.
  fn hooked<H: SubscribeHooks>(self, hooks: H) -> HookedOp<Self, H> { HookedOp::new(self, hooks) }

  /// Turns every event into a [`Notification`] value. The result completes
  /// after the source's terminal event and never errors.
  fn materialize(self) -> MaterializeOp<Self> { MaterializeOp::new(self) }

  /// The inverse of [`materialize`](ObservableExt::materialize).
  fn dematerialize<Value>(self) -> DematerializeOp<Self>
  where
    Self: ObservableExt<Notification<Value, Err>, Err>,
  {
    DematerializeOp::new(self)
  }

  // ==================== Error recovery ====================

  /// Replaces an error with a final value produced by `f`, then completes.
  fn on_error_return<F>(self, f: F) -> OnErrorReturnOp<Self, F>
  where
    F: FnOnce(Err) -> Item,
  {
    OnErrorReturnOp::new(self, f)
  }

  /// On error, continues with the observable produced by `f`.
  fn on_error_resume_next<F, S2>(self, f: F) -> OnErrorResumeNextOp<Self, F>
  where
    F: FnOnce(Err) -> S2,
    S2: Observable<Item, Err>,
  {
    OnErrorResumeNextOp::new(self, f)
  }

  /// Resubscribes after an error as long as `policy` allows it. Resubscription
  /// runs on the trampoline, so long retry chains do not grow the stack.
  fn retry<P: RetryPolicy<Err>>(self, policy: P) -> RetryOp<Self, P, TrampolineScheduler> {
    RetryOp::new(self, policy, TrampolineScheduler)
  }

  /// Like [`retry`](ObservableExt::retry), resubscribing on `scheduler`.
  fn retry_on<P, SD>(self, policy: P, scheduler: SD) -> RetryOp<Self, P, SD>
  where
    P: RetryPolicy<Err>,
    SD: Scheduler,
  {
    RetryOp::new(self, policy, scheduler)
  }

  /// Resubscribes after every error.
  fn retry_forever(self) -> RetryOp<Self, RetryConfig, TrampolineScheduler> {
    RetryOp::new(self, RetryConfig::new(), TrampolineScheduler)
  }

  /// Resubscribes every time the source completes, until unsubscribed.
  fn repeat(self) -> RepeatOp<Self, TrampolineScheduler> {
    RepeatOp::new(self, None, TrampolineScheduler)
  }

  /// Runs the source `count` times in total, one run after the other.
  fn repeat_count(self, count: usize) -> RepeatOp<Self, TrampolineScheduler> {
    RepeatOp::new(self, Some(count), TrampolineScheduler)
  }

  // ==================== Fan-in ====================

  /// Merges the events of this observable and `other`. The first error
  /// cancels both.
  fn merge<S>(
    self, other: S,
  ) -> MergeAllOp<merge::SourceList<BoxOp<Item, Err>, Err>, BoxOp<Item, Err>, Err, FailFast>
  where
    Self: Clone + Send + 'static,
    S: Observable<Item, Err> + Clone + Send + 'static,
    Item: 'static,
    Err: 'static,
  {
    merge::merge(vec![self.box_it(), BoxOp::new(other)])
  }

  /// Merges this observable and `other`, reporting every error together once
  /// both finished.
  fn merge_delay_error<S>(
    self, other: S,
  ) -> MergeAllOp<merge::SourceList<BoxOp<Item, Err>, Err>, BoxOp<Item, Err>, Err, DelayErrors>
  where
    Self: Clone + Send + 'static,
    S: Observable<Item, Err> + Clone + Send + 'static,
    Item: 'static,
    Err: Debug + 'static,
  {
    merge::merge_delay_error(vec![self.box_it(), BoxOp::new(other)])
  }

  /// Flattens an observable of observables, subscribing to at most
  /// `concurrent` inner observables at a time. The rest wait in arrival
  /// order.
  fn merge_all(self, concurrent: usize) -> MergeAllOp<Self, Item, Err, FailFast> {
    MergeAllOp::new(self, concurrent)
  }

  /// [`merge_all`](ObservableExt::merge_all) that collects errors instead of
  /// failing fast.
  fn merge_all_delay_error(self, concurrent: usize) -> MergeAllOp<Self, Item, Err, DelayErrors> {
    MergeAllOp::new(self, concurrent)
  }

  // ==================== Time ====================

  /// Emits an item only after `timeout` passed without another item.
  /// Termination flushes the pending item first.
  fn debounce<SD: Scheduler>(self, timeout: Duration, scheduler: SD) -> DebounceOp<Self, SD> {
    DebounceOp::new(self, timeout, scheduler)
  }

  /// Emits the most recent unseen item whenever `notifier` emits.
  fn sample<N, NItem>(self, notifier: N) -> SampleOp<Self, N, NItem>
  where
    N: Observable<NItem, Err>,
  {
    SampleOp::new(self, notifier)
  }

  /// Emits the most recent unseen item every `period`.
  fn sample_time<SD: Scheduler>(self, period: Duration, scheduler: SD) -> SampleTimeOp<Self, SD> {
    SampleTimeOp::new(self, period, scheduler)
  }

  /// Alias of [`sample_time`](ObservableExt::sample_time).
  fn throttle_last<SD: Scheduler>(self, period: Duration, scheduler: SD) -> SampleTimeOp<Self, SD> {
    SampleTimeOp::new(self, period, scheduler)
  }

  /// Emits an item, then ignores items for `window`.
  fn throttle_first<SD: Scheduler>(
    self, window: Duration, scheduler: SD,
  ) -> ThrottleFirstOp<Self, SD> {
    ThrottleFirstOp::new(self, window, scheduler)
  }

  /// Moves delivery of every event to a worker of `scheduler`.
  fn observe_on<SD: Scheduler>(self, scheduler: SD) -> ObserveOnOp<Self, SD> {
    ObserveOnOp::new(self, scheduler)
  }

  /// Subscribes to this observable on a worker of `scheduler`.
  fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> SubscribeOnOp<Self, SD> {
    SubscribeOnOp::new(self, scheduler)
  }

  // ==================== Buffer / window ====================

  /// Emits items in vectors of `count`. Completion emits the rest.
  fn buffer_count(self, count: usize) -> ChunkOp<Self, Item, Vec<Item>, ImmediateScheduler> {
    ChunkOp::new(self, Some(count), None)
  }

  /// Emits the items collected during each `span`. Empty spans emit nothing.
  fn buffer_time<SD: Scheduler>(
    self, span: Duration, scheduler: SD,
  ) -> ChunkOp<Self, Item, Vec<Item>, SD> {
    ChunkOp::new(self, None, Some((span, scheduler)))
  }

  /// Emits a buffer when it holds `count` items or `span` has passed since it
  /// was opened, whichever comes first.
  fn buffer_time_count<SD: Scheduler>(
    self, span: Duration, count: usize, scheduler: SD,
  ) -> ChunkOp<Self, Item, Vec<Item>, SD> {
    ChunkOp::new(self, Some(count), Some((span, scheduler)))
  }

  /// Emits the items collected between two emissions of `boundary`.
  fn buffer<B, BItem>(self, boundary: B) -> ChunkBoundaryOp<Self, Item, Vec<Item>, B, BItem>
  where
    B: Observable<BItem, Err>,
  {
    ChunkBoundaryOp::new(self, boundary)
  }

  /// Splits the items into windows of `count` items. Each window is emitted
  /// as a [`Subject`] when it opens.
  fn window_count(
    self, count: usize,
  ) -> ChunkOp<Self, Item, Subject<Item, Err>, ImmediateScheduler> {
    ChunkOp::new(self, Some(count), None)
  }

  fn window_time<SD: Scheduler>(
    self, span: Duration, scheduler: SD,
  ) -> ChunkOp<Self, Item, Subject<Item, Err>, SD> {
    ChunkOp::new(self, None, Some((span, scheduler)))
  }

  fn window_time_count<SD: Scheduler>(
    self, span: Duration, count: usize, scheduler: SD,
  ) -> ChunkOp<Self, Item, Subject<Item, Err>, SD> {
    ChunkOp::new(self, Some(count), Some((span, scheduler)))
  }

  /// Closes the open window and opens a new one on every emission of
  /// `boundary`.
  fn window<B, BItem>(
    self, boundary: B,
  ) -> ChunkBoundaryOp<Self, Item, Subject<Item, Err>, B, BItem>
  where
    B: Observable<BItem, Err>,
  {
    ChunkBoundaryOp::new(self, boundary)
  }

  // ==================== Multicast ====================

  /// Shares one subscription to this observable through `subject` once
  /// connected.
  fn multicast<Subj>(self, subject: Subj) -> ConnectableObservable<Subj>
  where
    Self: Clone + Send + 'static,
    Subj: SubjectLike<Item, Err>,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, move || subject.clone())
  }

  /// Multicasts through a [`Subject`]: subscribers see what is emitted after
  /// they subscribed.
  fn publish(self) -> ConnectableObservable<Subject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, Subject::new)
  }

  /// Multicasts through an unbounded [`ReplaySubject`].
  fn replay(self) -> ConnectableObservable<ReplaySubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, ReplaySubject::new)
  }

  fn replay_with_buffer(self, size: usize) -> ConnectableObservable<ReplaySubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, move || ReplaySubject::with_buffer(size))
  }

  fn replay_with_time<SD: Scheduler>(
    self, window: Duration, scheduler: SD,
  ) -> ConnectableObservable<ReplaySubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, move || {
      ReplaySubject::with_time(window, scheduler.clone())
    })
  }

  fn replay_with_buffer_and_time<SD: Scheduler>(
    self, size: usize, window: Duration, scheduler: SD,
  ) -> ConnectableObservable<ReplaySubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, move || {
      ReplaySubject::with_buffer_and_time(size, window, scheduler.clone())
    })
  }

  /// Multicasts through a [`BehaviorSubject`] seeded with `initial`.
  fn publish_behavior(self, initial: Item) -> ConnectableObservable<BehaviorSubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + Sync + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, move || {
      BehaviorSubject::new(initial.clone())
    })
  }

  /// Multicasts through an [`AsyncSubject`]: only the last value, on
  /// completion.
  fn publish_last(self) -> ConnectableObservable<AsyncSubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    ConnectableObservable::new::<Self, Item, Err, _>(self, AsyncSubject::new)
  }

  /// `publish().ref_count()`.
  fn share(self) -> RefCount<Subject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    self.publish().ref_count()
  }

  /// `replay().ref_count()`.
  fn share_replay(self) -> RefCount<ReplaySubject<Item, Err>>
  where
    Self: Clone + Send + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    self.replay().ref_count()
  }
}

impl<Item, Err, T> ObservableExt<Item, Err> for T where T: Observable<Item, Err> {}
