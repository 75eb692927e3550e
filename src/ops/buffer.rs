//! Grouping of consecutive items into chunks.
//!
//! A chunk is either a `Vec` (`buffer_*`), emitted when it closes, or a
//! [`Subject`] (`window_*`), emitted when it opens and completed when it
//! closes. A chunk closes on whichever trigger fires first: the item count is
//! reached, the time span since it opened has passed, or the boundary
//! observable emits. A new chunk opens right away. Completion of the source
//! closes the open chunk before completing.
//!
//! Items are pushed into a window while the operator's lock is held, so a
//! window consumer must not push back into the windowed source.

use std::{marker::PhantomData, time::Duration};

use crate::{
  notification::Notification,
  observable::Observable,
  observer::{Observer, SynchronizedObserver},
  rc::{MutArc, RcDerefMut},
  scheduler::{ImmediateWorker, Scheduler, Worker},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SerialSubscription},
};

/// A container the chunking operators fill.
pub trait Chunk<Item, Err>: Sized + Send + 'static {
  fn open() -> Self;

  /// What to emit when the chunk opens.
  fn on_open(&self) -> Option<Self>;

  fn push(&mut self, value: Item);

  /// Closes the chunk and returns what to emit for it.
  fn close(self) -> Option<Self>;

  /// The source failed while the chunk was open.
  fn fail(self, err: &Err);
}

impl<Item: Send + 'static, Err> Chunk<Item, Err> for Vec<Item> {
  #[inline]
  fn open() -> Self { Vec::new() }

  #[inline]
  fn on_open(&self) -> Option<Self> { None }

  #[inline]
  fn push(&mut self, value: Item) { Vec::push(self, value) }

  #[inline]
  fn close(self) -> Option<Self> { (!self.is_empty()).then_some(self) }

  #[inline]
  fn fail(self, _: &Err) {}
}

impl<Item, Err> Chunk<Item, Err> for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  #[inline]
  fn open() -> Self { Subject::new() }

  #[inline]
  fn on_open(&self) -> Option<Self> { Some(self.clone()) }

  #[inline]
  fn push(&mut self, value: Item) { self.next(value) }

  fn close(mut self) -> Option<Self> {
    self.complete();
    None
  }

  fn fail(mut self, err: &Err) { self.error(err.clone()) }
}

/// Chunks by count and/or time span.
pub struct ChunkOp<S, Item, C, SD> {
  source: S,
  count: Option<usize>,
  span: Option<(Duration, SD)>,
  _marker: PhantomData<fn(Item) -> C>,
}

impl<S, Item, C, SD> ChunkOp<S, Item, C, SD> {
  pub(crate) fn new(source: S, count: Option<usize>, span: Option<(Duration, SD)>) -> Self {
    ChunkOp { source, count: count.map(|n| n.max(1)), span, _marker: PhantomData }
  }
}

impl<S: Clone, Item, C, SD: Clone> Clone for ChunkOp<S, Item, C, SD> {
  fn clone(&self) -> Self { ChunkOp::new(self.source.clone(), self.count, self.span.clone()) }
}

/// Chunks on the emissions of a boundary observable.
pub struct ChunkBoundaryOp<S, Item, C, B, BItem> {
  source: S,
  boundary: B,
  _marker: PhantomData<fn(Item, BItem) -> C>,
}

impl<S, Item, C, B, BItem> ChunkBoundaryOp<S, Item, C, B, BItem> {
  pub(crate) fn new(source: S, boundary: B) -> Self {
    ChunkBoundaryOp { source, boundary, _marker: PhantomData }
  }
}

impl<S: Clone, Item, C, B: Clone, BItem> Clone for ChunkBoundaryOp<S, Item, C, B, BItem> {
  fn clone(&self) -> Self { ChunkBoundaryOp::new(self.source.clone(), self.boundary.clone()) }
}

struct ChunkState<C> {
  chunk: Option<C>,
  count: usize,
  generation: usize,
}

struct ChunkCore<Item, C, Err, O, W> {
  state: MutArc<ChunkState<C>>,
  down: SynchronizedObserver<C, Err, Subscriber<O>>,
  max_count: Option<usize>,
  span: Option<(Duration, W)>,
  timer: SerialSubscription,
  _item: PhantomData<fn(Item)>,
}

impl<Item, C, Err, O, W: Clone> Clone for ChunkCore<Item, C, Err, O, W> {
  fn clone(&self) -> Self {
    ChunkCore {
      state: self.state.clone(),
      down: self.down.clone(),
      max_count: self.max_count,
      span: self.span.clone(),
      timer: self.timer.clone(),
      _item: PhantomData,
    }
  }
}

impl<Item, C, Err, O, W> ChunkCore<Item, C, Err, O, W>
where
  Item: 'static,
  C: Chunk<Item, Err>,
  Err: Send + 'static,
  O: Observer<C, Err> + Send + 'static,
  W: Worker,
{
  fn new(subscriber: Subscriber<O>, max_count: Option<usize>, span: Option<(Duration, W)>) -> Self {
    let timer = SerialSubscription::new();
    subscriber.add(timer.clone());
    ChunkCore {
      state: MutArc::own(ChunkState { chunk: None, count: 0, generation: 0 }),
      down: SynchronizedObserver::new(subscriber),
      max_count,
      span,
      timer,
      _item: PhantomData,
    }
  }

  /// Opens the first chunk.
  fn start(&self) {
    {
      let mut state = self.state.rc_deref_mut();
      let chunk = C::open();
      if let Some(opened) = chunk.on_open() {
        self.down.enqueue(Notification::Next(opened));
      }
      state.chunk = Some(chunk);
    }
    self.down.drain();
    self.arm(0);
  }

  /// Closes the open chunk and opens the next one, returning the new
  /// generation. Called with the state locked.
  fn rotate(&self, state: &mut ChunkState<C>) -> usize {
    if let Some(closed) = state.chunk.replace(C::open()).and_then(C::close) {
      self.down.enqueue(Notification::Next(closed));
    }
    if let Some(opened) = state.chunk.as_ref().and_then(C::on_open) {
      self.down.enqueue(Notification::Next(opened));
    }
    state.count = 0;
    state.generation += 1;
    state.generation
  }

  /// Starts the span timer of the chunk opened as `generation`.
  fn arm(&self, generation: usize) {
    let Some((span, worker)) = &self.span else { return };
    let core = self.clone();
    let handle = worker.schedule_after(move || core.on_span_end(generation), *span);
    self.timer.set(handle);
  }

  fn on_span_end(&self, generation: usize) {
    let next = {
      let mut state = self.state.rc_deref_mut();
      if state.chunk.is_none() || state.generation != generation {
        return;
      }
      self.rotate(&mut state)
    };
    self.arm(next);
    self.down.drain();
  }

  fn push(&self, value: Item) {
    let rotated = {
      let mut state = self.state.rc_deref_mut();
      let Some(chunk) = state.chunk.as_mut() else { return };
      chunk.push(value);
      state.count += 1;
      match self.max_count {
        Some(max) if state.count >= max => Some(self.rotate(&mut state)),
        _ => None,
      }
    };
    if let Some(generation) = rotated {
      self.arm(generation);
    }
    self.down.drain();
  }

  fn on_boundary(&self) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.chunk.is_none() {
        return;
      }
      self.rotate(&mut state);
    }
    self.down.drain();
  }

  fn finish(&self, terminal: Notification<C, Err>) {
    {
      let mut state = self.state.rc_deref_mut();
      let Some(chunk) = state.chunk.take() else { return };
      match &terminal {
        Notification::Error(err) => chunk.fail(err),
        _ => {
          if let Some(closed) = chunk.close() {
            self.down.enqueue(Notification::Next(closed));
          }
        }
      }
      self.down.enqueue(terminal);
    }
    self.down.drain();
  }
}

struct SourceObserver<Item, C, Err, O, W>(ChunkCore<Item, C, Err, O, W>);

impl<Item, C, Err, O, W> Observer<Item, Err> for SourceObserver<Item, C, Err, O, W>
where
  Item: 'static,
  C: Chunk<Item, Err>,
  Err: Send + 'static,
  O: Observer<C, Err> + Send + 'static,
  W: Worker,
{
  #[inline]
  fn next(&mut self, value: Item) { self.0.push(value) }

  #[inline]
  fn error(&mut self, err: Err) { self.0.finish(Notification::Error(err)) }

  #[inline]
  fn complete(&mut self) { self.0.finish(Notification::Completed) }

  #[inline]
  fn is_finished(&self) -> bool { self.0.down.is_finished() }
}

struct BoundaryObserver<Item, C, Err, O, W>(ChunkCore<Item, C, Err, O, W>);

impl<Item, C, Err, O, W, BItem> Observer<BItem, Err> for BoundaryObserver<Item, C, Err, O, W>
where
  Item: 'static,
  C: Chunk<Item, Err>,
  Err: Send + 'static,
  O: Observer<C, Err> + Send + 'static,
  W: Worker,
{
  #[inline]
  fn next(&mut self, _: BItem) { self.0.on_boundary() }

  #[inline]
  fn error(&mut self, err: Err) { self.0.finish(Notification::Error(err)) }

  #[inline]
  fn complete(&mut self) { self.0.finish(Notification::Completed) }

  #[inline]
  fn is_finished(&self) -> bool { self.0.down.is_finished() }
}

impl<S, C, SD, Item, Err> Observable<C, Err> for ChunkOp<S, Item, C, SD>
where
  S: Observable<Item, Err>,
  C: Chunk<Item, Err>,
  SD: Scheduler,
  Item: 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<C, Err> + Send + 'static,
  {
    let span = self.span.map(|(span, scheduler)| {
      let worker = scheduler.create_worker();
      subscriber.add(worker.clone());
      (span, worker)
    });
    let source_token = CompositeSubscription::new();
    subscriber.add(source_token.clone());
    let core = ChunkCore::new(subscriber, self.count, span);
    core.start();
    self
      .source
      .actual_subscribe(Subscriber::new(SourceObserver(core), source_token));
  }
}

impl<S, C, B, BItem, Item, Err> Observable<C, Err> for ChunkBoundaryOp<S, Item, C, B, BItem>
where
  S: Observable<Item, Err>,
  B: Observable<BItem, Err>,
  C: Chunk<Item, Err>,
  Item: 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<C, Err> + Send + 'static,
  {
    let boundary_token = CompositeSubscription::new();
    let source_token = CompositeSubscription::new();
    subscriber.add(boundary_token.clone());
    subscriber.add(source_token.clone());
    let core: ChunkCore<Item, C, Err, O, ImmediateWorker> = ChunkCore::new(subscriber, None, None);
    core.start();
    self
      .boundary
      .actual_subscribe(Subscriber::new(BoundaryObserver(core.clone()), boundary_token));
    self
      .source
      .actual_subscribe(Subscriber::new(SourceObserver(core), source_token));
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  fn ms(n: u64) -> Duration { Duration::from_millis(n) }

  #[test]
  fn count_buffers_and_partial_tail() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    observable::from_iter(1..=5)
      .buffer_count(2)
      .subscribe(move |b| c_got.lock().unwrap().push(b));
    assert_eq!(*got.lock().unwrap(), vec![vec![1, 2], vec![3, 4], vec![5]]);
  }

  #[test]
  fn time_buffers_skip_empty_spans() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    source
      .clone()
      .buffer_time(ms(100), scheduler.clone())
      .subscribe(move |b| c_got.lock().unwrap().push(b));

    source.next(1);
    source.next(2);
    scheduler.advance_to(ms(100));
    scheduler.advance_to(ms(200));
    source.next(3);
    scheduler.advance_to(ms(300));
    assert_eq!(*got.lock().unwrap(), vec![vec![1, 2], vec![3]]);
  }

  #[test]
  fn count_restarts_the_span() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let got = Arc::new(Mutex::new(vec![]));
    let (c_got, clock) = (got.clone(), scheduler.clone());
    source
      .clone()
      .buffer_time_count(ms(100), 2, scheduler.clone())
      .subscribe(move |b| c_got.lock().unwrap().push((b, clock.elapsed())));

    scheduler.advance_to(ms(60));
    source.next(1);
    source.next(2);
    source.next(3);
    // The span of the chunk holding 3 started at 60.
    scheduler.advance_to(ms(100));
    assert_eq!(got.lock().unwrap().len(), 1);
    scheduler.advance_to(ms(160));
    assert_eq!(*got.lock().unwrap(), vec![(vec![1, 2], ms(60)), (vec![3], ms(160))]);
  }

  #[test]
  fn boundary_buffers() {
    let mut source = Subject::<i32, ()>::new();
    let mut boundary = Subject::<(), ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    source.clone().buffer(boundary.clone()).subscribe_all(
      move |b| n.lock().unwrap().push(format!("{b:?}")),
      |_| {},
      move || c.lock().unwrap().push("done".to_owned()),
    );
    source.next(1);
    source.next(2);
    boundary.next(());
    boundary.next(());
    source.next(3);
    source.complete();
    assert_eq!(*log.lock().unwrap(), vec!["[1, 2]", "[3]", "done"]);
    assert_eq!(boundary.observer_count(), 0);
  }

  #[test]
  fn error_drops_the_open_buffer() {
    let mut source = Subject::<i32, &'static str>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, e) = (log.clone(), log.clone());
    source.clone().buffer_count(3).subscribe_err(
      move |b| n.lock().unwrap().push(format!("{b:?}")),
      move |err| e.lock().unwrap().push(err.to_owned()),
    );
    source.next(1);
    source.error("boom");
    assert_eq!(*log.lock().unwrap(), vec!["boom"]);
  }

  /// Subscribes to every emitted window and logs its events tagged with the
  /// window's index.
  fn log_windows<S, E>(windows: S) -> Arc<Mutex<Vec<String>>>
  where
    S: Observable<Subject<i32, E>, E>,
    E: Clone + std::fmt::Debug + Send + 'static,
  {
    let log = Arc::new(Mutex::new(vec![]));
    let (c_log, counter) = (log.clone(), Arc::new(Mutex::new(0)));
    windows.subscribe(move |window: Subject<i32, E>| {
      let index = {
        let mut counter = counter.lock().unwrap();
        *counter += 1;
        *counter
      };
      let (n, c) = (c_log.clone(), c_log.clone());
      c_log.lock().unwrap().push(format!("open {index}"));
      window.subscribe_all(
        move |v| n.lock().unwrap().push(format!("{index}: {v}")),
        |_| {},
        move || c.lock().unwrap().push(format!("close {index}")),
      );
    });
    log
  }

  #[test]
  fn count_windows() {
    let log = log_windows(observable::from_iter(1..=3).window_count(2));
    assert_eq!(
      *log.lock().unwrap(),
      vec!["open 1", "1: 1", "1: 2", "close 1", "open 2", "2: 3", "close 2"]
    );
  }

  #[test]
  fn time_windows() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let log = log_windows(source.clone().window_time(ms(100), scheduler.clone()));
    source.next(1);
    scheduler.advance_to(ms(100));
    source.next(2);
    assert_eq!(*log.lock().unwrap(), vec!["open 1", "1: 1", "close 1", "open 2", "2: 2"]);
  }

  #[test]
  fn boundary_windows() {
    let mut source = Subject::<i32, ()>::new();
    let mut boundary = Subject::<u8, ()>::new();
    let log = log_windows(source.clone().window(boundary.clone()));
    source.next(1);
    boundary.next(0);
    source.complete();
    assert_eq!(*log.lock().unwrap(), vec!["open 1", "1: 1", "close 1", "open 2", "close 2"]);
  }
}
