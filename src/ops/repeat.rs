use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SerialSubscription},
};

/// Resubscribes the source each time it completes. `count` is the total
/// number of runs; `None` repeats until unsubscribed.
#[derive(Clone)]
pub struct RepeatOp<S, SD> {
  source: S,
  count: Option<usize>,
  scheduler: SD,
}

impl<S, SD> RepeatOp<S, SD> {
  pub(crate) fn new(source: S, count: Option<usize>, scheduler: SD) -> Self {
    RepeatOp { source, count, scheduler }
  }
}

struct RepeatObserver<S, W, O> {
  down: Option<Subscriber<O>>,
  source: S,
  worker: W,
  serial: SerialSubscription,
  remaining: Option<usize>,
}

impl<S, W, O> RepeatObserver<S, W, O> {
  fn subscribe_run<Item, Err>(self)
  where
    Self: Observer<Item, Err> + Send + 'static,
    S: Observable<Item, Err> + Clone,
  {
    let token = CompositeSubscription::new();
    self.serial.set(token.clone());
    let source = self.source.clone();
    source.actual_subscribe(Subscriber::new(self, token));
  }
}

impl<S, W, O, Item, Err> Observer<Item, Err> for RepeatObserver<S, W, O>
where
  S: Observable<Item, Err> + Clone + Send + 'static,
  W: Worker,
  O: Observer<Item, Err> + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if let Some(down) = self.down.as_mut() {
      down.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut down) = self.down.take() {
      down.error(err);
    }
  }

  fn complete(&mut self) {
    let Some(mut down) = self.down.take() else { return };
    let remaining = self.remaining.map(|n| n.saturating_sub(1));
    if remaining == Some(0) {
      down.complete();
      return;
    }
    let next = RepeatObserver {
      down: Some(down),
      source: self.source.clone(),
      worker: self.worker.clone(),
      serial: self.serial.clone(),
      remaining,
    };
    tracing::trace!(?remaining, "source completed, repeating");
    self
      .worker
      .schedule(move || next.subscribe_run::<Item, Err>());
  }

  fn is_finished(&self) -> bool { self.down.as_ref().map_or(true, |d| d.is_finished()) }
}

impl<S, SD, Item, Err> Observable<Item, Err> for RepeatOp<S, SD>
where
  S: Observable<Item, Err> + Clone + Send + 'static,
  SD: Scheduler,
{
  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    if self.count == Some(0) {
      subscriber.complete();
      return;
    }
    let worker = self.scheduler.create_worker();
    let serial = SerialSubscription::new();
    subscriber.add(worker.clone());
    subscriber.add(serial.clone());
    RepeatObserver {
      down: Some(subscriber),
      source: self.source,
      worker,
      serial,
      remaining: self.count,
    }
    .subscribe_run::<Item, Err>()
  }
}
