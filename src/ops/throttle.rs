use std::time::{Duration, Instant};

use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  scheduler::Scheduler,
  subscriber::Subscriber,
};

/// Emits an item, then drops every item arriving within `window` of it, as
/// measured on the scheduler clock.
#[derive(Clone)]
pub struct ThrottleFirstOp<S, SD> {
  source: S,
  window: Duration,
  scheduler: SD,
}

impl<S, SD> ThrottleFirstOp<S, SD> {
  pub(crate) fn new(source: S, window: Duration, scheduler: SD) -> Self {
    ThrottleFirstOp { source, window, scheduler }
  }
}

struct ThrottleFirstObserver<O, SD> {
  down: Subscriber<O>,
  scheduler: SD,
  window: Duration,
  last_emit: Option<Instant>,
}

impl<Item, Err, O, SD> Observer<Item, Err> for ThrottleFirstObserver<O, SD>
where
  O: Observer<Item, Err>,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    let now = self.scheduler.now();
    let open = self
      .last_emit
      .map_or(true, |last| now.saturating_duration_since(last) >= self.window);
    if open {
      self.last_emit = Some(now);
      self.down.next(value);
    }
  }

  #[inline]
  fn error(&mut self, err: Err) { self.down.error(err) }

  #[inline]
  fn complete(&mut self) { self.down.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.down.is_finished() }
}

impl<S, SD, Item, Err> Observable<Item, Err> for ThrottleFirstOp<S, SD>
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
    let Self { source, window, scheduler } = self;
    source
      .lift(move |down: Subscriber<BoxObserver<Item, Err>>| ThrottleFirstObserver {
        down,
        scheduler,
        window,
        last_emit: None,
      })
      .actual_subscribe(subscriber)
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  #[test]
  fn drops_items_inside_the_window() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    source
      .clone()
      .throttle_first(Duration::from_millis(100), scheduler.clone())
      .subscribe(move |v| c_got.lock().unwrap().push(v));

    source.next(1);
    scheduler.advance_to(Duration::from_millis(50));
    source.next(2);
    scheduler.advance_to(Duration::from_millis(99));
    source.next(3);
    scheduler.advance_to(Duration::from_millis(100));
    source.next(4);
    scheduler.advance_to(Duration::from_millis(150));
    source.next(5);
    scheduler.advance_to(Duration::from_millis(250));
    source.next(6);

    assert_eq!(*got.lock().unwrap(), vec![1, 4, 6]);
  }
}
