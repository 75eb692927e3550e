use std::time::Duration;

use crate::{
  notification::Notification,
  observable::Observable,
  observer::{Observer, SynchronizedObserver},
  rc::{MutArc, RcDerefMut},
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SerialSubscription},
};

/// Emits an item only once `timeout` passed without a newer one. A terminal
/// event flushes the held item before it is forwarded.
#[derive(Clone)]
pub struct DebounceOp<S, SD> {
  source: S,
  timeout: Duration,
  scheduler: SD,
}

impl<S, SD> DebounceOp<S, SD> {
  pub(crate) fn new(source: S, timeout: Duration, scheduler: SD) -> Self {
    DebounceOp { source, timeout, scheduler }
  }
}

/// The held item, tagged with its arrival index so a timer that lost the race
/// against a newer item does nothing.
struct Trailing<Item> {
  value: Option<Item>,
  index: usize,
}

struct DebounceObserver<Item, Err, O, W> {
  down: SynchronizedObserver<Item, Err, Subscriber<O>>,
  trailing: MutArc<Trailing<Item>>,
  worker: W,
  timer: SerialSubscription,
  timeout: Duration,
}

impl<Item, Err, O, W> DebounceObserver<Item, Err, O, W>
where
  O: Observer<Item, Err>,
{
  /// Enqueues the held item, if any, followed by `terminal`.
  fn flush_then(&mut self, terminal: Notification<Item, Err>) {
    {
      let mut trailing = self.trailing.rc_deref_mut();
      if let Some(value) = trailing.value.take() {
        self.down.enqueue(Notification::Next(value));
      }
      self.down.enqueue(terminal);
    }
    self.down.drain();
  }
}

impl<Item, Err, O, W> Observer<Item, Err> for DebounceObserver<Item, Err, O, W>
where
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    let index = {
      let mut trailing = self.trailing.rc_deref_mut();
      trailing.index += 1;
      trailing.value = Some(value);
      trailing.index
    };
    let trailing = self.trailing.clone();
    let down = self.down.clone();
    let handle = self.worker.schedule_after(
      move || {
        {
          let mut trailing = trailing.rc_deref_mut();
          if trailing.index != index {
            return;
          }
          match trailing.value.take() {
            Some(value) => down.enqueue(Notification::Next(value)),
            None => return,
          };
        }
        down.drain();
      },
      self.timeout,
    );
    self.timer.set(handle);
  }

  fn error(&mut self, err: Err) { self.flush_then(Notification::Error(err)) }

  fn complete(&mut self) { self.flush_then(Notification::Completed) }

  #[inline]
  fn is_finished(&self) -> bool { self.down.is_finished() }
}

impl<S, SD, Item, Err> Observable<Item, Err> for DebounceOp<S, SD>
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
    let timer = SerialSubscription::new();
    subscriber.add(worker.clone());
    subscriber.add(timer.clone());
    let source_token = CompositeSubscription::new();
    subscriber.add(source_token.clone());
    let observer = DebounceObserver {
      down: SynchronizedObserver::new(subscriber),
      trailing: MutArc::own(Trailing { value: None, index: 0 }),
      worker,
      timer,
      timeout: self.timeout,
    };
    self
      .source
      .actual_subscribe(Subscriber::new(observer, source_token));
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  fn ms(n: u64) -> Duration { Duration::from_millis(n) }

  #[test]
  fn emits_after_quiet_period() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<char, ()>::new();
    let got = Arc::new(Mutex::new(vec![]));
    let (c_got, clock) = (got.clone(), scheduler.clone());
    source
      .clone()
      .debounce(ms(100), scheduler.clone())
      .subscribe(move |v| c_got.lock().unwrap().push((v, clock.elapsed())));

    source.next('a');
    scheduler.advance_to(ms(50));
    source.next('b');
    scheduler.advance_to(ms(260));
    source.next('c');
    scheduler.advance_to(ms(1000));

    assert_eq!(*got.lock().unwrap(), vec![('b', ms(150)), ('c', ms(360))]);
  }

  #[test]
  fn completion_flushes_the_held_item() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    source
      .clone()
      .debounce(ms(100), scheduler.clone())
      .subscribe_all(
        move |v| n.lock().unwrap().push(v.to_string()),
        |_| {},
        move || c.lock().unwrap().push("done".to_owned()),
      );
    source.next(1);
    source.next(2);
    source.complete();
    assert_eq!(*log.lock().unwrap(), vec!["2", "done"]);
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[test]
  fn error_flushes_the_held_item() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, &'static str>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, e) = (log.clone(), log.clone());
    source
      .clone()
      .debounce(ms(100), scheduler)
      .subscribe_err(
        move |v| n.lock().unwrap().push(v.to_string()),
        move |err| e.lock().unwrap().push(err.to_owned()),
      );
    source.next(1);
    source.error("boom");
    assert_eq!(*log.lock().unwrap(), vec!["1", "boom"]);
  }

  #[test]
  fn unsubscribe_cancels_the_timer() {
    let scheduler = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let mut subscription = source
      .clone()
      .debounce(ms(100), scheduler.clone())
      .subscribe(move |v| c_got.lock().unwrap().push(v));
    source.next(1);
    subscription.unsubscribe();
    scheduler.advance_by(ms(200));
    assert!(got.lock().unwrap().is_empty());
    assert_eq!(source.observer_count(), 0);
  }
}
