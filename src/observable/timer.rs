use std::{convert::Infallible, time::Duration};

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
};

/// Returns an observable which emits `0` once after `delay`, then completes.
pub fn timer<SD: Scheduler>(delay: Duration, scheduler: SD) -> TimerObservable<SD> {
  TimerObservable { delay, scheduler }
}

#[derive(Clone)]
pub struct TimerObservable<SD> {
  delay: Duration,
  scheduler: SD,
}

impl<SD: Scheduler> Observable<usize, Infallible> for TimerObservable<SD> {
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<usize, Infallible> + Send + 'static,
  {
    let worker = self.scheduler.create_worker();
    subscriber.add(worker.clone());
    let mut observer = subscriber;
    worker.schedule_after(
      move || {
        observer.next(0);
        observer.complete();
      },
      self.delay,
    );
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::{prelude::*, scheduler::TestScheduler};

  #[test]
  fn fires_once_after_delay() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    let subscription = timer(Duration::from_millis(100), scheduler.clone()).subscribe_all(
      move |v| n.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || c.lock().unwrap().push("complete".to_owned()),
    );
    scheduler.advance_by(Duration::from_millis(99));
    assert!(log.lock().unwrap().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(*log.lock().unwrap(), vec!["next 0", "complete"]);
    assert!(subscription.is_closed());
  }

  #[test]
  fn cancelled_before_due() {
    let scheduler = TestScheduler::new();
    let fired = Arc::new(Mutex::new(false));
    let c_fired = fired.clone();
    let mut subscription = timer(Duration::from_millis(100), scheduler.clone())
      .subscribe(move |_| *c_fired.lock().unwrap() = true);
    subscription.unsubscribe();
    scheduler.advance_by(Duration::from_millis(200));
    assert!(!*fired.lock().unwrap());
  }

  #[test]
  fn immediate_scheduler_blocks_until_due() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let start = std::time::Instant::now();
    timer(Duration::from_millis(20), crate::scheduler::immediate())
      .subscribe(move |v| c_got.lock().unwrap().push(v));
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(*got.lock().unwrap(), vec![0]);
  }
}
