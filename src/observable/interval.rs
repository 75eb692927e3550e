use std::{convert::Infallible, time::Duration};

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
};

/// Creates an observable which emits `0, 1, 2, ...` every `period`, starting
/// one `period` after subscription.
pub fn interval<SD: Scheduler>(period: Duration, scheduler: SD) -> IntervalObservable<SD> {
  IntervalObservable { scheduler, period, initial_delay: period }
}

/// Like [`interval`], but the first value is emitted after `initial_delay`.
pub fn interval_at<SD: Scheduler>(
  initial_delay: Duration, period: Duration, scheduler: SD,
) -> IntervalObservable<SD> {
  IntervalObservable { scheduler, period, initial_delay }
}

#[derive(Clone)]
pub struct IntervalObservable<SD> {
  scheduler: SD,
  period: Duration,
  initial_delay: Duration,
}

impl<SD: Scheduler> Observable<usize, Infallible> for IntervalObservable<SD> {
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<usize, Infallible> + Send + 'static,
  {
    let Self { scheduler, period, initial_delay } = self;
    let worker = scheduler.create_worker();
    subscriber.add(worker.clone());
    let mut observer = subscriber;
    let mut seq = 0;
    worker.schedule_periodically(
      move || {
        observer.next(seq);
        seq += 1;
      },
      initial_delay,
      period,
    );
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::{prelude::*, scheduler::TestScheduler};

  #[test]
  fn ticks_on_virtual_time() {
    let scheduler = TestScheduler::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let mut subscription = interval(Duration::from_millis(10), scheduler.clone())
      .subscribe(move |v| c_got.lock().unwrap().push(v));

    scheduler.advance_by(Duration::from_millis(9));
    assert!(got.lock().unwrap().is_empty());
    scheduler.advance_by(Duration::from_millis(21));
    assert_eq!(*got.lock().unwrap(), vec![0, 1, 2]);

    subscription.unsubscribe();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(got.lock().unwrap().len(), 3);
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[test]
  fn first_tick_after_initial_delay() {
    let scheduler = TestScheduler::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let _guard = interval_at(Duration::ZERO, Duration::from_millis(50), scheduler.clone())
      .subscribe(move |v| c_got.lock().unwrap().push(v))
      .unsubscribe_when_dropped();
    scheduler.trigger_actions();
    assert_eq!(*got.lock().unwrap(), vec![0]);
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(*got.lock().unwrap(), vec![0, 1, 2]);
  }

  #[cfg(feature = "futures-scheduler")]
  #[test]
  fn ticks_on_a_thread() {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut subscription = interval(Duration::from_millis(1), crate::scheduler::new_thread())
      .subscribe(move |v| {
        let _ = tx.send(v);
      });
    let got: Vec<_> = (0..5)
      .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
      .collect();
    subscription.unsubscribe();
    assert_eq!(got, vec![0, 1, 2, 3, 4]);
  }
}
