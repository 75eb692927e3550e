use std::collections::VecDeque;

use super::{ContractSafe, Observer};
use crate::{
  notification::Notification,
  rc::{MutArc, RcDeref, RcDerefMut},
};

/// Serializes events coming from any number of threads into one observer.
///
/// Every event is queued under a lock. The caller that finds nobody draining
/// becomes the drainer and delivers the queue in FIFO order outside the lock
/// until it is empty; every other caller returns immediately, so a reentrant
/// or concurrent call never blocks and never overlaps a delivery. Clones share
/// the same lock, queue and observer.
pub struct SynchronizedObserver<Item, Err, O>(MutArc<SyncState<Item, Err, O>>);

struct SyncState<Item, Err, O> {
  observer: Option<O>,
  queue: VecDeque<Notification<Item, Err>>,
  emitting: bool,
  done: bool,
}

impl<Item, Err, O> Clone for SynchronizedObserver<Item, Err, O> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item, Err, O> SynchronizedObserver<Item, Err, O>
where
  O: Observer<Item, Err>,
{
  pub fn new(observer: O) -> Self {
    SynchronizedObserver(MutArc::own(SyncState {
      observer: Some(observer),
      queue: VecDeque::new(),
      emitting: false,
      done: false,
    }))
  }

  /// Queues `notification` without delivering it. Returns `false` if a
  /// terminal event was already accepted.
  ///
  /// Operators call it while holding their own state lock to fix the order of
  /// emissions, then call [`drain`](Self::drain) after releasing it.
  pub fn enqueue(&self, notification: Notification<Item, Err>) -> bool {
    let mut state = self.0.rc_deref_mut();
    if state.done {
      return false;
    }
    state.done = notification.is_terminal();
    state.queue.push_back(notification);
    true
  }

  /// Delivers queued events unless another caller is already doing so.
  ///
  /// If a delivery panics, the observer is handed back and events queued
  /// behind the panicking one stay queued for the next drain.
  pub fn drain(&self) {
    let observer = {
      let mut state = self.0.rc_deref_mut();
      if state.emitting || state.queue.is_empty() {
        return;
      }
      match state.observer.take() {
        Some(observer) => {
          state.emitting = true;
          observer
        }
        None => {
          state.queue.clear();
          return;
        }
      }
    };
    let mut delivery = Delivery { state: &self.0, observer: Some(observer), finished: false };

    loop {
      let next = self.0.rc_deref_mut().queue.pop_front();
      let Some(notification) = next else { return };
      let Some(observer) = delivery.observer.as_mut() else { return };
      let terminal = notification.is_terminal();
      notification.accept(observer);
      if terminal || observer.is_finished() {
        delivery.finished = true;
        return;
      }
    }
  }

  #[inline]
  fn emit(&self, notification: Notification<Item, Err>) {
    if self.enqueue(notification) {
      self.drain();
    }
  }
}

impl<Item, Err, O> Observer<Item, Err> for SynchronizedObserver<Item, Err, O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.emit(Notification::Next(value)) }

  #[inline]
  fn error(&mut self, err: Err) { self.emit(Notification::Error(err)) }

  #[inline]
  fn complete(&mut self) { self.emit(Notification::Completed) }

  #[inline]
  fn is_finished(&self) -> bool { self.0.rc_deref().done }
}

impl<Item, Err, O> ContractSafe for SynchronizedObserver<Item, Err, O> {}

/// Ends a drain, normally or while unwinding: releases the emitting flag and
/// either returns the observer or, after a terminal event, drops it.
struct Delivery<'a, Item, Err, O> {
  state: &'a MutArc<SyncState<Item, Err, O>>,
  observer: Option<O>,
  finished: bool,
}

impl<Item, Err, O> Drop for Delivery<'_, Item, Err, O> {
  fn drop(&mut self) {
    let mut state = self.state.rc_deref_mut();
    state.emitting = false;
    if self.finished {
      state.done = true;
      state.queue.clear();
    } else {
      state.observer = self.observer.take();
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observer::{BoxObserver, ObserverAll};

  fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Observer<i32, &'static str> + Send) {
    let log = Arc::new(Mutex::new(vec![]));
    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    let observer = ObserverAll::new(
      move |v: i32| n.lock().unwrap().push(format!("{v}")),
      move |err: &'static str| e.lock().unwrap().push(err.to_owned()),
      move || c.lock().unwrap().push("done".to_owned()),
    );
    (log, observer)
  }

  #[test]
  fn nothing_after_terminal() {
    let (log, observer) = recorder();
    let mut sync = SynchronizedObserver::new(observer);
    sync.next(1);
    sync.complete();
    sync.next(2);
    sync.error("late");
    assert!(sync.is_finished());
    assert_eq!(*log.lock().unwrap(), vec!["1", "done"]);
  }

  #[test]
  fn enqueued_events_keep_their_order() {
    let (log, observer) = recorder();
    let sync = SynchronizedObserver::new(observer);
    assert!(sync.enqueue(Notification::Next(1)));
    assert!(sync.enqueue(Notification::Next(2)));
    assert!(log.lock().unwrap().is_empty());
    sync.drain();
    assert_eq!(*log.lock().unwrap(), vec!["1", "2"]);
  }

  #[test]
  fn reentrant_call_is_queued_not_nested() {
    let log = Arc::new(Mutex::new(vec![]));
    type Boxed = BoxObserver<i32, ()>;
    let slot: Arc<Mutex<Option<SynchronizedObserver<i32, (), Boxed>>>> = Arc::new(Mutex::new(None));
    let c_log = log.clone();
    let c_slot = slot.clone();
    let observer: Boxed = Box::new(ObserverAll::new(
      move |v: i32| {
        c_log.lock().unwrap().push(format!("enter {v}"));
        if v == 1 {
          let inner = c_slot.lock().unwrap().clone();
          if let Some(mut inner) = inner {
            inner.next(2);
          }
        }
        c_log.lock().unwrap().push(format!("exit {v}"));
      },
      |_: ()| {},
      || {},
    ));
    let mut sync = SynchronizedObserver::new(observer);
    *slot.lock().unwrap() = Some(sync.clone());
    sync.next(1);
    assert_eq!(*log.lock().unwrap(), vec!["enter 1", "exit 1", "enter 2", "exit 2"]);
    slot.lock().unwrap().take();
  }

  #[test]
  fn panicking_delivery_does_not_wedge_the_queue() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let observer = ObserverAll::new(
      move |v: i32| {
        if v == 2 {
          panic!("bad item");
        }
        c_log.lock().unwrap().push(format!("{v}"));
      },
      |_: ()| {},
      || {},
    );
    let mut sync = SynchronizedObserver::new(observer);
    sync.next(1);
    assert!(catch_unwind(AssertUnwindSafe(|| sync.clone().next(2))).is_err());
    sync.next(3);
    assert_eq!(*log.lock().unwrap(), vec!["1", "3"]);
  }

  #[test]
  fn panicking_error_handler_still_finishes() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let observer = ObserverAll::new(
      move |v: i32| c_log.lock().unwrap().push(format!("{v}")),
      |_: &'static str| panic!("handler failed"),
      || {},
    );
    let mut sync = SynchronizedObserver::new(observer);
    assert!(catch_unwind(AssertUnwindSafe(|| sync.clone().error("boom"))).is_err());
    sync.next(1);
    assert!(sync.is_finished());
    assert!(log.lock().unwrap().is_empty());
  }
}
