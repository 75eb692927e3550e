use std::{
  cell::{Cell, RefCell},
  cmp::Ordering,
  collections::BinaryHeap,
  thread,
  time::{Duration, Instant},
};

use super::{Scheduler, TaskHandle, Worker};
use crate::subscription::{CompositeSubscription, SubscriptionLike};

/// Queues actions on the current thread instead of running them nested.
///
/// The first schedule call on a thread becomes the drainer: it runs queued
/// actions ordered by due time, then by insertion, until the queue is empty.
/// Actions scheduled from inside a running action are only queued, so deep
/// resubscription chains (retry, repeat) never grow the stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrampolineScheduler;

impl Scheduler for TrampolineScheduler {
  type Worker = TrampolineWorker;

  fn create_worker(&self) -> TrampolineWorker { TrampolineWorker::default() }
}

#[derive(Clone, Debug, Default)]
pub struct TrampolineWorker {
  tasks: CompositeSubscription,
}

enum Job {
  Once(Box<dyn FnOnce()>),
  Periodic(Box<dyn FnMut()>, Duration),
}

struct Queued {
  due: Instant,
  seq: usize,
  job: Job,
  handle: TaskHandle,
}

impl PartialEq for Queued {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Queued {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier due first, then FIFO.
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

thread_local! {
  static QUEUE: RefCell<BinaryHeap<Queued>> = RefCell::new(BinaryHeap::new());
  static SEQ: Cell<usize> = const { Cell::new(0) };
  static DRAINING: Cell<bool> = const { Cell::new(false) };
}

fn push(due: Instant, job: Job, handle: TaskHandle) {
  let seq = SEQ.with(|s| {
    let seq = s.get();
    s.set(seq.wrapping_add(1));
    seq
  });
  QUEUE.with(|q| q.borrow_mut().push(Queued { due, seq, job, handle }));
}

/// Resets the drainer flag even when an action unwinds. Actions queued behind
/// the panicking one are dropped with it.
struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) {
    if thread::panicking() {
      QUEUE.with(|q| q.borrow_mut().clear());
    }
    DRAINING.with(|d| d.set(false));
  }
}

fn drain() {
  if DRAINING.with(|d| d.replace(true)) {
    return;
  }
  let _guard = DrainGuard;
  while let Some(Queued { due, job, handle, .. }) = QUEUE.with(|q| q.borrow_mut().pop()) {
    let now = Instant::now();
    if due > now {
      thread::sleep(due - now);
    }
    if handle.is_closed() {
      continue;
    }
    match job {
      Job::Once(action) => {
        action();
        handle.finish();
      }
      Job::Periodic(mut action, period) => {
        action();
        if !handle.is_closed() {
          push(due + period, Job::Periodic(action, period), handle);
        }
      }
    }
  }
}

impl TrampolineWorker {
  fn enqueue(&self, job: Job, delay: Duration) -> TaskHandle {
    let handle = TaskHandle::new();
    self.tasks.add(handle.clone());
    if !handle.is_closed() {
      push(Instant::now() + delay, job, handle.clone());
      drain();
    }
    handle
  }
}

impl Worker for TrampolineWorker {
  fn schedule_after<F>(&self, action: F, delay: Duration) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.enqueue(Job::Once(Box::new(action)), delay)
  }

  fn schedule_periodically<F>(
    &self, action: F, initial_delay: Duration, period: Duration,
  ) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    self.enqueue(Job::Periodic(Box::new(action), period), initial_delay)
  }
}

impl SubscriptionLike for TrampolineWorker {
  #[inline]
  fn unsubscribe(&mut self) { self.tasks.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.tasks.is_closed() }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn nested_schedule_runs_after_current_action() {
    let log = Arc::new(Mutex::new(vec![]));
    let worker = TrampolineScheduler.create_worker();
    let (c_log, c_worker) = (log.clone(), worker.clone());
    worker.schedule(move || {
      c_log.lock().unwrap().push("outer start");
      let inner_log = c_log.clone();
      c_worker.schedule(move || inner_log.lock().unwrap().push("inner"));
      c_log.lock().unwrap().push("outer end");
    });
    assert_eq!(*log.lock().unwrap(), vec!["outer start", "outer end", "inner"]);
  }

  #[test]
  fn ordered_by_due_time_then_insertion() {
    let log = Arc::new(Mutex::new(vec![]));
    let worker = TrampolineScheduler.create_worker();
    let (c_log, c_worker) = (log.clone(), worker.clone());
    worker.schedule(move || {
      let (a, b, c) = (c_log.clone(), c_log.clone(), c_log.clone());
      c_worker.schedule_after(move || a.lock().unwrap().push(3), Duration::from_millis(10));
      c_worker.schedule(move || b.lock().unwrap().push(1));
      c_worker.schedule(move || c.lock().unwrap().push(2));
    });
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
  }

  #[test]
  fn periodic_until_cancelled() {
    let count = Arc::new(Mutex::new(0));
    let worker = TrampolineScheduler.create_worker();
    let c_count = count.clone();
    let mut c_worker = worker.clone();
    worker.schedule_periodically(
      move || {
        let mut count = c_count.lock().unwrap();
        *count += 1;
        if *count == 4 {
          c_worker.unsubscribe();
        }
      },
      Duration::ZERO,
      Duration::from_millis(1),
    );
    assert_eq!(*count.lock().unwrap(), 4);
  }

  #[test]
  fn cancelled_task_is_skipped() {
    let log = Arc::new(Mutex::new(vec![]));
    let worker = TrampolineScheduler.create_worker();
    let (c_log, c_worker) = (log.clone(), worker.clone());
    worker.schedule(move || {
      let skipped = c_log.clone();
      let mut handle = c_worker.schedule(move || skipped.lock().unwrap().push("skipped"));
      handle.unsubscribe();
      c_log.lock().unwrap().push("outer");
    });
    assert_eq!(*log.lock().unwrap(), vec!["outer"]);
  }
}
