use std::{thread, time::Duration};

use super::{Scheduler, TaskHandle, Worker};
use crate::subscription::{CompositeSubscription, SubscriptionLike};

/// Runs actions synchronously on the thread that schedules them. A delay
/// blocks the caller, and a periodic action loops on the caller until it is
/// cancelled (from inside the action or from another thread).
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  type Worker = ImmediateWorker;

  fn create_worker(&self) -> ImmediateWorker { ImmediateWorker::default() }
}

#[derive(Clone, Debug, Default)]
pub struct ImmediateWorker {
  tasks: CompositeSubscription,
}

impl ImmediateWorker {
  fn register(&self) -> TaskHandle {
    let handle = TaskHandle::new();
    self.tasks.add(handle.clone());
    handle
  }
}

impl Worker for ImmediateWorker {
  fn schedule_after<F>(&self, action: F, delay: Duration) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = self.register();
    if !delay.is_zero() && !handle.is_closed() {
      thread::sleep(delay);
    }
    if !handle.is_closed() {
      action();
    }
    handle.finish();
    handle
  }

  fn schedule_periodically<F>(
    &self, mut action: F, initial_delay: Duration, period: Duration,
  ) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    let handle = self.register();
    let mut delay = initial_delay;
    loop {
      if !delay.is_zero() {
        thread::sleep(delay);
      }
      if handle.is_closed() {
        break;
      }
      action();
      delay = period;
    }
    handle
  }
}

impl SubscriptionLike for ImmediateWorker {
  #[inline]
  fn unsubscribe(&mut self) { self.tasks.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.tasks.is_closed() }
}
