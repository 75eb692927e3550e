//! Test Scheduler for deterministic testing of time-based operators.
//!
//! Provides virtual time that only advances when explicitly instructed,
//! enabling deterministic testing of `debounce`, `interval`, `retry` delays
//! and friends.
//!
//! # Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rxflow::{prelude::*, scheduler::TestScheduler};
//!
//! let scheduler = TestScheduler::new();
//! let values = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
//! let c_values = values.clone();
//! observable::timer(Duration::from_millis(100), scheduler.clone())
//!   .subscribe(move |v| c_values.lock().unwrap().push(v));
//!
//! scheduler.advance_by(Duration::from_millis(99));
//! assert!(values.lock().unwrap().is_empty());
//! scheduler.advance_by(Duration::from_millis(1));
//! assert_eq!(*values.lock().unwrap(), vec![0]);
//! ```
//!
//! Every `TestScheduler::new()` owns an independent clock and queue; clones
//! share them. Actions run on the thread that advances the clock.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  time::{Duration, Instant},
};

use super::{Scheduler, TaskHandle, Worker};
use crate::{
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{CompositeSubscription, SubscriptionLike},
};

// ==================== Internal State ====================

struct TestSchedulerState {
  origin: Instant,
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
}

enum Job {
  Once(Box<dyn FnOnce() + Send>),
  Periodic(Box<dyn FnMut() + Send>, Duration),
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  job: Job,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

impl TestSchedulerState {
  fn push(&mut self, scheduled_time: Duration, job: Job, handle: TaskHandle) {
    let task_id = self.next_task_id;
    self.next_task_id += 1;
    self
      .task_queue
      .push(ScheduledTask { scheduled_time, task_id, job, handle });
  }
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
#[derive(Clone)]
pub struct TestScheduler(MutArc<TestSchedulerState>);

impl Default for TestScheduler {
  fn default() -> Self { Self::new() }
}

impl TestScheduler {
  pub fn new() -> Self {
    TestScheduler(MutArc::own(TestSchedulerState {
      origin: Instant::now(),
      virtual_time: Duration::ZERO,
      task_queue: BinaryHeap::new(),
      next_task_id: 0,
    }))
  }

  /// Virtual time elapsed since this scheduler was created.
  pub fn elapsed(&self) -> Duration { self.0.rc_deref().virtual_time }

  /// Number of queued actions that were not cancelled.
  pub fn pending_count(&self) -> usize {
    self
      .0
      .rc_deref()
      .task_queue
      .iter()
      .filter(|t| !t.handle.is_closed())
      .count()
  }

  /// Advance virtual time by the specified duration and execute due tasks.
  ///
  /// Tasks are executed in order of their scheduled time, with FIFO ordering
  /// for tasks scheduled at the same time.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.elapsed() + duration;
    self.advance_to(target);
  }

  /// Advance virtual time to `target` (measured from creation) and execute
  /// due tasks. Moving backwards only runs what is already due.
  pub fn advance_to(&self, target: Duration) {
    self.execute_tasks_until(Some(target));
    let mut state = self.0.rc_deref_mut();
    if state.virtual_time < target {
      state.virtual_time = target;
    }
  }

  /// Runs every action due at the current virtual time without moving it.
  pub fn trigger_actions(&self) {
    let now = self.elapsed();
    self.execute_tasks_until(Some(now));
  }

  /// Executes all pending tasks by advancing time to each task's scheduled
  /// time. A periodic task keeps this running until it is cancelled.
  pub fn flush(&self) { self.execute_tasks_until(None); }

  fn execute_tasks_until(&self, target_time: Option<Duration>) {
    loop {
      let task = {
        let mut state = self.0.rc_deref_mut();
        let should_stop = state
          .task_queue
          .peek()
          .map_or(true, |peek| target_time.is_some_and(|limit| peek.scheduled_time > limit));
        if should_stop {
          return;
        }
        let task = state.task_queue.pop();
        if let Some(task) = &task {
          state.virtual_time = state.virtual_time.max(task.scheduled_time);
        }
        task
      };

      let Some(ScheduledTask { scheduled_time, job, handle, .. }) = task else {
        return;
      };
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
            self
              .0
              .rc_deref_mut()
              .push(scheduled_time + period, Job::Periodic(action, period), handle);
          }
        }
      }
    }
  }

  fn schedule_job(&self, tasks: &CompositeSubscription, job: Job, delay: Duration) -> TaskHandle {
    let handle = TaskHandle::new();
    tasks.add(handle.clone());
    if !handle.is_closed() {
      let mut state = self.0.rc_deref_mut();
      let scheduled_time = state.virtual_time + delay;
      state.push(scheduled_time, job, handle.clone());
    }
    handle
  }
}

impl Scheduler for TestScheduler {
  type Worker = TestWorker;

  fn create_worker(&self) -> TestWorker {
    TestWorker { scheduler: self.clone(), tasks: CompositeSubscription::new() }
  }

  fn now(&self) -> Instant {
    let state = self.0.rc_deref();
    state.origin + state.virtual_time
  }
}

#[derive(Clone)]
pub struct TestWorker {
  scheduler: TestScheduler,
  tasks: CompositeSubscription,
}

impl Worker for TestWorker {
  fn schedule_after<F>(&self, action: F, delay: Duration) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self
      .scheduler
      .schedule_job(&self.tasks, Job::Once(Box::new(action)), delay)
  }

  fn schedule_periodically<F>(
    &self, action: F, initial_delay: Duration, period: Duration,
  ) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    self
      .scheduler
      .schedule_job(&self.tasks, Job::Periodic(Box::new(action), period), initial_delay)
  }
}

impl SubscriptionLike for TestWorker {
  #[inline]
  fn unsubscribe(&mut self) { self.tasks.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.tasks.is_closed() }
}
