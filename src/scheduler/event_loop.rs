use std::time::{Duration, Instant};

use futures::{
  executor::ThreadPool,
  future::{AbortHandle, Abortable},
};
use futures_time::task::sleep;

use super::{run_guarded, TaskHandle, Worker};
use crate::subscription::{CompositeSubscription, SubscriptionLike};

/// Starts a single thread event loop. The thread exits once every handle to
/// the returned pool is dropped.
///
/// # Panics
///
/// Panics if the OS refuses to create the thread, as `std::thread::spawn`
/// does.
pub(crate) fn spawn_event_loop(name_prefix: &str) -> ThreadPool {
  tracing::debug!(name_prefix = %name_prefix, "starting event loop");
  ThreadPool::builder()
    .pool_size(1)
    .name_prefix(name_prefix)
    .create()
    .expect("failed to spawn an event loop thread")
}

/// A worker bound to one single thread event loop. Its actions run in order
/// on that thread; cancelling it aborts every action not yet finished.
#[derive(Clone)]
pub struct EventLoopWorker {
  event_loop: ThreadPool,
  tasks: CompositeSubscription,
}

impl EventLoopWorker {
  pub(crate) fn new(event_loop: ThreadPool) -> Self {
    EventLoopWorker { event_loop, tasks: CompositeSubscription::new() }
  }

  pub(crate) fn event_loop(&self) -> &ThreadPool { &self.event_loop }

  fn register(&self) -> (TaskHandle, futures::future::AbortRegistration) {
    let (abort, registration) = AbortHandle::new_pair();
    let handle = TaskHandle::abortable(abort);
    self.tasks.add(handle.clone());
    (handle, registration)
  }
}

impl Worker for EventLoopWorker {
  fn schedule_after<F>(&self, action: F, delay: Duration) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let (handle, registration) = self.register();
    if handle.is_closed() {
      return handle;
    }
    let c_handle = handle.clone();
    let task = Abortable::new(
      async move {
        if !delay.is_zero() {
          sleep(delay.into()).await;
        }
        if !c_handle.is_closed() {
          run_guarded(action);
        }
        c_handle.finish();
      },
      registration,
    );
    self.event_loop.spawn_ok(async move {
      let _ = task.await;
    });
    handle
  }

  fn schedule_periodically<F>(
    &self, mut action: F, initial_delay: Duration, period: Duration,
  ) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    let (handle, registration) = self.register();
    if handle.is_closed() {
      return handle;
    }
    let c_handle = handle.clone();
    let task = Abortable::new(
      async move {
        let mut due = Instant::now() + initial_delay;
        loop {
          let wait = due.saturating_duration_since(Instant::now());
          if !wait.is_zero() {
            sleep(wait.into()).await;
          }
          if c_handle.is_closed() {
            break;
          }
          run_guarded(&mut action);
          due += period;
        }
      },
      registration,
    );
    self.event_loop.spawn_ok(async move {
      let _ = task.await;
    });
    handle
  }
}

impl SubscriptionLike for EventLoopWorker {
  #[inline]
  fn unsubscribe(&mut self) { self.tasks.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.tasks.is_closed() }
}
