//! Schedulers decide where and when a unit of work runs.
//!
//! A [`Scheduler`] hands out [`Worker`]s. A worker is a sequential execution
//! context and a cancellation token at the same time: cancelling it prevents
//! every action it has not started yet and stops its periodic runs. Each
//! scheduled action also gets its own [`TaskHandle`].
//!
//! Policies:
//!
//! - [`ImmediateScheduler`]: runs on the calling thread, delays block.
//! - [`TrampolineScheduler`]: per-thread queue drained by the outermost call.
//! - [`TestScheduler`]: virtual time, advanced by hand.
//! - `ComputationScheduler`, `IoScheduler`, `NewThreadScheduler`: single
//!   thread event loops backed by `futures` thread pools (feature
//!   `futures-scheduler`).

use std::{
  any::Any,
  fmt::{Debug, Formatter},
  panic::{self, AssertUnwindSafe},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::{Duration, Instant},
};

use futures::future::AbortHandle;

use crate::subscription::SubscriptionLike;

mod immediate;
mod test_scheduler;
mod trampoline;
pub use immediate::{ImmediateScheduler, ImmediateWorker};
pub use test_scheduler::{TestScheduler, TestWorker};
pub use trampoline::{TrampolineScheduler, TrampolineWorker};

#[cfg(feature = "futures-scheduler")]
mod computation;
#[cfg(feature = "futures-scheduler")]
mod event_loop;
#[cfg(feature = "futures-scheduler")]
mod io;
#[cfg(feature = "futures-scheduler")]
mod new_thread;
#[cfg(feature = "futures-scheduler")]
pub use computation::ComputationScheduler;
#[cfg(feature = "futures-scheduler")]
pub use event_loop::EventLoopWorker;
#[cfg(feature = "futures-scheduler")]
pub use io::{IoScheduler, IoWorker};
#[cfg(feature = "futures-scheduler")]
pub use new_thread::NewThreadScheduler;

/// A Scheduler is an object to order tasks and schedule their execution.
pub trait Scheduler: Clone + Send + Sync + 'static {
  type Worker: Worker;

  /// Creates a sequential execution context. Cancel it once its owner is
  /// done with it.
  fn create_worker(&self) -> Self::Worker;

  /// The scheduler's notion of the current time.
  fn now(&self) -> Instant { Instant::now() }
}

pub trait Worker: SubscriptionLike + Clone + Send + Sync + 'static {
  /// Runs `action` once, after `delay`.
  fn schedule_after<F>(&self, action: F, delay: Duration) -> TaskHandle
  where
    F: FnOnce() + Send + 'static;

  /// Runs `action` after `initial_delay` and then every `period` until the
  /// returned handle or the worker is cancelled.
  fn schedule_periodically<F>(
    &self, action: F, initial_delay: Duration, period: Duration,
  ) -> TaskHandle
  where
    F: FnMut() + Send + 'static;

  /// Runs `action` as soon as possible.
  #[inline]
  fn schedule<F>(&self, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.schedule_after(action, Duration::ZERO)
  }
}

/// Cancellation token of one scheduled action. It reports closed once the
/// action has run (or, for periodic actions, once they were stopped).
#[derive(Clone, Default)]
pub struct TaskHandle {
  closed: Arc<AtomicBool>,
  abort: Option<AbortHandle>,
}

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  pub(crate) fn abortable(abort: AbortHandle) -> Self {
    TaskHandle { closed: Arc::default(), abort: Some(abort) }
  }

  #[inline]
  pub(crate) fn finish(&self) { self.closed.store(true, Ordering::Release); }
}

impl SubscriptionLike for TaskHandle {
  fn unsubscribe(&mut self) {
    self.closed.store(true, Ordering::Release);
    if let Some(abort) = &self.abort {
      abort.abort();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }
}

impl Debug for TaskHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskHandle")
      .field("closed", &self.is_closed())
      .finish()
  }
}

/// Runs an action on a thread owned by a scheduler. A panic is caught here so
/// the event loop keeps serving its other actions, and logged so it is never
/// invisible. Returns `false` if the action panicked.
pub(crate) fn run_guarded(action: impl FnOnce()) -> bool {
  match panic::catch_unwind(AssertUnwindSafe(action)) {
    Ok(()) => true,
    Err(payload) => {
      tracing::error!("scheduled action panicked: {}", panic_message(&payload));
      false
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_owned()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_owned()
  }
}

/// Runs every action on the calling thread.
pub fn immediate() -> ImmediateScheduler { ImmediateScheduler }

/// Queues actions on the calling thread and drains them from the outermost
/// call.
pub fn trampoline() -> TrampolineScheduler { TrampolineScheduler }

/// Shared fixed-size pool of event loops sized to the available parallelism.
#[cfg(feature = "futures-scheduler")]
pub fn computation() -> ComputationScheduler {
  static COMPUTATION: once_cell::sync::Lazy<ComputationScheduler> =
    once_cell::sync::Lazy::new(ComputationScheduler::new);
  COMPUTATION.clone()
}

/// Shared elastic pool of event loops for blocking work.
#[cfg(feature = "futures-scheduler")]
pub fn io() -> IoScheduler {
  static IO: once_cell::sync::Lazy<IoScheduler> = once_cell::sync::Lazy::new(IoScheduler::new);
  IO.clone()
}

/// Starts a fresh event loop thread for every worker.
#[cfg(feature = "futures-scheduler")]
pub fn new_thread() -> NewThreadScheduler { NewThreadScheduler }

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn handle_closes_once() {
    let mut handle = TaskHandle::new();
    let c_handle = handle.clone();
    assert!(!c_handle.is_closed());
    handle.unsubscribe();
    handle.unsubscribe();
    assert!(c_handle.is_closed());
  }

  #[test]
  fn guarded_action_reports_panic() {
    assert!(run_guarded(|| {}));
    assert!(!run_guarded(|| panic!("boom")));
  }
}
