use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::{Duration, Instant},
};

use futures::executor::ThreadPool;

use super::{
  event_loop::{spawn_event_loop, EventLoopWorker},
  Scheduler, TaskHandle, Worker,
};
use crate::{
  rc::{MutArc, RcDerefMut},
  subscription::SubscriptionLike,
};

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// An elastic pool of single thread event loops for blocking work.
///
/// A worker reuses an idle event loop when one is cached and starts a new one
/// otherwise. Cancelling the worker returns its loop to the cache, where it
/// stays for the keep-alive period before it is evicted and its thread exits.
#[derive(Clone)]
pub struct IoScheduler(Arc<IoPool>);

struct IoPool {
  keep_alive: Duration,
  idle: MutArc<Vec<(Instant, ThreadPool)>>,
}

impl IoPool {
  fn evict_expired(idle: &mut Vec<(Instant, ThreadPool)>, keep_alive: Duration) {
    let before = idle.len();
    idle.retain(|(since, _)| since.elapsed() < keep_alive);
    if idle.len() < before {
      tracing::debug!(evicted = before - idle.len(), "io scheduler evicted idle event loops");
    }
  }
}

impl IoScheduler {
  pub fn new() -> Self { Self::with_keep_alive(DEFAULT_KEEP_ALIVE) }

  /// How long a released event loop is kept for reuse.
  pub fn with_keep_alive(keep_alive: Duration) -> Self {
    IoScheduler(Arc::new(IoPool { keep_alive, idle: MutArc::own(vec![]) }))
  }

  /// Number of cached event loops waiting for a worker.
  pub fn idle_count(&self) -> usize {
    let mut idle = self.0.idle.rc_deref_mut();
    IoPool::evict_expired(&mut idle, self.0.keep_alive);
    idle.len()
  }
}

impl Default for IoScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for IoScheduler {
  type Worker = IoWorker;

  fn create_worker(&self) -> IoWorker {
    let cached = {
      let mut idle = self.0.idle.rc_deref_mut();
      IoPool::evict_expired(&mut idle, self.0.keep_alive);
      idle.pop().map(|(_, event_loop)| event_loop)
    };
    let event_loop = cached.unwrap_or_else(|| spawn_event_loop("rxflow-io-"));
    IoWorker {
      inner: EventLoopWorker::new(event_loop),
      pool: self.0.clone(),
      released: Arc::new(AtomicBool::new(false)),
    }
  }
}

#[derive(Clone)]
pub struct IoWorker {
  inner: EventLoopWorker,
  pool: Arc<IoPool>,
  released: Arc<AtomicBool>,
}

impl Worker for IoWorker {
  #[inline]
  fn schedule_after<F>(&self, action: F, delay: Duration) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.inner.schedule_after(action, delay)
  }

  #[inline]
  fn schedule_periodically<F>(
    &self, action: F, initial_delay: Duration, period: Duration,
  ) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    self
      .inner
      .schedule_periodically(action, initial_delay, period)
  }
}

impl SubscriptionLike for IoWorker {
  fn unsubscribe(&mut self) {
    self.inner.unsubscribe();
    if !self.released.swap(true, Ordering::AcqRel) {
      let mut idle = self.pool.idle.rc_deref_mut();
      IoPool::evict_expired(&mut idle, self.pool.keep_alive);
      idle.push((Instant::now(), self.inner.event_loop().clone()));
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.inner.is_closed() }
}
