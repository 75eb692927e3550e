use std::{
  num::NonZeroUsize,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
};

use futures::executor::ThreadPool;

use super::{
  event_loop::{spawn_event_loop, EventLoopWorker},
  Scheduler,
};

/// A fixed set of single thread event loops for CPU bound work. Workers are
/// assigned to the loops round-robin, so work of one worker stays sequential
/// while different workers run in parallel.
#[derive(Clone)]
pub struct ComputationScheduler(Arc<ComputationPool>);

struct ComputationPool {
  loops: Vec<ThreadPool>,
  next: AtomicUsize,
}

impl ComputationScheduler {
  /// One event loop per available hardware thread.
  pub fn new() -> Self {
    let threads = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    Self::with_threads(threads)
  }

  /// Exactly `threads` event loops (at least one).
  pub fn with_threads(threads: usize) -> Self {
    let loops = (0..threads.max(1))
      .map(|_| spawn_event_loop("rxflow-computation-"))
      .collect();
    ComputationScheduler(Arc::new(ComputationPool { loops, next: AtomicUsize::new(0) }))
  }

  pub fn threads(&self) -> usize { self.0.loops.len() }
}

impl Default for ComputationScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for ComputationScheduler {
  type Worker = EventLoopWorker;

  fn create_worker(&self) -> EventLoopWorker {
    let idx = self.0.next.fetch_add(1, Ordering::Relaxed) % self.0.loops.len();
    EventLoopWorker::new(self.0.loops[idx].clone())
  }
}

#[cfg(test)]
mod test {
  use std::{collections::HashSet, sync::mpsc, time::Duration};

  use super::*;
  use crate::scheduler::Worker;

  #[test]
  fn workers_are_spread_round_robin() {
    let scheduler = ComputationScheduler::with_threads(2);
    assert_eq!(scheduler.threads(), 2);
    let (tx, rx) = mpsc::channel();
    for _ in 0..4 {
      let tx = tx.clone();
      scheduler
        .create_worker()
        .schedule(move || tx.send(thread::current().id()).unwrap());
    }
    let ids: HashSet<_> = (0..4)
      .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
      .collect();
    assert_eq!(ids.len(), 2);
  }
}
