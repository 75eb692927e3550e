use super::{
  event_loop::{spawn_event_loop, EventLoopWorker},
  Scheduler,
};

/// Starts a dedicated event loop thread for every worker. The thread exits
/// once the worker and all its clones are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
  type Worker = EventLoopWorker;

  fn create_worker(&self) -> EventLoopWorker {
    EventLoopWorker::new(spawn_event_loop("rxflow-new-thread-"))
  }
}
