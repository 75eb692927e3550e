use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
};

/// Performs the subscription to the source on a worker of the scheduler.
/// Events are delivered wherever the source emits them.
#[derive(Clone)]
pub struct SubscribeOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> SubscribeOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { SubscribeOnOp { source, scheduler } }
}

impl<S, SD, Item, Err> Observable<Item, Err> for SubscribeOnOp<S, SD>
where
  S: Observable<Item, Err> + Send + 'static,
  SD: Scheduler,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let worker = self.scheduler.create_worker();
    subscriber.add(worker.clone());
    let source = self.source;
    worker.schedule(move || source.actual_subscribe(subscriber));
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  #[test]
  fn subscription_waits_for_the_worker() {
    let scheduler = TestScheduler::new();
    let subscribed = Arc::new(Mutex::new(false));
    let c_subscribed = subscribed.clone();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    observable::defer(move || {
      *c_subscribed.lock().unwrap() = true;
      observable::from_iter(1..=2)
    })
    .subscribe_on(scheduler.clone())
    .subscribe(move |v| c_got.lock().unwrap().push(v));

    assert!(!*subscribed.lock().unwrap());
    scheduler.trigger_actions();
    assert!(*subscribed.lock().unwrap());
    assert_eq!(*got.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn unsubscribe_before_the_worker_runs() {
    let scheduler = TestScheduler::new();
    let subject = Subject::<i32, ()>::new();
    let mut subscription = subject
      .clone()
      .subscribe_on(scheduler.clone())
      .subscribe(|_| {});
    subscription.unsubscribe();
    scheduler.trigger_actions();
    assert_eq!(subject.observer_count(), 0);
  }

  #[cfg(feature = "futures-scheduler")]
  #[test]
  fn subscribes_on_another_thread() {
    let (tx, rx) = std::sync::mpsc::channel();
    let caller = std::thread::current().id();
    observable::from_iter(1..=3)
      .subscribe_on(crate::scheduler::new_thread())
      .subscribe(move |v| {
        let _ = tx.send((v, std::thread::current().id()));
      });
    let got: Vec<_> = (0..3)
      .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
      .collect();
    assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(got.iter().all(|(_, id)| *id != caller));
  }
}
