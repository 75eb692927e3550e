use crate::{
  notification::Notification,
  observable::Observable,
  observer::{Observer, SynchronizedObserver},
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
  subscription::CompositeSubscription,
};

/// Re-emits every event from a worker of the scheduler. One worker serves a
/// subscription, so events keep their order.
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> ObserveOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { ObserveOnOp { source, scheduler } }
}

struct ObserveOnObserver<Item, Err, O, W> {
  down: SynchronizedObserver<Item, Err, Subscriber<O>>,
  worker: W,
}

impl<Item, Err, O, W> ObserveOnObserver<Item, Err, O, W>
where
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
  W: Worker,
{
  fn forward(&self, notification: Notification<Item, Err>) {
    let mut down = self.down.clone();
    self
      .worker
      .schedule(move || notification.accept(&mut down));
  }
}

impl<Item, Err, O, W> Observer<Item, Err> for ObserveOnObserver<Item, Err, O, W>
where
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
  W: Worker,
{
  #[inline]
  fn next(&mut self, value: Item) { self.forward(Notification::Next(value)) }

  #[inline]
  fn error(&mut self, err: Err) { self.forward(Notification::Error(err)) }

  #[inline]
  fn complete(&mut self) { self.forward(Notification::Completed) }

  #[inline]
  fn is_finished(&self) -> bool { self.down.is_finished() }
}

impl<S, SD, Item, Err> Observable<Item, Err> for ObserveOnOp<S, SD>
where
  S: Observable<Item, Err>,
  SD: Scheduler,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let worker = self.scheduler.create_worker();
    let source_token = CompositeSubscription::new();
    subscriber.add(worker.clone());
    subscriber.add(source_token.clone());
    let observer = ObserveOnObserver { down: SynchronizedObserver::new(subscriber), worker };
    self
      .source
      .actual_subscribe(Subscriber::new(observer, source_token));
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  #[test]
  fn delivery_waits_for_the_worker() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    observable::from_iter(1..=3)
      .observe_on(scheduler.clone())
      .subscribe_all(
        move |v| n.lock().unwrap().push(v.to_string()),
        |_| {},
        move || c.lock().unwrap().push("done".to_owned()),
      );
    assert!(log.lock().unwrap().is_empty());
    scheduler.trigger_actions();
    assert_eq!(*log.lock().unwrap(), vec!["1", "2", "3", "done"]);
  }

  #[test]
  fn unsubscribe_drops_queued_events() {
    let scheduler = TestScheduler::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let mut subscription = observable::from_iter(1..=3)
      .observe_on(scheduler.clone())
      .subscribe(move |v| c_got.lock().unwrap().push(v));
    subscription.unsubscribe();
    scheduler.trigger_actions();
    assert!(got.lock().unwrap().is_empty());
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[cfg(feature = "futures-scheduler")]
  #[test]
  fn delivers_on_another_thread() {
    let (tx, rx) = std::sync::mpsc::channel();
    let caller = std::thread::current().id();
    observable::from_iter(0..100)
      .observe_on(crate::scheduler::computation())
      .subscribe(move |v| {
        let _ = tx.send((v, std::thread::current().id()));
      });
    let got: Vec<_> = (0..100)
      .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
      .collect();
    assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), (0..100).collect::<Vec<_>>());
    assert!(got.iter().all(|(_, id)| *id != caller));
  }
}
