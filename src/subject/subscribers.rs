use crate::{
  notification::Notification,
  observer::{BoxObserver, SynchronizedObserver},
};

pub(crate) type SyncObserver<Item, Err> = SynchronizedObserver<Item, Err, BoxObserver<Item, Err>>;

/// The observers attached to a subject, keyed by id so a subscription can
/// detach its own entry.
///
/// Broadcasting only enqueues. The returned handles must be drained after the
/// subject's lock is released, so callbacks never run under it.
pub(crate) struct Subscribers<Item, Err> {
  next_id: usize,
  observers: Vec<(usize, SyncObserver<Item, Err>)>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Subscribers { next_id: 0, observers: vec![] } }
}

impl<Item, Err> Subscribers<Item, Err> {
  pub(crate) fn add(&mut self, observer: SyncObserver<Item, Err>) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.observers.push((id, observer));
    id
  }

  pub(crate) fn remove(&mut self, id: usize) -> bool {
    let before = self.observers.len();
    self.observers.retain(|(key, _)| *key != id);
    before != self.observers.len()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.observers.len() }

  /// Enqueues `value` to every observer. The last one receives the moved
  /// value, the others a clone.
  pub(crate) fn broadcast_value(&self, value: Item) -> Vec<SyncObserver<Item, Err>>
  where
    Item: Clone,
  {
    let mut iter = self.observers.iter().peekable();
    while let Some((_, observer)) = iter.next() {
      if iter.peek().is_some() {
        observer.enqueue(Notification::Next(value.clone()));
      } else {
        observer.enqueue(Notification::Next(value));
        break;
      }
    }
    self.observers.iter().map(|(_, o)| o.clone()).collect()
  }

  /// Enqueues the terminal `notification` (preceded by `last`, if any) to
  /// every observer and detaches them all.
  pub(crate) fn broadcast_terminal(
    &mut self, last: Option<&Item>, notification: &Notification<Item, Err>,
  ) -> Vec<SyncObserver<Item, Err>>
  where
    Item: Clone,
    Err: Clone,
  {
    self
      .observers
      .drain(..)
      .map(|(_, observer)| {
        if let Some(value) = last {
          observer.enqueue(Notification::Next(value.clone()));
        }
        observer.enqueue(notification.clone());
        observer
      })
      .collect()
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observer::ObserverAll;

  fn recording(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> SyncObserver<i32, ()> {
    let (n, c) = (log.clone(), log.clone());
    let observer: BoxObserver<i32, ()> = Box::new(ObserverAll::new(
      move |v: i32| n.lock().unwrap().push(format!("{tag}{v}")),
      |_: ()| {},
      move || c.lock().unwrap().push(format!("{tag} done")),
    ));
    SynchronizedObserver::new(observer)
  }

  #[test]
  fn broadcast_reaches_everyone_after_drain() {
    let log = Arc::new(Mutex::new(vec![]));
    let mut subscribers = Subscribers::default();
    let a = subscribers.add(recording(&log, "a"));
    subscribers.add(recording(&log, "b"));

    for o in subscribers.broadcast_value(1) {
      o.drain();
    }
    assert!(subscribers.remove(a));
    assert!(!subscribers.remove(a));
    for o in subscribers.broadcast_terminal(Some(&2), &Notification::Completed) {
      o.drain();
    }
    assert_eq!(subscribers.len(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["a1", "b1", "b2", "b done"]);
  }
}
