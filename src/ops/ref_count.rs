use crate::{
  observable::{ConnectableObservable, Observable},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subject::SubjectLike,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike, Teardown},
};

/// Keeps a connectable connected while it has subscribers.
///
/// The first subscriber connects. When the last one unsubscribes (or receives
/// the terminal event) the connection is torn down exactly once; a later
/// subscriber connects again, through a fresh subject if the previous one
/// terminated.
pub struct RefCount<Subj> {
  connectable: ConnectableObservable<Subj>,
  state: MutArc<RefCountState>,
}

#[derive(Default)]
struct RefCountState {
  count: usize,
  connection: Option<CompositeSubscription>,
}

impl<Subj> Clone for RefCount<Subj> {
  fn clone(&self) -> Self {
    RefCount { connectable: self.connectable.clone(), state: self.state.clone() }
  }
}

impl<Subj> RefCount<Subj> {
  pub(crate) fn new(connectable: ConnectableObservable<Subj>) -> Self {
    RefCount { connectable, state: MutArc::own(RefCountState::default()) }
  }

  /// Number of subscribers currently counted.
  pub fn subscriber_count(&self) -> usize { self.state.rc_deref().count }
}

fn release(state: &MutArc<RefCountState>) {
  let connection = {
    let mut state = state.rc_deref_mut();
    state.count -= 1;
    if state.count > 0 {
      return;
    }
    state.connection.take()
  };
  if let Some(mut connection) = connection {
    tracing::trace!("last subscriber left, disconnecting");
    connection.unsubscribe();
  }
}

impl<Item, Err, Subj> Observable<Item, Err> for RefCount<Subj>
where
  Subj: SubjectLike<Item, Err>,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let first = {
      let mut state = self.state.rc_deref_mut();
      state.count += 1;
      state.count == 1
    };
    if first {
      self.connectable.reset_if_stopped();
    }
    let state = self.state.clone();
    subscriber.add(Teardown::new(move || release(&state)));
    self.connectable.clone().actual_subscribe(subscriber);

    if first {
      tracing::trace!("first subscriber arrived, connecting");
      let mut connection = self.connectable.connect();
      let stale = {
        let mut state = self.state.rc_deref_mut();
        if state.count == 0 {
          true
        } else {
          state.connection = Some(connection.clone());
          false
        }
      };
      // Everybody left while connecting, e.g. a synchronous source completed.
      if stale {
        connection.unsubscribe();
      }
    }
  }
}

#[cfg(test)]
mod test {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  #[test]
  fn connects_with_the_first_subscriber() {
    let upstream = Subject::<i32, Infallible>::new();
    let shared = upstream.clone().share();
    assert_eq!(upstream.observer_count(), 0);

    let got = Arc::new(Mutex::new(vec![]));
    let (a, b) = (got.clone(), got.clone());
    let mut first = shared.clone().subscribe(move |v| a.lock().unwrap().push(format!("a{v}")));
    assert_eq!(upstream.observer_count(), 1);
    let mut second = shared.clone().subscribe(move |v| b.lock().unwrap().push(format!("b{v}")));
    assert_eq!(upstream.observer_count(), 1);
    assert_eq!(shared.subscriber_count(), 2);

    upstream.clone().next(1);
    assert_eq!(*got.lock().unwrap(), vec!["a1", "b1"]);

    first.unsubscribe();
    assert_eq!(upstream.observer_count(), 1);
    second.unsubscribe();
    second.unsubscribe();
    assert_eq!(upstream.observer_count(), 0);
    assert_eq!(shared.subscriber_count(), 0);
  }

  #[test]
  fn later_subscriber_reconnects() {
    let subscriptions = Arc::new(Mutex::new(0));
    let c_subscriptions = subscriptions.clone();
    let shared = observable::create(move |mut s: Emitter<i32, Infallible>| {
      *c_subscriptions.lock().unwrap() += 1;
      s.next(1);
      s.complete();
      Ok(())
    })
    .share();

    let got = Arc::new(Mutex::new(vec![]));
    for _ in 0..2 {
      let c_got = got.clone();
      shared.clone().subscribe(move |v| c_got.lock().unwrap().push(v));
    }
    assert_eq!(*got.lock().unwrap(), vec![1, 1]);
    assert_eq!(*subscriptions.lock().unwrap(), 2);
    assert_eq!(shared.subscriber_count(), 0);
  }

  #[test]
  fn share_replay_serves_late_subscribers_from_history() {
    let upstream = Subject::<i32, Infallible>::new();
    let shared = upstream.clone().share_replay();
    let early = Arc::new(Mutex::new(vec![]));
    let c_early = early.clone();
    let _first = shared.clone().subscribe(move |v| c_early.lock().unwrap().push(v));
    upstream.clone().next(1);
    upstream.clone().next(2);

    let late = Arc::new(Mutex::new(vec![]));
    let c_late = late.clone();
    let _second = shared.clone().subscribe(move |v| c_late.lock().unwrap().push(v));
    assert_eq!(*late.lock().unwrap(), vec![1, 2]);
    assert_eq!(upstream.observer_count(), 1);
  }
}
