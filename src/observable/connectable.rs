//! Multicasting through a subject that is connected to its source on demand.
//!
//! A `ConnectableObservable` holds a source and a subject. Subscribers listen
//! to the subject; nothing flows until `connect()` subscribes the subject to
//! the source. Every subscriber then shares that one source execution.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxflow::prelude::*;
//!
//! let connectable = observable::from_iter(vec![1, 2]).publish();
//! let got = Arc::new(Mutex::new(vec![]));
//! for tag in ["a", "b"] {
//!   let c_got = got.clone();
//!   connectable
//!     .clone()
//!     .subscribe(move |v| c_got.lock().unwrap().push(format!("{tag}{v}")));
//! }
//! assert!(got.lock().unwrap().is_empty());
//!
//! connectable.connect();
//! assert_eq!(*got.lock().unwrap(), vec!["a1", "b1", "a2", "b2"]);
//! ```

use std::sync::Arc;

use crate::{
  observable::Observable,
  observer::Observer,
  ops::ref_count::RefCount,
  rc::{MutArc, RcDeref, RcDerefMut},
  subject::SubjectLike,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

type Connector<Subj> = Arc<dyn Fn(Subj, CompositeSubscription) + Send + Sync>;
type Factory<Subj> = Arc<dyn Fn() -> Subj + Send + Sync>;

pub struct ConnectableObservable<Subj> {
  connector: Connector<Subj>,
  factory: Factory<Subj>,
  is_stopped: fn(&Subj) -> bool,
  state: MutArc<ConnectState<Subj>>,
}

struct ConnectState<Subj> {
  subject: Subj,
  connection: Option<CompositeSubscription>,
}

impl<Subj> Clone for ConnectableObservable<Subj> {
  fn clone(&self) -> Self {
    ConnectableObservable {
      connector: self.connector.clone(),
      factory: self.factory.clone(),
      is_stopped: self.is_stopped,
      state: self.state.clone(),
    }
  }
}

impl<Subj> ConnectableObservable<Subj> {
  /// Pairs `source` with subjects made by `factory`. A new subject is made
  /// for the first connection and whenever the previous one has terminated.
  pub fn new<S, Item, Err, F>(source: S, factory: F) -> Self
  where
    S: Observable<Item, Err> + Clone + Send + 'static,
    Subj: SubjectLike<Item, Err>,
    F: Fn() -> Subj + Send + Sync + 'static,
  {
    let source = MutArc::own(source);
    let connector: Connector<Subj> = Arc::new(move |subject, connection| {
      let source = source.rc_deref().clone();
      source.actual_subscribe(Subscriber::new(subject, connection));
    });
    let subject = factory();
    ConnectableObservable {
      connector,
      factory: Arc::new(factory),
      is_stopped: <Subj as SubjectLike<Item, Err>>::is_stopped,
      state: MutArc::own(ConnectState { subject, connection: None }),
    }
  }

  /// The subject subscribers currently attach to.
  pub fn fork(&self) -> Subj
  where
    Subj: Clone,
  {
    self.state.rc_deref().subject.clone()
  }

  /// Subscribes the subject to the source, unless a connection is live
  /// already. Returns the live connection; unsubscribing it disconnects.
  pub fn connect(&self) -> CompositeSubscription
  where
    Subj: Clone,
  {
    let (subject, connection) = {
      let mut state = self.state.rc_deref_mut();
      if let Some(connection) = state.connection.as_ref().filter(|c| !c.is_closed()) {
        return connection.clone();
      }
      if (self.is_stopped)(&state.subject) {
        state.subject = (self.factory)();
      }
      let connection = CompositeSubscription::new();
      state.connection = Some(connection.clone());
      (state.subject.clone(), connection)
    };
    tracing::trace!("connecting multicast source");
    (self.connector)(subject, connection.clone());
    connection
  }

  /// Replaces a terminated subject while nobody is connected.
  pub(crate) fn reset_if_stopped(&self) {
    let mut state = self.state.rc_deref_mut();
    let connected = state.connection.as_ref().map_or(false, |c| !c.is_closed());
    if !connected && (self.is_stopped)(&state.subject) {
      state.subject = (self.factory)();
    }
  }

  /// Connects with the first subscriber and disconnects when the last one
  /// leaves.
  pub fn ref_count(self) -> RefCount<Subj> { RefCount::new(self) }
}

impl<Item, Err, Subj> Observable<Item, Err> for ConnectableObservable<Subj>
where
  Subj: SubjectLike<Item, Err>,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subject = self.state.rc_deref().subject.clone();
    subject.actual_subscribe(subscriber)
  }
}
