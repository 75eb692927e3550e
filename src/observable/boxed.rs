//! Type erasure for observables.
//!
//! `BoxOp` lets heterogeneous observables with the same `Item` and `Err` be
//! stored together, returned from functions or merged pairwise.

use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  subscriber::Subscriber,
};

/// Object-safe view of an observable, subscribed with a boxed observer.
trait DynObservable<Item, Err>: Send {
  fn dyn_subscribe(self: Box<Self>, subscriber: Subscriber<BoxObserver<Item, Err>>);

  fn clone_box(&self) -> Box<dyn DynObservable<Item, Err>>;
}

impl<S, Item, Err> DynObservable<Item, Err> for S
where
  S: Observable<Item, Err> + Clone + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  fn dyn_subscribe(self: Box<Self>, subscriber: Subscriber<BoxObserver<Item, Err>>) {
    (*self).actual_subscribe(subscriber)
  }

  fn clone_box(&self) -> Box<dyn DynObservable<Item, Err>> { Box::new(self.clone()) }
}

/// A type-erased, cloneable observable.
pub struct BoxOp<Item, Err>(Box<dyn DynObservable<Item, Err>>);

impl<Item: 'static, Err: 'static> BoxOp<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: Observable<Item, Err> + Clone + Send + 'static,
  {
    BoxOp(Box::new(source))
  }
}

impl<Item, Err> Clone for BoxOp<Item, Err> {
  fn clone(&self) -> Self { BoxOp(self.0.clone_box()) }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> for BoxOp<Item, Err> {
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let Subscriber { observer, subscription } = subscriber;
    let observer: BoxObserver<Item, Err> = Box::new(observer);
    self.0.dyn_subscribe(Subscriber::new(observer, subscription));
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
  fn heterogeneous_sources_in_one_vec() {
    let sources: Vec<BoxOp<i32, Infallible>> = vec![
      observable::of(1).box_it(),
      observable::from_iter(vec![2, 3]).box_it(),
      observable::empty().box_it(),
    ];
    let got = Arc::new(Mutex::new(vec![]));
    for source in sources {
      let c_got = got.clone();
      source.subscribe(move |v| c_got.lock().unwrap().push(v));
    }
    assert_eq!(*got.lock().unwrap(), vec![1, 2, 3]);
  }

  #[test]
  fn boxed_clone_subscribes_again() {
    let boxed = observable::of(42).box_it();
    let twin = boxed.clone();
    let got = Arc::new(Mutex::new(vec![]));
    for source in [boxed, twin] {
      let c_got = got.clone();
      source.subscribe(move |v| c_got.lock().unwrap().push(v));
    }
    assert_eq!(*got.lock().unwrap(), vec![42, 42]);
  }
}
