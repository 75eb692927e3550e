use std::marker::PhantomData;

use crate::{observable::Observable, observer::Observer, subscriber::Subscriber};

/// Creates an observable that emits nothing and completes immediately.
pub fn empty<Item, Err>() -> EmptyObservable<Item, Err> { EmptyObservable(PhantomData) }

/// Creates an observable that never emits and never terminates.
pub fn never<Item, Err>() -> NeverObservable<Item, Err> { NeverObservable(PhantomData) }

/// Creates an observable that emits no items, just terminates with `err`.
pub fn throw_err<Item, Err>(err: Err) -> ThrowObservable<Item, Err> {
  ThrowObservable(err, PhantomData)
}

pub struct EmptyObservable<Item, Err>(PhantomData<fn() -> (Item, Err)>);

pub struct NeverObservable<Item, Err>(PhantomData<fn() -> (Item, Err)>);

#[derive(Clone)]
pub struct ThrowObservable<Item, Err>(Err, PhantomData<fn() -> Item>);

// Derives would ask for `Item: Clone` and `Err: Clone`.
impl<Item, Err> Clone for EmptyObservable<Item, Err> {
  fn clone(&self) -> Self { EmptyObservable(PhantomData) }
}

impl<Item, Err> Clone for NeverObservable<Item, Err> {
  fn clone(&self) -> Self { NeverObservable(PhantomData) }
}

impl<Item, Err> Observable<Item, Err> for EmptyObservable<Item, Err> {
  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    subscriber.complete();
  }
}

impl<Item, Err> Observable<Item, Err> for NeverObservable<Item, Err> {
  #[inline]
  fn actual_subscribe<O>(self, _: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
  }
}

impl<Item, Err> Observable<Item, Err> for ThrowObservable<Item, Err> {
  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    subscriber.error(self.0);
  }
}
