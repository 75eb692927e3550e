use std::marker::PhantomData;

use crate::{observable::Observable, observer::Observer, subscriber::Subscriber};

/// Creates an observable that calls `factory` at each subscription and
/// subscribes to the observable it returns.
///
/// ```rust
/// use rxflow::prelude::*;
///
/// observable::defer(|| {
///   println!("Hi!");
///   observable::of("Hello!")
/// })
/// .subscribe(|v| println!("{}", v));
/// // Prints: Hi!\nHello!\n
/// ```
pub fn defer<F, S, Item, Err>(factory: F) -> DeferObservable<F, Item, Err>
where
  F: FnOnce() -> S,
  S: Observable<Item, Err>,
{
  DeferObservable(factory, PhantomData)
}

#[derive(Clone)]
pub struct DeferObservable<F, Item, Err>(F, PhantomData<fn() -> (Item, Err)>);

impl<F, S, Item, Err> Observable<Item, Err> for DeferObservable<F, Item, Err>
where
  F: FnOnce() -> S,
  S: Observable<Item, Err>,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    (self.0)().actual_subscribe(subscriber)
  }
}
