use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  rc::MutArc,
  subscriber::{Emitter, Subscriber},
};

/// Creates an observable from a subscribe function.
///
/// The function runs once per subscription and receives an [`Emitter`]. The
/// emitter is cheap to clone, so the function may hand copies to threads or
/// scheduled actions; everything it must release on cancellation goes into
/// `emitter.subscription`. Returning `Err` from the function delivers that
/// error downstream, unless the subscription already terminated.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxflow::prelude::*;
///
/// let got = Arc::new(Mutex::new(vec![]));
/// let c_got = got.clone();
/// observable::create(|mut s: Emitter<i32, ()>| {
///   s.next(1);
///   s.next(2);
///   s.complete();
///   Ok(())
/// })
/// .subscribe_err(move |v| c_got.lock().unwrap().push(v), |_| {});
/// assert_eq!(*got.lock().unwrap(), vec![1, 2]);
/// ```
pub fn create<F, Item, Err>(subscribe: F) -> ObservableFn<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>) -> Result<(), Err>,
{
  ObservableFn { subscribe, _marker: PhantomData }
}

#[derive(Clone)]
pub struct ObservableFn<F, Item, Err> {
  subscribe: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<F, Item, Err> Observable<Item, Err> for ObservableFn<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>) -> Result<(), Err>,
  Item: 'static,
  Err: 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let Subscriber { observer, subscription } = subscriber;
    let observer: BoxObserver<Item, Err> = Box::new(observer);
    let mut emitter = Subscriber::new(MutArc::own(Some(observer)), subscription);
    if let Err(err) = (self.subscribe)(emitter.clone()) {
      emitter.error(err);
    }
  }
}
