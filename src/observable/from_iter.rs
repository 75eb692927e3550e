use std::convert::Infallible;

use crate::{observable::Observable, observer::Observer, subscriber::Subscriber};

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. Never emits an error. The
/// iteration stops early once the subscription is cancelled.
///
/// # Examples
///
/// ```
/// use rxflow::prelude::*;
///
/// observable::from_iter(0..10).subscribe(|v| println!("{},", v));
/// observable::from_iter(vec![0, 1, 2, 3]).subscribe(|v| println!("{},", v));
/// ```
pub fn from_iter<Iter>(iter: Iter) -> ObservableIter<Iter>
where
  Iter: IntoIterator,
{
  ObservableIter(iter)
}

/// Creates an observable producing a single value.
///
/// ```
/// use rxflow::prelude::*;
///
/// observable::of(123).subscribe(|v| println!("{},", v));
/// ```
pub fn of<Item>(v: Item) -> ObservableIter<std::iter::Once<Item>> { from_iter(std::iter::once(v)) }

#[derive(Clone)]
pub struct ObservableIter<Iter>(Iter);

impl<Iter> Observable<Iter::Item, Infallible> for ObservableIter<Iter>
where
  Iter: IntoIterator,
{
  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>)
  where
    O: Observer<Iter::Item, Infallible> + Send + 'static,
  {
    for v in self.0 {
      if subscriber.is_finished() {
        return;
      }
      subscriber.next(v);
    }
    subscriber.complete();
  }
}

#[cfg(test)]
mod test {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  fn collect<S>(source: S) -> (Arc<Mutex<Vec<i32>>>, Arc<Mutex<bool>>)
  where
    S: Observable<i32, Infallible>,
  {
    let got = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (g, c) = (got.clone(), completed.clone());
    source.subscribe_all(
      move |v| g.lock().unwrap().push(v),
      |_| {},
      move || *c.lock().unwrap() = true,
    );
    (got, completed)
  }

  #[test]
  fn from_range() {
    let (got, completed) = collect(observable::from_iter(0..100));
    assert_eq!(got.lock().unwrap().len(), 100);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn from_vec() {
    let (got, completed) = collect(observable::from_iter(vec![3, 2, 1]));
    assert_eq!(*got.lock().unwrap(), vec![3, 2, 1]);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn single_value() {
    let (got, completed) = collect(observable::of(7));
    assert_eq!(*got.lock().unwrap(), vec![7]);
    assert!(*completed.lock().unwrap());
  }

  struct TakeFour(Arc<Mutex<Vec<i32>>>);

  impl Observer<i32, Infallible> for TakeFour {
    fn next(&mut self, value: i32) { self.0.lock().unwrap().push(value) }

    fn error(&mut self, _: Infallible) {}

    fn complete(&mut self) {}

    fn is_finished(&self) -> bool { self.0.lock().unwrap().len() >= 4 }
  }

  #[test]
  fn stops_when_consumer_is_finished() {
    let got = Arc::new(Mutex::new(vec![]));
    let subscription = observable::from_iter(0..).subscribe_with(TakeFour(got.clone()));
    assert!(subscription.is_closed());
    assert_eq!(*got.lock().unwrap(), vec![0, 1, 2, 3]);
  }
}
