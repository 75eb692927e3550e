use super::subject_core::{History, SubjectCore};

/// Holds a current value. A new subscriber receives the current value first,
/// then every later one. After termination, late subscribers only receive the
/// terminal event.
pub struct BehaviorSubject<Item, Err>(SubjectCore<Item, Err>);

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(initial: Item) -> Self { BehaviorSubject(SubjectCore::new(History::Latest(Some(initial)))) }

  /// The current value.
  pub fn value(&self) -> Option<Item> { self.0.latest() }
}

impl_subject!(BehaviorSubject);

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[test]
  fn subscriber_starts_with_current_value() {
    let mut subject = BehaviorSubject::<i32, ()>::new(0);
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    subject.next(1);
    subject
      .clone()
      .subscribe_err(move |v| c_got.lock().unwrap().push(v), |_| {});
    subject.next(2);
    assert_eq!(*got.lock().unwrap(), vec![1, 2]);
    assert_eq!(subject.value(), Some(2));
  }

  #[test]
  fn initial_value_when_nothing_was_pushed() {
    let subject = BehaviorSubject::<&'static str, ()>::new("init");
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    subject.subscribe_err(move |v| c_got.lock().unwrap().push(v), |_| {});
    assert_eq!(*got.lock().unwrap(), vec!["init"]);
  }

  #[test]
  fn completed_subject_only_completes() {
    let mut subject = BehaviorSubject::<i32, ()>::new(0);
    subject.complete();
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    subject.subscribe_all(
      move |v: i32| n.lock().unwrap().push(v.to_string()),
      |_| {},
      move || c.lock().unwrap().push("done".to_owned()),
    );
    assert_eq!(*log.lock().unwrap(), vec!["done"]);
  }
}
