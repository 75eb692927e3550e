use super::subject_core::{History, SubjectCore};

/// Emits only the last value it received, and only when it completes. An
/// error is forwarded without any value.
pub struct AsyncSubject<Item, Err>(SubjectCore<Item, Err>);

impl<Item, Err> AsyncSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { AsyncSubject(SubjectCore::new(History::Last(None))) }
}

impl<Item, Err> Default for AsyncSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl_subject!(AsyncSubject);

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  fn collect(subject: &AsyncSubject<i32, &'static str>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(vec![]));
    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    subject.clone().subscribe_all(
      move |v| n.lock().unwrap().push(v.to_string()),
      move |err| e.lock().unwrap().push(err.to_owned()),
      move || c.lock().unwrap().push("done".to_owned()),
    );
    log
  }

  #[test]
  fn last_value_on_completion() {
    let mut subject = AsyncSubject::new();
    let early = collect(&subject);
    subject.next(1);
    subject.next(2);
    assert!(early.lock().unwrap().is_empty());
    subject.complete();
    let late = collect(&subject);
    assert_eq!(*early.lock().unwrap(), vec!["2", "done"]);
    assert_eq!(*late.lock().unwrap(), vec!["2", "done"]);
  }

  #[test]
  fn error_drops_the_value() {
    let mut subject = AsyncSubject::new();
    let early = collect(&subject);
    subject.next(1);
    subject.error("boom");
    assert_eq!(*early.lock().unwrap(), vec!["boom"]);
    assert_eq!(*collect(&subject).lock().unwrap(), vec!["boom"]);
  }

  #[test]
  fn empty_completion() {
    let mut subject = AsyncSubject::new();
    subject.complete();
    assert_eq!(*collect(&subject).lock().unwrap(), vec!["done"]);
  }
}
