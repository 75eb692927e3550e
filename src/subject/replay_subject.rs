use std::{collections::VecDeque, sync::Arc, time::Duration};

use super::subject_core::{Clock, History, SubjectCore};
use crate::scheduler::Scheduler;

fn clock_of<SD: Scheduler>(scheduler: SD) -> Clock { Arc::new(move || scheduler.now()) }

/// Replays retained values to every new subscriber, followed by the terminal
/// event if the subject already stopped.
///
/// Retention may be bounded by count, by age measured on a scheduler's clock,
/// or both. Values that fall out of the bounds are pruned when the subject is
/// written to or subscribed to.
pub struct ReplaySubject<Item, Err>(SubjectCore<Item, Err>);

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Retains every value.
  pub fn new() -> Self { Self::build(None, None) }

  /// Retains the latest `size` values.
  pub fn with_buffer(size: usize) -> Self { Self::build(Some(size), None) }

  /// Retains the values younger than `window` on `scheduler`'s clock.
  pub fn with_time<SD: Scheduler>(window: Duration, scheduler: SD) -> Self {
    Self::build(None, Some((window, clock_of(scheduler))))
  }

  pub fn with_buffer_and_time<SD: Scheduler>(size: usize, window: Duration, scheduler: SD) -> Self {
    Self::build(Some(size), Some((window, clock_of(scheduler))))
  }

  fn build(max: Option<usize>, window: Option<(Duration, Clock)>) -> Self {
    ReplaySubject(SubjectCore::new(History::Replay { items: VecDeque::new(), max, window }))
  }
}

impl<Item, Err> Default for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl_subject!(ReplaySubject);

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  fn collect(subject: &ReplaySubject<i32, ()>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    subject.clone().subscribe_all(
      move |v| n.lock().unwrap().push(v.to_string()),
      |_| {},
      move || c.lock().unwrap().push("done".to_owned()),
    );
    log
  }

  #[test]
  fn late_subscriber_sees_everything() {
    let mut subject = ReplaySubject::<i32, ()>::new();
    subject.next(1);
    subject.next(2);
    let early = collect(&subject);
    subject.next(3);
    subject.complete();
    let late = collect(&subject);
    assert_eq!(*early.lock().unwrap(), vec!["1", "2", "3", "done"]);
    assert_eq!(*late.lock().unwrap(), vec!["1", "2", "3", "done"]);
  }

  #[test]
  fn bounded_by_count() {
    let mut subject = ReplaySubject::<i32, ()>::with_buffer(2);
    (1..=4).for_each(|v| subject.next(v));
    assert_eq!(*collect(&subject).lock().unwrap(), vec!["3", "4"]);
  }

  #[test]
  fn bounded_by_age() {
    let scheduler = TestScheduler::new();
    let mut subject =
      ReplaySubject::<i32, ()>::with_time(Duration::from_millis(100), scheduler.clone());
    subject.next(1);
    scheduler.advance_by(Duration::from_millis(60));
    subject.next(2);
    scheduler.advance_by(Duration::from_millis(60));
    assert_eq!(*collect(&subject).lock().unwrap(), vec!["2"]);
  }

  #[test]
  fn bounded_by_count_and_age() {
    let scheduler = TestScheduler::new();
    let window = Duration::from_millis(100);
    let mut subject = ReplaySubject::<i32, ()>::with_buffer_and_time(2, window, scheduler.clone());
    subject.next(1);
    subject.next(2);
    subject.next(3);
    assert_eq!(*collect(&subject).lock().unwrap(), vec!["2", "3"]);
    scheduler.advance_by(Duration::from_millis(101));
    assert!(collect(&subject).lock().unwrap().is_empty());
  }
}
