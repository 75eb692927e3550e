use std::{
  collections::VecDeque,
  sync::Arc,
  time::{Duration, Instant},
};

use super::subscribers::{Subscribers, SyncObserver};
use crate::{
  notification::Notification,
  observer::{BoxObserver, Observer, SynchronizedObserver},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscriber::Subscriber,
  subscription::Teardown,
};

pub(crate) type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// What a subject keeps to hand to subscribers that arrive late.
pub(crate) enum History<Item> {
  /// Nothing, late subscribers only see what comes next.
  None,
  /// Every value, optionally bounded by count and by age.
  Replay {
    items: VecDeque<(Instant, Item)>,
    max: Option<usize>,
    window: Option<(Duration, Clock)>,
  },
  /// The latest value. Never empty while the subject is running.
  Latest(Option<Item>),
  /// The last value, held back until completion.
  Last(Option<Item>),
}

impl<Item: Clone> History<Item> {
  fn now(window: &Option<(Duration, Clock)>) -> Instant {
    window.as_ref().map_or_else(Instant::now, |(_, clock)| clock())
  }

  fn trim(items: &mut VecDeque<(Instant, Item)>, max: Option<usize>, window: &Option<(Duration, Clock)>) {
    if let Some(max) = max {
      while items.len() > max {
        items.pop_front();
      }
    }
    if let Some((age, clock)) = window {
      let now = clock();
      while items
        .front()
        .map_or(false, |(at, _)| now.saturating_duration_since(*at) > *age)
      {
        items.pop_front();
      }
    }
  }

  fn record(&mut self, value: &Item) {
    match self {
      History::None => {}
      History::Replay { items, max, window } => {
        items.push_back((Self::now(window), value.clone()));
        Self::trim(items, *max, window);
      }
      History::Latest(latest) | History::Last(latest) => *latest = Some(value.clone()),
    }
  }

  /// Values a new subscriber receives before anything live.
  fn replay<Err>(&mut self, stopped: Option<&Notification<Item, Err>>) -> Vec<Item> {
    match self {
      History::None => vec![],
      History::Replay { items, max, window } => {
        Self::trim(items, *max, window);
        items.iter().map(|(_, v)| v.clone()).collect()
      }
      History::Latest(latest) if stopped.is_none() => latest.iter().cloned().collect(),
      History::Latest(_) => vec![],
      History::Last(last) => match stopped {
        Some(Notification::Completed) => last.iter().cloned().collect(),
        _ => vec![],
      },
    }
  }

  /// Value held back until completion.
  fn deferred(&self) -> Option<&Item> {
    match self {
      History::Last(last) => last.as_ref(),
      _ => None,
    }
  }

  fn forwards_next(&self) -> bool { !matches!(self, History::Last(_)) }
}

pub(crate) struct CoreState<Item, Err> {
  observers: Subscribers<Item, Err>,
  stopped: Option<Notification<Item, Err>>,
  history: History<Item>,
}

/// State shared by every subject flavour. Emissions and subscriptions are
/// ordered under one lock and delivered after it is released.
pub(crate) struct SubjectCore<Item, Err>(MutArc<CoreState<Item, Err>>);

impl<Item, Err> Clone for SubjectCore<Item, Err> {
  fn clone(&self) -> Self { SubjectCore(self.0.clone()) }
}

impl<Item, Err> SubjectCore<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub(crate) fn new(history: History<Item>) -> Self {
    SubjectCore(MutArc::own(CoreState {
      observers: Subscribers::default(),
      stopped: None,
      history,
    }))
  }

  pub(crate) fn next(&self, value: Item) {
    let targets = {
      let mut state = self.0.rc_deref_mut();
      if state.stopped.is_some() {
        return;
      }
      state.history.record(&value);
      if !state.history.forwards_next() {
        return;
      }
      state.observers.broadcast_value(value)
    };
    targets.iter().for_each(SynchronizedObserver::drain);
  }

  pub(crate) fn error(&self, err: Err) { self.terminate(Notification::Error(err)) }

  pub(crate) fn complete(&self) { self.terminate(Notification::Completed) }

  fn terminate(&self, notification: Notification<Item, Err>) {
    let targets = {
      let mut state = self.0.rc_deref_mut();
      if state.stopped.is_some() {
        return;
      }
      let CoreState { observers, history, .. } = &mut *state;
      let last = match notification {
        Notification::Completed => history.deferred(),
        _ => None,
      };
      let targets = observers.broadcast_terminal(last, &notification);
      state.stopped = Some(notification);
      targets
    };
    targets.iter().for_each(SynchronizedObserver::drain);
  }

  pub(crate) fn subscribe<O>(&self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let observer: BoxObserver<Item, Err> = Box::new(subscriber);
    let observer: SyncObserver<Item, Err> = SynchronizedObserver::new(observer);

    let id = {
      let mut state = self.0.rc_deref_mut();
      let CoreState { observers, stopped, history } = &mut *state;
      for value in history.replay(stopped.as_ref()) {
        observer.enqueue(Notification::Next(value));
      }
      match stopped {
        Some(terminal) => {
          observer.enqueue(terminal.clone());
          None
        }
        None => Some(observers.add(observer.clone())),
      }
    };

    if let Some(id) = id {
      let core = self.clone();
      subscription.add(Teardown::new(move || {
        core.0.rc_deref_mut().observers.remove(id);
      }));
    }
    observer.drain();
  }

  pub(crate) fn is_stopped(&self) -> bool { self.0.rc_deref().stopped.is_some() }

  pub(crate) fn observer_count(&self) -> usize { self.0.rc_deref().observers.len() }

  pub(crate) fn latest(&self) -> Option<Item> {
    match &self.0.rc_deref().history {
      History::Latest(latest) => latest.clone(),
      _ => None,
    }
  }
}
