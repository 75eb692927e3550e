//! Resubscription on error.
//!
//! Each attempt subscribes the source from scratch, so items the failed
//! attempt already emitted are emitted again. The attempt in flight is kept in
//! a [`SerialSubscription`]. Resubscription is scheduled on a worker; on the
//! default [`TrampolineScheduler`](crate::scheduler::TrampolineScheduler) this
//! keeps the stack flat no matter how many attempts a synchronous source burns.
//!
//! Unless the failing `error` call already runs on the trampoline, the first
//! resubscription runs inside that call; later ones are queued behind it. A
//! source must not hold a lock across `error` that its next attempt takes.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxflow::prelude::*;
//!
//! let attempts = Arc::new(Mutex::new(0));
//! let c_attempts = attempts.clone();
//! let got = Arc::new(Mutex::new(vec![]));
//! let c_got = got.clone();
//!
//! observable::create(move |mut emitter: Emitter<i32, &'static str>| {
//!   let n = {
//!     let mut n = c_attempts.lock().unwrap();
//!     *n += 1;
//!     *n
//!   };
//!   if n < 3 {
//!     emitter.error("flaky");
//!   } else {
//!     emitter.next(n);
//!     emitter.complete();
//!   }
//!   Ok(())
//! })
//! .retry(3)
//! .subscribe(move |v| c_got.lock().unwrap().push(v));
//!
//! assert_eq!(*got.lock().unwrap(), vec![3]);
//! ```
//!
//! A policy can look at the error to decide:
//!
//! ```rust
//! use rxflow::{ops::retry::RetryPolicy, prelude::*};
//!
//! #[derive(Clone)]
//! struct HttpRetry {
//!   max_retries: usize,
//! }
//!
//! impl RetryPolicy<u16> for HttpRetry {
//!   fn should_retry(&self, status: &u16, attempt: usize) -> Option<Duration> {
//!     if attempt >= self.max_retries {
//!       return None;
//!     }
//!     match status {
//!       500..=599 => Some(Duration::from_millis(500)),
//!       429 => Some(Duration::from_secs(2)),
//!       _ => None,
//!     }
//!   }
//! }
//!
//! observable::throw_err::<(), _>(404u16)
//!   .retry(HttpRetry { max_retries: 3 })
//!   .subscribe_err(|_| {}, |status| assert_eq!(status, 404));
//! ```

use std::time::Duration;

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Scheduler, Worker},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SerialSubscription},
};

/// Decides whether an error is retried and after which delay.
///
/// Implemented for `usize` (a retry budget without delay) and for
/// [`RetryConfig`].
pub trait RetryPolicy<Err>: Clone {
  /// `attempt` counts the retries already made, so it is 0 for the first
  /// error. `Some(delay)` resubscribes after `delay`, `None` lets the error
  /// through.
  fn should_retry(&self, err: &Err, attempt: usize) -> Option<Duration>;

  /// Whether an emitted item resets the attempt counter.
  fn reset_on_success(&self) -> bool { false }
}

impl<Err> RetryPolicy<Err> for usize {
  fn should_retry(&self, _err: &Err, attempt: usize) -> Option<Duration> {
    if attempt < *self { Some(Duration::ZERO) } else { None }
  }
}

/// Builder for the common retry policies.
///
/// ```rust
/// use rxflow::{ops::retry::RetryConfig, prelude::*};
///
/// let config = RetryConfig::new()
///   .count(5)
///   .delay(Duration::from_secs(1))
///   .reset_on_success();
/// ```
#[derive(Clone, Debug, Default)]
pub struct RetryConfig {
  count: Option<usize>,
  delay: Option<Duration>,
  reset_on_success: bool,
}

impl RetryConfig {
  /// Retries forever, without delay.
  pub fn new() -> Self { Self::default() }

  /// Caps the number of retries: `count(3)` allows up to 4 subscriptions.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  /// Waits `delay` before each resubscription.
  pub fn delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  /// Resets the attempt counter whenever the source emits an item, so only
  /// consecutive failures count against the cap.
  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }
}

impl<Err> RetryPolicy<Err> for RetryConfig {
  fn should_retry(&self, _err: &Err, attempt: usize) -> Option<Duration> {
    match self.count {
      Some(count) if attempt >= count => None,
      _ => Some(self.delay.unwrap_or(Duration::ZERO)),
    }
  }

  fn reset_on_success(&self) -> bool { self.reset_on_success }
}

#[derive(Clone)]
pub struct RetryOp<S, P, SD> {
  source: S,
  policy: P,
  scheduler: SD,
}

impl<S, P, SD> RetryOp<S, P, SD> {
  pub(crate) fn new(source: S, policy: P, scheduler: SD) -> Self {
    RetryOp { source, policy, scheduler }
  }
}

struct RetryObserver<S, P, W, O> {
  down: Option<Subscriber<O>>,
  source: S,
  policy: P,
  worker: W,
  serial: SerialSubscription,
  attempts: usize,
}

impl<S, P, W, O> RetryObserver<S, P, W, O> {
  fn subscribe_attempt<Item, Err>(self)
  where
    Self: Observer<Item, Err> + Send + 'static,
    S: Observable<Item, Err> + Clone,
  {
    let token = CompositeSubscription::new();
    self.serial.set(token.clone());
    let source = self.source.clone();
    source.actual_subscribe(Subscriber::new(self, token));
  }
}

impl<S, P, W, O, Item, Err> Observer<Item, Err> for RetryObserver<S, P, W, O>
where
  S: Observable<Item, Err> + Clone + Send + 'static,
  P: RetryPolicy<Err> + Send + 'static,
  W: Worker,
  O: Observer<Item, Err> + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.attempts > 0 && self.policy.reset_on_success() {
      self.attempts = 0;
    }
    if let Some(down) = self.down.as_mut() {
      down.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    let Some(mut down) = self.down.take() else { return };
    let Some(delay) = self.policy.should_retry(&err, self.attempts) else {
      down.error(err);
      return;
    };
    tracing::trace!(attempt = self.attempts + 1, ?delay, "retrying after error");
    let next = RetryObserver {
      down: Some(down),
      source: self.source.clone(),
      policy: self.policy.clone(),
      worker: self.worker.clone(),
      serial: self.serial.clone(),
      attempts: self.attempts + 1,
    };
    self
      .worker
      .schedule_after(move || next.subscribe_attempt::<Item, Err>(), delay);
  }

  fn complete(&mut self) {
    if let Some(mut down) = self.down.take() {
      down.complete();
    }
  }

  fn is_finished(&self) -> bool { self.down.as_ref().map_or(true, |d| d.is_finished()) }
}

impl<S, P, SD, Item, Err> Observable<Item, Err> for RetryOp<S, P, SD>
where
  S: Observable<Item, Err> + Clone + Send + 'static,
  P: RetryPolicy<Err> + Send + 'static,
  SD: Scheduler,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let worker = self.scheduler.create_worker();
    let serial = SerialSubscription::new();
    subscriber.add(worker.clone());
    subscriber.add(serial.clone());
    RetryObserver {
      down: Some(subscriber),
      source: self.source,
      policy: self.policy,
      worker,
      serial,
      attempts: 0,
    }
    .subscribe_attempt::<Item, Err>()
  }
}
