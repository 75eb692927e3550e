//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

pub use std::time::{Duration, Instant};

pub use crate::{
  error::{CompositeError, UnhandledError},
  hooks::{NoopHooks, SubscribeHooks},
  notification::Notification,
  observable::{self, BoxOp, ConnectableObservable, Observable, ObservableExt},
  observer::{BoxObserver, ContractSafe, Observer},
  ops::{
    merge::{DelayErrors, FailFast},
    ref_count::RefCount,
    retry::{RetryConfig, RetryPolicy},
  },
  scheduler::{Scheduler, TaskHandle, Worker},
  subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject, SubjectLike},
  subscriber::{Emitter, Subscriber},
  subscription::{
    CompositeSubscription, SerialSubscription, SubscriptionGuard, SubscriptionLike,
    SubscriptionWrapper, Teardown,
  },
};
