//! # rxflow: push based stream composition
//!
//! An [`Observable`] describes how to produce a sequence of values for one
//! subscriber. Operators return new descriptors; nothing runs until
//! `subscribe` is called, and every subscription is an independent execution
//! with its own cancellation token.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxflow::prelude::*;
//!
//! let got = Arc::new(Mutex::new(vec![]));
//! let c_got = got.clone();
//! observable::from_iter(0..10)
//!   .buffer_count(4)
//!   .subscribe(move |chunk| c_got.lock().unwrap().push(chunk));
//! assert_eq!(*got.lock().unwrap(), vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
//! ```
//!
//! ## Key concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A lazily evaluated stream descriptor |
//! | [`Observer`] | Consumes `next`, `error` and `complete` events |
//! | [`CompositeSubscription`] | The cancellation token of one subscription |
//! | [`Scheduler`] | Decides where and when deferred work runs |
//! | [`Subject`] | Both an observer and a multicasting observable |
//!
//! ## Feature flags
//!
//! - **`futures-scheduler`** (default): thread pool backed `computation`,
//!   `io` and `new_thread` schedulers.
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`CompositeSubscription`]: subscription::CompositeSubscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`Subject`]: subject::Subject

pub mod error;
pub mod hooks;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;

pub use prelude::*;
