//! Errors produced by the runtime itself, as opposed to the user supplied
//! `Err` type that flows through the data path.

use std::fmt::Debug;

/// The fatal outcome raised when an error reaches a consumer that registered
/// no error handler.
///
/// It is raised with [`std::panic::panic_any`], so it unwinds to the caller of
/// whatever delivered the error (the caller of `subscribe` for synchronous
/// sources) and can be recovered with `catch_unwind` + `downcast`. On a
/// scheduler owned thread the event loop catches it and logs it at `error`
/// level.
#[derive(Debug, thiserror::Error)]
#[error("unhandled error reached a subscriber without an error handler: {0:?}")]
pub struct UnhandledError<E: Debug>(pub E);

/// Aggregate error emitted by the delay-error merge once every source has
/// finished and at least one of them failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} source(s) failed: {errors:?}", .errors.len())]
pub struct CompositeError<E: Debug> {
  pub errors: Vec<E>,
}

impl<E: Debug> CompositeError<E> {
  pub fn new(errors: Vec<E>) -> Self { CompositeError { errors } }

  pub fn len(&self) -> usize { self.errors.len() }

  pub fn is_empty(&self) -> bool { self.errors.is_empty() }

  pub fn into_inner(self) -> Vec<E> { self.errors }
}
