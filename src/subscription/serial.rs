use super::{BoxSubscription, SubscriptionLike};
use crate::rc::{MutArc, RcDeref, RcDerefMut};

/// Holds at most one inner subscription at a time. Replacing the inner one
/// unsubscribes the previous; replacing after the serial itself was
/// unsubscribed unsubscribes the newcomer immediately.
///
/// Resubscribing operators (`retry`, `repeat`) keep the subscription of the
/// current attempt here.
#[derive(Clone, Default)]
pub struct SerialSubscription(MutArc<SerialInner>);

#[derive(Default)]
struct SerialInner {
  closed: bool,
  current: Option<BoxSubscription>,
}

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn set<S: SubscriptionLike + Send + 'static>(&self, subscription: S) {
    let subscription: BoxSubscription = Box::new(subscription);
    let mut stale = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        Some(subscription)
      } else {
        inner.current.replace(subscription)
      }
    };
    stale.unsubscribe();
  }
}

impl SubscriptionLike for SerialSubscription {
  fn unsubscribe(&mut self) {
    let mut current = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return;
      }
      inner.closed = true;
      inner.current.take()
    };
    current.unsubscribe();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}
