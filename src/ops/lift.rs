use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  subscriber::Subscriber,
};

/// The observable returned by
/// [`lift`](crate::observable::ObservableExt::lift).
pub struct LiftOp<S, F, In> {
  source: S,
  operator: F,
  _marker: PhantomData<fn(In)>,
}

impl<S: Clone, F: Clone, In> Clone for LiftOp<S, F, In> {
  fn clone(&self) -> Self { LiftOp::new(self.source.clone(), self.operator.clone()) }
}

impl<S, F, In> LiftOp<S, F, In> {
  pub(crate) fn new(source: S, operator: F) -> Self {
    LiftOp { source, operator, _marker: PhantomData }
  }
}

impl<S, F, U, In, Out, Err> Observable<Out, Err> for LiftOp<S, F, In>
where
  S: Observable<In, Err>,
  F: FnOnce(Subscriber<BoxObserver<Out, Err>>) -> U,
  U: Observer<In, Err> + Send + 'static,
  Out: 'static,
  Err: 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Out, Err> + Send + 'static,
  {
    let Subscriber { observer, subscription } = subscriber;
    let downstream: BoxObserver<Out, Err> = Box::new(observer);
    let upstream = (self.operator)(Subscriber::new(downstream, subscription.clone()));
    self
      .source
      .actual_subscribe(Subscriber::new(upstream, subscription));
  }
}
