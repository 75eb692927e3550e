//! Operators that reify events, or turn an error into a value. All of them are
//! thin observers installed with `lift`.

use crate::{
  notification::Notification,
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct MaterializeOp<S>(S);

impl<S> MaterializeOp<S> {
  pub(crate) fn new(source: S) -> Self { MaterializeOp(source) }
}

struct MaterializeObserver<O>(Subscriber<O>);

impl<Item, Err, O> Observer<Item, Err> for MaterializeObserver<O>
where
  O: Observer<Notification<Item, Err>, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.0.next(Notification::Next(value)) }

  fn error(&mut self, err: Err) {
    self.0.next(Notification::Error(err));
    self.0.complete();
  }

  fn complete(&mut self) {
    self.0.next(Notification::Completed);
    self.0.complete();
  }

  #[inline]
  fn is_finished(&self) -> bool { self.0.is_finished() }
}

impl<S, Item, Err> Observable<Notification<Item, Err>, Err> for MaterializeOp<S>
where
  S: Observable<Item, Err>,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Notification<Item, Err>, Err> + Send + 'static,
  {
    self
      .0
      .lift(|down: Subscriber<BoxObserver<Notification<Item, Err>, Err>>| MaterializeObserver(down))
      .actual_subscribe(subscriber)
  }
}

#[derive(Clone)]
pub struct DematerializeOp<S>(S);

impl<S> DematerializeOp<S> {
  pub(crate) fn new(source: S) -> Self { DematerializeOp(source) }
}

struct DematerializeObserver<O>(Subscriber<O>);

impl<Item, Err, O> Observer<Notification<Item, Err>, Err> for DematerializeObserver<O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, notification: Notification<Item, Err>) { notification.accept(&mut self.0) }

  #[inline]
  fn error(&mut self, err: Err) { self.0.error(err) }

  #[inline]
  fn complete(&mut self) { self.0.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.0.is_finished() }
}

impl<S, Item, Err> Observable<Item, Err> for DematerializeOp<S>
where
  S: Observable<Notification<Item, Err>, Err>,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self
      .0
      .lift(|down: Subscriber<BoxObserver<Item, Err>>| DematerializeObserver(down))
      .actual_subscribe(subscriber)
  }
}

#[derive(Clone)]
pub struct OnErrorReturnOp<S, F> {
  source: S,
  f: F,
}

impl<S, F> OnErrorReturnOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { OnErrorReturnOp { source, f } }
}

struct OnErrorReturnObserver<O, F> {
  down: Subscriber<O>,
  f: Option<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for OnErrorReturnObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(Err) -> Item,
{
  #[inline]
  fn next(&mut self, value: Item) { self.down.next(value) }

  fn error(&mut self, err: Err) {
    if let Some(f) = self.f.take() {
      self.down.next(f(err));
      self.down.complete();
    }
  }

  #[inline]
  fn complete(&mut self) { self.down.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.down.is_finished() }
}

impl<S, F, Item, Err> Observable<Item, Err> for OnErrorReturnOp<S, F>
where
  S: Observable<Item, Err>,
  F: FnOnce(Err) -> Item + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let f = self.f;
    self
      .source
      .lift(move |down: Subscriber<BoxObserver<Item, Err>>| OnErrorReturnObserver { down, f: Some(f) })
      .actual_subscribe(subscriber)
  }
}
