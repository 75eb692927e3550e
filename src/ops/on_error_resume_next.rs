use crate::{
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::CompositeSubscription,
};

#[derive(Clone)]
pub struct OnErrorResumeNextOp<S, F> {
  source: S,
  f: F,
}

impl<S, F> OnErrorResumeNextOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { OnErrorResumeNextOp { source, f } }
}

struct ResumeObserver<O, F> {
  down: Option<Subscriber<O>>,
  f: Option<F>,
}

impl<Item, Err, O, F, S2> Observer<Item, Err> for ResumeObserver<O, F>
where
  O: Observer<Item, Err> + Send + 'static,
  F: FnOnce(Err) -> S2,
  S2: Observable<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(down) = self.down.as_mut() {
      down.next(value)
    }
  }

  fn error(&mut self, err: Err) {
    if let (Some(down), Some(f)) = (self.down.take(), self.f.take()) {
      f(err).actual_subscribe(down);
    }
  }

  fn complete(&mut self) {
    if let Some(mut down) = self.down.take() {
      down.complete()
    }
  }

  fn is_finished(&self) -> bool { self.down.as_ref().map_or(true, |down| down.is_finished()) }
}

impl<S, F, S2, Item, Err> Observable<Item, Err> for OnErrorResumeNextOp<S, F>
where
  S: Observable<Item, Err>,
  F: FnOnce(Err) -> S2 + Send + 'static,
  S2: Observable<Item, Err>,
{
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    // The source ends with its error; the fallback continues on the
    // downstream token.
    let source_token = CompositeSubscription::new();
    subscriber.add(source_token.clone());
    let observer = ResumeObserver { down: Some(subscriber), f: Some(self.f) };
    self
      .source
      .actual_subscribe(Subscriber::new(observer, source_token));
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[test]
  fn continues_with_fallback() {
    let log = Arc::new(Mutex::new(vec![]));
    let (n, c) = (log.clone(), log.clone());
    observable::create(|mut s: Emitter<i32, String>| {
      s.next(1);
      s.error("boom".to_owned());
      Ok(())
    })
    .on_error_resume_next(|err| {
      assert_eq!(err, "boom");
      observable::create(|mut s: Emitter<i32, String>| {
        s.next(10);
        s.complete();
        Ok(())
      })
    })
    .subscribe_all(
      move |v| n.lock().unwrap().push(v.to_string()),
      |_| panic!("recovered"),
      move || c.lock().unwrap().push("done".to_owned()),
    );
    assert_eq!(*log.lock().unwrap(), vec!["1", "10", "done"]);
  }

  #[test]
  fn fallback_error_reaches_downstream() {
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();
    observable::throw_err::<i32, _>("first")
      .on_error_resume_next(|_| observable::throw_err("second"))
      .subscribe_err(|_| {}, move |e| c_errors.lock().unwrap().push(e));
    assert_eq!(*errors.lock().unwrap(), vec!["second"]);
  }

  #[test]
  fn unsubscribe_reaches_the_fallback() {
    let fallback = Subject::<i32, &'static str>::new();
    let c_fallback = fallback.clone();
    let mut subscription = observable::throw_err::<i32, _>("first")
      .on_error_resume_next(move |_| c_fallback)
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(fallback.observer_count(), 1);
    subscription.unsubscribe();
    assert_eq!(fallback.observer_count(), 0);
  }
}
