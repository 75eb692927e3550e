//! Operators. Each one is an op struct produced by a method of
//! [`ObservableExt`](crate::observable::ObservableExt); stateless ones are
//! built on [`lift`](crate::observable::ObservableExt::lift).

pub mod buffer;
pub mod debounce;
pub mod lift;
pub mod materialize;
pub mod merge;
pub mod observe_on;
pub mod on_error_resume_next;
pub mod ref_count;
pub mod repeat;
pub mod retry;
pub mod sample;
pub mod subscribe_on;
pub mod throttle;
