//! Continuation chaining: `then`, `and_then` and `error`.
//!
//! Each call creates a fresh downstream promise. A continuation that
//! returns `Err` or panics rejects its downstream promise instead of
//! unwinding into whoever settled the source.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::{Cause, Panicked, Promise};

fn guarded<R>(f: impl FnOnce() -> Result<R, Cause>) -> Result<R, Cause> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let panicked = Panicked::from_payload(payload);
            tracing::warn!(message = %panicked.message, "continuation panicked");
            Err(panicked.into())
        }
    }
}

impl<T: Send + Sync + 'static> Promise<T> {
    /// Chains a transform on the fulfilled value.
    ///
    /// A rejection of `self` skips `f` and rejects the returned promise
    /// with the same cause.
    ///
    /// ```
    /// use promise_chain::{Cause, Promise, Status};
    ///
    /// let source = Promise::<i32>::new();
    /// let ok = source.then(|v| Ok(v * 2));
    /// let failed = source.then(|_| -> Result<i32, Cause> { Err(Cause::msg("nope")) });
    /// source.fulfill(21).unwrap();
    ///
    /// assert_eq!(*ok.wait().unwrap(), 42);
    /// assert_eq!(failed.status(), Status::Rejected);
    /// ```
    pub fn then<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(&T) -> Result<R, Cause> + Send + 'static,
    {
        let downstream = Promise::new();
        let on_value = downstream.clone();
        self.on_fulfilled_shared(move |value| {
            on_value.settle_shared(guarded(|| f(&*value)).map(Arc::new));
        });
        self.reject_into(&downstream);
        downstream
    }

    /// Like [`then`](Promise::then), but `f` returns another promise whose
    /// eventual value or error the returned promise adopts.
    pub fn and_then<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(&T) -> Result<Promise<R>, Cause> + Send + 'static,
    {
        let downstream = Promise::new();
        let on_value = downstream.clone();
        self.on_fulfilled_shared(move |value| match guarded(|| f(&*value)) {
            Ok(inner) => inner.forward_to(&on_value),
            Err(cause) => on_value.settle_shared(Err(cause)),
        });
        self.reject_into(&downstream);
        downstream
    }

    /// Chains a handler on the rejection path.
    ///
    /// The returned signal is fulfilled once `f` returns `Ok`, or right away
    /// if `self` is fulfilled (in which case `f` never runs).
    pub fn error<F>(&self, f: F) -> Promise<()>
    where
        F: FnOnce(&Cause) -> Result<(), Cause> + Send + 'static,
    {
        let downstream = Promise::new();
        let on_value = downstream.clone();
        self.on_fulfilled_shared(move |_| on_value.settle_shared(Ok(Arc::new(()))));
        let on_error = downstream.clone();
        self.on_rejected(move |cause| {
            on_error.settle_shared(guarded(|| f(cause)).map(Arc::new));
        });
        downstream
    }

    fn reject_into<R>(&self, downstream: &Promise<R>)
    where
        R: Send + Sync + 'static,
    {
        let on_error = downstream.clone();
        self.on_rejected(move |cause| on_error.settle_shared(Err(cause.clone())));
    }
}
