use std::fmt;
use std::sync::Arc;

use crate::cell::Shared;
use crate::{Cause, InvalidStateError, Status};

/// A cloneable handle onto a value or error that becomes available later.
///
/// Every clone refers to the same settlement cell: settling through one
/// handle is observed through all of them. Continuations run on whichever
/// thread settles the promise, or immediately on the registering thread
/// when it is already settled.
///
/// # Examples
///
/// ```
/// use promise_chain::Promise;
/// use std::thread;
///
/// let promise = Promise::<String>::new();
/// let doubled = promise.then(|s| Ok(s.repeat(2)));
///
/// let producer = promise.clone();
/// thread::spawn(move || producer.fulfill("🍓".into()).unwrap())
///     .join()
///     .expect("The producer thread has panicked");
///
/// assert_eq!(*doubled.wait().unwrap(), "🍓🍓");
/// ```
pub struct Promise<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Promise {
            shared: Arc::new(Shared::new()),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.shared.status())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Promise<T> {
    /// A fresh pending promise.
    pub fn new() -> Self {
        Self::default()
    }

    /// A promise that is already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.settle_shared(Ok(Arc::new(value)));
        promise
    }

    /// A promise that is already rejected with `cause`.
    pub fn rejected(cause: Cause) -> Self {
        let promise = Self::new();
        promise.settle_shared(Err(cause));
        promise
    }

    /// Snapshot of where the promise is right now.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// Settles the promise with `value` and runs the queued continuations
    /// on the calling thread, in registration order.
    ///
    /// If a callback panics the remaining ones still run, and the first
    /// panic is resumed afterwards.
    pub fn fulfill(&self, value: T) -> Result<(), InvalidStateError> {
        self.shared.fulfill(Arc::new(value))
    }

    /// Settles the promise with `cause` and runs the queued error handlers
    /// on the calling thread, in registration order.
    pub fn fail(&self, cause: Cause) -> Result<(), InvalidStateError> {
        self.shared.fail(cause)
    }

    /// Returns a settled promise to pending so it can be settled again.
    ///
    /// Continuations chained before the reset have already fired or been
    /// discarded; they do not observe the next settlement.
    pub fn reset(&self) -> Result<(), InvalidStateError> {
        self.shared.reset()
    }

    /// Calls `f` with the value once the promise is fulfilled.
    /// Never called if the promise is rejected.
    pub fn on_fulfilled<F>(&self, f: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.shared.on_fulfilled(Box::new(move |value| f(&*value)));
    }

    /// Calls `f` with the cause once the promise is rejected.
    /// Never called if the promise is fulfilled.
    pub fn on_rejected<F>(&self, f: F)
    where
        F: FnOnce(&Cause) + Send + 'static,
    {
        self.shared.on_rejected(Box::new(move |cause| f(&cause)));
    }

    pub(crate) fn on_fulfilled_shared<F>(&self, f: F)
    where
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        self.shared.on_fulfilled(Box::new(f));
    }

    /// Settles with an outcome the caller cannot observe a failure for:
    /// a second settlement is logged and dropped.
    pub(crate) fn settle_shared(&self, outcome: Result<Arc<T>, Cause>) {
        let result = match outcome {
            Ok(value) => self.shared.fulfill(value),
            Err(cause) => self.shared.fail(cause),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "dropping settlement of a promise settled elsewhere");
        }
    }

    /// Forwards this promise's eventual outcome, value or error, into `target`.
    pub(crate) fn forward_to(&self, target: &Promise<T>) {
        let on_value = target.clone();
        self.on_fulfilled_shared(move |value| on_value.settle_shared(Ok(value)));
        let on_error = target.clone();
        self.shared
            .on_rejected(Box::new(move |cause| on_error.settle_shared(Err(cause))));
    }
}

/// A promise that carries no value, only the fact that something happened.
pub type Signal = Promise<()>;

impl Promise<()> {
    /// Fulfills a signal.
    pub fn resolve(&self) -> Result<(), InvalidStateError> {
        self.fulfill(())
    }

    /// Chains `f` on a signal; see [`Promise::then`].
    pub fn then_do<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce() -> Result<R, Cause> + Send + 'static,
    {
        self.then(move |_| f())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_clones_share_state() {
        let a = Promise::<u8>::new();
        let b = a.clone();
        a.fulfill(1).unwrap();
        assert_eq!(b.status(), Status::Fulfilled);
        assert!(b.fulfill(2).is_err());
    }

    #[test]
    fn test_resolved_and_rejected() {
        assert_eq!(Promise::resolved(3).status(), Status::Fulfilled);
        assert_eq!(
            Promise::<u8>::rejected(Cause::msg("x")).status(),
            Status::Rejected
        );
    }

    #[test]
    fn test_signal_resolve() {
        let signal = Signal::new();
        let seen = Arc::new(Mutex::new(false));
        let sink = seen.clone();
        signal.on_fulfilled(move |_| *sink.lock().unwrap() = true);
        signal.resolve().unwrap();
        assert!(*seen.lock().unwrap());
        assert_eq!(
            signal.resolve(),
            Err(InvalidStateError::AlreadySettled {
                status: Status::Fulfilled
            })
        );
    }

    #[test]
    fn test_forward_to_carries_errors() {
        let source = Promise::<u8>::new();
        let target = Promise::<u8>::new();
        source.forward_to(&target);
        source.fail(Cause::msg("lost")).unwrap();
        assert_eq!(target.status(), Status::Rejected);
    }

    #[test]
    fn test_reset_then_settle_again() {
        let promise = Promise::<u8>::new();
        assert_eq!(promise.reset(), Err(InvalidStateError::ResetPending));
        promise.fail(Cause::msg("first")).unwrap();
        promise.reset().unwrap();
        assert_eq!(promise.status(), Status::Pending);
        promise.fulfill(9).unwrap();
        assert_eq!(*promise.wait().unwrap(), 9);
    }

    #[test]
    fn test_panicking_observer_does_not_strand_chain() {
        let source = Promise::<i32>::new();
        source.on_fulfilled(|_| panic!("observer bug"));
        let chained = source.then(|v| Ok(v + 1));
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| source.fulfill(1)));
        assert!(unwound.is_err());
        assert_eq!(source.status(), Status::Fulfilled);
        assert_eq!(chained.status(), Status::Fulfilled);
        assert_eq!(*chained.wait().unwrap(), 2);
    }

    #[test]
    fn test_debug_shows_status() {
        let promise = Promise::<u8>::new();
        assert_eq!(format!("{promise:?}"), "Promise { status: Pending }");
    }
}
