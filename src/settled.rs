//! Ways to observe a promise from outside the continuation graph: block
//! the current thread, or await it from an executor of your choice.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::{Condvar, Mutex};

use crate::{Cause, Promise};

type Outcome<T> = Result<Arc<T>, Cause>;

struct Slot<T> {
    outcome: Option<Outcome<T>>,
    wakers: Vec<Waker>,
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
}

impl<T> Inner<T> {
    fn complete(&self, outcome: Outcome<T>) {
        let wakers = {
            let mut slot = self.slot.lock();
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.wakers)
        };
        self.settled.notify_all();
        for waker in wakers {
            waker.wake()
        }
    }
}

/// Resolves to the outcome of a [`Promise`] once it settles.
///
/// Many `Settled` values may wait on the same promise; all of them are
/// woken by its settlement.
///
/// ```
/// use promise_chain::Promise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let promise = Promise::<String>::new();
/// let first = promise.settled();
/// let second = promise.settled();
/// let task1 = thread::spawn(move || block_on(async {
///     println!("Received on task 1 {:?}", first.await);
/// }));
/// let task2 = thread::spawn(move || block_on(async {
///     println!("Received on task 2 {:?}", second.await);
/// }));
/// promise.fulfill("Hi".into()).unwrap();
/// task1.join().expect("The task1 thread has panicked.");
/// task2.join().expect("The task2 thread has panicked.");
/// ```
pub struct Settled<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Future for Settled<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.inner.slot.lock();
        let slot = &mut *guard;
        match slot.outcome {
            Some(ref outcome) => Poll::Ready(outcome.clone()),
            None => {
                if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    slot.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T: Send + Sync + 'static> Promise<T> {
    /// A future resolving to this promise's value or cause.
    ///
    /// It observes the settlement current when it was created; after a
    /// [`reset`](Promise::reset), ask for a new one.
    pub fn settled(&self) -> Settled<T> {
        let inner = Arc::new(Inner {
            slot: Mutex::new(Slot {
                outcome: None,
                wakers: Vec::new(),
            }),
            settled: Condvar::new(),
        });
        let on_value = inner.clone();
        self.on_fulfilled_shared(move |value| on_value.complete(Ok(value)));
        let on_error = inner.clone();
        self.on_rejected(move |cause| on_error.complete(Err(cause.clone())));
        Settled { inner }
    }

    /// Blocks the calling thread until the promise settles.
    ///
    /// Calling this on the thread that is expected to settle the promise
    /// never returns.
    pub fn wait(&self) -> Outcome<T> {
        let settled = self.settled();
        let mut slot = settled.inner.slot.lock();
        loop {
            if let Some(ref outcome) = slot.outcome {
                return outcome.clone();
            }
            settled.inner.settled.wait(&mut slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use std::thread;
    use std::time::Duration;

    use crate::{Cause, Promise};

    #[test]
    fn test_wait_across_threads() {
        let promise = Promise::<i32>::new();
        let producer = promise.clone();
        let task = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.fulfill(42).unwrap();
        });
        assert_eq!(*promise.wait().unwrap(), 42);
        task.join().expect("The producer thread has panicked");
    }

    #[test]
    fn test_wait_on_rejected() {
        let promise = Promise::<i32>::rejected(Cause::msg("gone"));
        assert_eq!(promise.wait().unwrap_err().to_string(), "gone");
    }

    #[test]
    fn test_settled_future_across_threads() {
        let promise = Promise::<String>::new();
        let consumer = promise.settled();
        let task1 = thread::spawn(move || block_on(async { consumer.await }));
        let task2 = thread::spawn(move || promise.fulfill(String::from("🍓")).unwrap());
        task2.join().expect("The task2 thread has panicked");
        let value = task1.join().expect("The task1 thread has panicked");
        assert_eq!(*value.unwrap(), "🍓");
    }

    #[test]
    fn test_two_settled_futures() {
        let promise = Promise::<()>::new();
        let first = promise.settled();
        let second = promise.settled();
        let task1 = thread::spawn(move || block_on(first).is_err());
        let task2 = thread::spawn(move || block_on(second).is_err());
        promise.fail(Cause::msg("reject!!")).unwrap();
        assert!(task1.join().expect("The task1 thread has panicked"));
        assert!(task2.join().expect("The task2 thread has panicked"));
    }
}
