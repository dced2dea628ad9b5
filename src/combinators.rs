//! Combinators over many promises, built only on the public
//! registration contract of [`Promise`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Cause, Promise};

/// Settles with the outcome of whichever input settles first.
///
/// All inputs share one latch, so exactly one of their fulfillments or
/// rejections reaches the output. An empty input never settles.
///
/// ```
/// use promise_chain::{race, Promise};
///
/// let a = Promise::<i32>::new();
/// let b = Promise::<i32>::new();
/// let first = race([a.clone(), b.clone()]);
/// a.fulfill(1).unwrap();
/// b.fulfill(2).unwrap();
/// assert_eq!(*first.wait().unwrap(), 1);
/// ```
pub fn race<T, I>(promises: I) -> Promise<T>
where
    T: Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    let output = Promise::new();
    let claimed = Arc::new(AtomicBool::new(false));
    let mut count = 0usize;
    for (index, promise) in promises.into_iter().enumerate() {
        count += 1;
        let (on_value, latch) = (output.clone(), claimed.clone());
        promise.on_fulfilled_shared(move |value| {
            if !latch.swap(true, Ordering::AcqRel) {
                tracing::debug!(index, "race won by fulfillment");
                on_value.settle_shared(Ok(value));
            }
        });
        let (on_error, latch) = (output.clone(), claimed.clone());
        promise.on_rejected(move |cause| {
            if !latch.swap(true, Ordering::AcqRel) {
                tracing::debug!(index, error = %cause, "race won by rejection");
                on_error.settle_shared(Err(cause.clone()));
            }
        });
    }
    if count == 0 {
        tracing::debug!("race over no promises will never settle");
    }
    output
}

struct Aggregate<T> {
    slots: Mutex<Vec<Option<Arc<T>>>>,
    outstanding: AtomicUsize,
    settled: AtomicBool,
    output: Promise<Vec<T>>,
}

impl<T: Clone + Send + Sync + 'static> Aggregate<T> {
    fn fill(&self, index: usize, value: Arc<T>) {
        self.slots.lock()[index] = Some(value);
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        if self.settled.swap(true, Ordering::AcqRel) {
            return;
        }
        let shared: Option<Vec<Arc<T>>> = self.slots.lock().iter_mut().map(Option::take).collect();
        match shared {
            Some(shared) => {
                // values whose source promise is gone are moved out, the rest are cloned
                let values = shared
                    .into_iter()
                    .map(|value| Arc::try_unwrap(value).unwrap_or_else(|value| (*value).clone()))
                    .collect();
                self.output.settle_shared(Ok(Arc::new(values)));
            }
            None => tracing::warn!("all completed with an empty slot"),
        }
    }

    fn reject(&self, index: usize, cause: &Cause) {
        reject_once(&self.settled, &self.output, index, cause);
    }
}

fn reject_once<R>(settled: &AtomicBool, output: &Promise<R>, index: usize, cause: &Cause)
where
    R: Send + Sync + 'static,
{
    if settled.swap(true, Ordering::AcqRel) {
        tracing::debug!(index, error = %cause, "ignoring rejection after aggregate settled");
        return;
    }
    tracing::debug!(index, error = %cause, "aggregate rejected");
    output.settle_shared(Err(cause.clone()));
}

/// Collects every input's value, in input order.
///
/// Rejects with the first error observed; later errors are swallowed.
/// An empty input resolves immediately with an empty vector.
///
/// The result owns its values, hence `T: Clone`: a value is moved out of
/// its source when nothing else holds that promise any more, and cloned
/// otherwise. Chain [`then`](Promise::then) on the inputs to share
/// instead.
///
/// ```
/// use promise_chain::{all, Promise};
///
/// let inputs: Vec<_> = (0..3).map(|_| Promise::<i32>::new()).collect();
/// let joined = all(inputs.clone());
/// for (i, p) in inputs.iter().enumerate().rev() {
///     p.fulfill(i as i32 + 1).unwrap();
/// }
/// assert_eq!(*joined.wait().unwrap(), vec![1, 2, 3]);
/// ```
pub fn all<T, I>(promises: I) -> Promise<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::resolved(Vec::new());
    }
    let aggregate = Arc::new(Aggregate {
        slots: Mutex::new(vec![None; promises.len()]),
        outstanding: AtomicUsize::new(promises.len()),
        settled: AtomicBool::new(false),
        output: Promise::new(),
    });
    for (index, promise) in promises.iter().enumerate() {
        let on_value = aggregate.clone();
        promise.on_fulfilled_shared(move |value| on_value.fill(index, value));
        let on_error = aggregate.clone();
        promise.on_rejected(move |cause| on_error.reject(index, cause));
    }
    aggregate.output.clone()
}

/// Signal-only [`all`]: fulfilled once every input signal is, rejected
/// with the first error.
pub fn all_signals<I>(signals: I) -> Promise<()>
where
    I: IntoIterator<Item = Promise<()>>,
{
    let signals: Vec<_> = signals.into_iter().collect();
    let output = Promise::new();
    if signals.is_empty() {
        output.settle_shared(Ok(Arc::new(())));
        return output;
    }
    let outstanding = Arc::new(AtomicUsize::new(signals.len()));
    let settled = Arc::new(AtomicBool::new(false));
    for (index, signal) in signals.iter().enumerate() {
        let (remaining, latch, on_value) = (outstanding.clone(), settled.clone(), output.clone());
        signal.on_fulfilled(move |_| {
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 && !latch.swap(true, Ordering::AcqRel)
            {
                on_value.settle_shared(Ok(Arc::new(())));
            }
        });
        let (latch, on_error) = (settled.clone(), output.clone());
        signal.on_rejected(move |cause| reject_once(&latch, &on_error, index, cause));
    }
    output
}
