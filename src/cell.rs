//! The settlement cell behind every [`Promise`](crate::Promise) handle.
//!
//! All mutation happens under the cell's mutex, but callbacks are always
//! invoked after the guard is released, so a callback may register on or
//! settle the very cell that is invoking it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Cause, InvalidStateError};

pub(crate) type Continuation<T> = Box<dyn FnOnce(Arc<T>) + Send>;
pub(crate) type ErrorHandler = Box<dyn FnOnce(Cause) + Send>;

/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        self != Status::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pending => "pending",
            Status::Fulfilled => "fulfilled",
            Status::Rejected => "rejected",
        })
    }
}

enum Outcome<T> {
    Pending,
    Fulfilled(Arc<T>),
    Rejected(Cause),
}

struct State<T> {
    outcome: Outcome<T>,
    continuations: Vec<Continuation<T>>,
    error_handlers: Vec<ErrorHandler>,
}

impl<T> State<T> {
    fn status(&self) -> Status {
        match self.outcome {
            Outcome::Pending => Status::Pending,
            Outcome::Fulfilled(_) => Status::Fulfilled,
            Outcome::Rejected(_) => Status::Rejected,
        }
    }

    fn ensure_pending(&self) -> Result<(), InvalidStateError> {
        match self.status() {
            Status::Pending => Ok(()),
            status => Err(InvalidStateError::AlreadySettled { status }),
        }
    }

    fn take_queues(&mut self) -> (Vec<Continuation<T>>, Vec<ErrorHandler>) {
        (
            std::mem::take(&mut self.continuations),
            std::mem::take(&mut self.error_handlers),
        )
    }
}

/// Runs every callback even if some of them panic, then resumes the
/// first panic once the queue is empty.
fn drain<A: Clone>(callbacks: Vec<Box<dyn FnOnce(A) + Send>>, arg: A) {
    let mut first_panic = None;
    for callback in callbacks {
        let arg = arg.clone();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || callback(arg))) {
            tracing::warn!("callback panicked during settlement");
            first_panic.get_or_insert(payload);
        }
    }
    if let Some(payload) = first_panic {
        panic::resume_unwind(payload);
    }
}

pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        Shared {
            state: Mutex::new(State {
                outcome: Outcome::Pending,
                continuations: Vec::new(),
                error_handlers: Vec::new(),
            }),
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.state.lock().status()
    }

    pub(crate) fn fulfill(&self, value: Arc<T>) -> Result<(), InvalidStateError> {
        let (continuations, error_handlers) = {
            let mut state = self.state.lock();
            state.ensure_pending()?;
            state.outcome = Outcome::Fulfilled(value.clone());
            state.take_queues()
        };
        drop(error_handlers);
        tracing::trace!(queued = continuations.len(), "promise fulfilled");
        drain(continuations, value);
        Ok(())
    }

    pub(crate) fn fail(&self, cause: Cause) -> Result<(), InvalidStateError> {
        let (continuations, error_handlers) = {
            let mut state = self.state.lock();
            state.ensure_pending()?;
            state.outcome = Outcome::Rejected(cause.clone());
            state.take_queues()
        };
        drop(continuations);
        tracing::trace!(queued = error_handlers.len(), error = %cause, "promise rejected");
        drain(error_handlers, cause);
        Ok(())
    }

    /// Queues `continuation`, or runs it right away if the cell is
    /// already fulfilled. Dropped unused if the cell was rejected.
    pub(crate) fn on_fulfilled(&self, continuation: Continuation<T>) {
        let value = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match &state.outcome {
                Outcome::Pending => {
                    state.continuations.push(continuation);
                    tracing::trace!(queued = state.continuations.len(), "continuation queued");
                    return;
                }
                Outcome::Fulfilled(value) => value.clone(),
                Outcome::Rejected(_) => return,
            }
        };
        continuation(value);
    }

    /// Queues `handler`, or runs it right away if the cell is already
    /// rejected. Dropped unused if the cell was fulfilled.
    pub(crate) fn on_rejected(&self, handler: ErrorHandler) {
        let cause = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match &state.outcome {
                Outcome::Pending => {
                    state.error_handlers.push(handler);
                    tracing::trace!(queued = state.error_handlers.len(), "error handler queued");
                    return;
                }
                Outcome::Rejected(cause) => cause.clone(),
                Outcome::Fulfilled(_) => return,
            }
        };
        handler(cause);
    }

    pub(crate) fn reset(&self) -> Result<(), InvalidStateError> {
        let queues = {
            let mut state = self.state.lock();
            if state.status() == Status::Pending {
                return Err(InvalidStateError::ResetPending);
            }
            state.outcome = Outcome::Pending;
            state.take_queues()
        };
        drop(queues);
        tracing::trace!("promise reset");
        Ok(())
    }
}
