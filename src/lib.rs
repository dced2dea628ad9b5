//! Thread-safe promises with chained continuations.
//!
//! A [`Promise`] is a cloneable handle onto a settlement cell that is
//! fulfilled with a value or failed with a [`Cause`] exactly once.
//! Continuations registered with [`Promise::then`], [`Promise::and_then`]
//! and [`Promise::error`] run inline on the thread that settles the cell,
//! or immediately on the registering thread when it is already settled.
//! There is no scheduler: deciding where producer code runs is up to the
//! caller.
//!
//! [`race`], [`all`] and [`all_signals`] combine many promises into one.
//!
//! # Examples
//!
//! ```
//! use promise_chain::{all, Promise};
//! use std::thread;
//!
//! let inputs: Vec<Promise<u32>> = (0..4).map(|_| Promise::new()).collect();
//! let total = all(inputs.clone()).then(|values| Ok(values.iter().sum::<u32>()));
//! let logged = total.error(|cause| {
//!     eprintln!("failed: {cause}");
//!     Ok(())
//! });
//!
//! let workers: Vec<_> = inputs
//!     .into_iter()
//!     .enumerate()
//!     .map(|(i, p)| thread::spawn(move || p.fulfill(i as u32 * 10)))
//!     .collect();
//! for worker in workers {
//!     worker.join().expect("The worker thread has panicked").unwrap();
//! }
//!
//! assert_eq!(*total.wait().unwrap(), 60);
//! assert!(logged.wait().is_ok());
//! ```
//!
//! # Reference cycles
//!
//! Queued continuations hold strong references to the promises they
//! settle. A chain that settles one of its own ancestors keeps every cell
//! in the loop alive forever.

mod cell;
mod chain;
mod combinators;
mod error;
mod promise;
mod settled;

pub use cell::Status;
pub use combinators::{all, all_signals, race};
pub use error::{Cause, InvalidStateError, Panicked};
pub use promise::{Promise, Signal};
pub use settled::Settled;
