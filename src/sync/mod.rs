//! Blocking primitives the engine is built from.
//!
//! All of them sit on top of `parking_lot` locks and condition variables,
//! which don't poison, so a panicking holder never turns every later lock
//! into an error.

pub mod rwlock;
pub mod sema;
pub mod stop;

pub use rwlock::{FairRwLock, ReadGuard, WriteGuard};
pub use sema::Semaphore;
pub use stop::StopSignal;
