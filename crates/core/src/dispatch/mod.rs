//! Serialized call dispatch for registry-affecting operations.
//!
//! Every RPC handler wraps its registry work in a [`CallUnit`] and hands it
//! to the [`CallDispatcher`]. A single [`CallRunner`] task drains units in
//! FIFO arrival order and executes them one at a time against the shared
//! call context, so registry mutation is serialized by confinement rather
//! than per-field locking. The lifetime watchdog is the one writer outside
//! this loop; it synchronizes through the same context mutex.

mod context;
mod handle;
mod runner;
mod unit;

pub use context::{shared_context, CallContext, SharedCallContext};
pub use handle::CallDispatcher;
pub use runner::{create_call_dispatch, CallRunner};
pub use unit::CallUnit;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher is shutting down or its runner is gone; the call was
    /// rejected rather than left to hang.
    #[error("call dispatcher unavailable")]
    Unavailable,
}
