//! Background actors.
//!
//! Each actor is an independent tokio task stopped through a cancellation
//! token. The only actor here is the tick clock driver, which advances a
//! [`TickClock`] at a fixed interval for adapters that have no tick source
//! of their own.

pub mod clock;

use tokio_util::sync::CancellationToken;

pub use clock::{ClockDriver, TickClock};

/// Handle to a running actor, used for graceful shutdown.
pub struct ActorHandle {
    cancel: CancellationToken,
}

impl ActorHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Signal the actor to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ActorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
