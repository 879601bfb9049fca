//! Advisory FIFO lock over the shared actuator.
//!
//! Control loops do not lock anything themselves. Callers that may launch
//! motions from several places acquire an [`AsyncLock`] around each motion
//! so only one loop drives the agent at a time.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use super::queue::Queue;

/// Proof of ownership handed out by [`AsyncLock::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockTicket(u64);

#[derive(Default)]
struct LockState {
    locked: bool,
    lock_id: u64,
    waiters: Queue<oneshot::Sender<LockTicket>>,
}

/// Receiver side of a queued `acquire`.
///
/// A ticket handed over after the waiter stopped listening is passed on
/// when the guard drops, so an abandoned `acquire` never strands the lock.
struct PendingTicket<'a> {
    lock: &'a AsyncLock,
    rx: oneshot::Receiver<LockTicket>,
}

impl Drop for PendingTicket<'_> {
    fn drop(&mut self) {
        self.rx.close();
        if let Ok(ticket) = self.rx.try_recv() {
            self.lock.release(ticket);
        }
    }
}

#[derive(Default)]
pub struct AsyncLock {
    state: Mutex<LockState>,
}

impl AsyncLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.lock().locked
    }

    /// Number of callers queued behind the current holder.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Wait for the lock. Waiters are served in arrival order.
    pub async fn acquire(&self) -> LockTicket {
        loop {
            let mut pending = {
                let mut state = self.lock();
                if !state.locked {
                    state.locked = true;
                    state.lock_id += 1;
                    return LockTicket(state.lock_id);
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                PendingTicket { lock: self, rx }
            };
            // A dropped sender means release() skipped an abandoned waiter
            // slot; queue up again.
            if let Ok(ticket) = (&mut pending.rx).await {
                return ticket;
            }
        }
    }

    /// Release the lock. Stale tickets are ignored.
    ///
    /// Ownership passes directly to the oldest waiter still listening.
    pub fn release(&self, ticket: LockTicket) {
        let mut state = self.lock();
        if !state.locked || ticket.0 != state.lock_id {
            return;
        }
        while let Some(waiter) = state.waiters.pop_front() {
            let next = LockTicket(state.lock_id + 1);
            if waiter.send(next).is_ok() {
                state.lock_id += 1;
                return;
            }
        }
        state.locked = false;
    }

    fn lock(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
