//! Concurrency substrate shared by every control loop.
//!
//! Contains the cancellable task, the sliding-window queue used for
//! stagnation detection, and the advisory lock callers can use to keep
//! motions from overlapping on one agent.

pub mod lock;
pub mod queue;
pub mod task;

pub use lock::{AsyncLock, LockTicket};
pub use queue::Queue;
pub use task::{Dependents, Task, TaskId, TaskSnapshot, TaskStatus};
