//! Discrete tick counter.
//!
//! `wait_ticks` resolves in tick order: a waiter registered for tick `t`
//! wakes on the first advance that reaches `t`, and every waiter sees the
//! counter move forward monotonically.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{plog_debug, plog_trace};

use super::ActorHandle;

/// Default world tick rate: 20 ticks per second.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct TickClock {
    tick_tx: watch::Sender<u64>,
}

impl TickClock {
    pub fn new() -> Self {
        let (tick_tx, _) = watch::channel(0);
        Self { tick_tx }
    }

    pub fn now(&self) -> u64 {
        *self.tick_tx.borrow()
    }

    /// Advance by one tick and wake every waiter whose target was reached.
    pub fn advance(&self) -> u64 {
        let mut now = 0;
        self.tick_tx.send_modify(|tick| {
            *tick += 1;
            now = *tick;
        });
        now
    }

    /// Suspend until `n` ticks after the current one.
    pub async fn wait_ticks(&self, n: u32) {
        let target = self.now() + u64::from(n);
        self.wait_until(target).await;
    }

    /// Suspend until the counter reaches `tick`.
    pub async fn wait_until(&self, tick: u64) {
        let mut rx = self.tick_tx.subscribe();
        let _ = rx.wait_for(|now| *now >= tick).await;
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

type TickHook = Box<dyn FnMut(u64) + Send>;

/// Actor advancing a shared [`TickClock`] at a fixed interval.
pub struct ClockDriver {
    clock: Arc<TickClock>,
    interval: Duration,
    on_tick: Option<TickHook>,
}

impl ClockDriver {
    pub fn new(clock: Arc<TickClock>) -> Self {
        Self {
            clock,
            interval: DEFAULT_TICK_INTERVAL,
            on_tick: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run `hook` with the upcoming tick number before each advance, e.g. to
    /// step a world model.
    pub fn with_hook(mut self, hook: impl FnMut(u64) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(hook));
        self
    }

    pub fn spawn(mut self) -> ActorHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        plog_debug!("ClockDriver::spawn interval={:?}", self.interval);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // Late ticks are delayed rather than burst, so each tick is
            // observable on its own.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        plog_debug!("ClockDriver cancelled at tick {}", self.clock.now());
                        break;
                    }
                    _ = interval.tick() => {
                        let next = self.clock.now() + 1;
                        if let Some(hook) = self.on_tick.as_mut() {
                            hook(next);
                        }
                        self.clock.advance();
                        plog_trace!("tick {}", next);
                    }
                }
            }
        });

        ActorHandle::new(cancel)
    }
}
