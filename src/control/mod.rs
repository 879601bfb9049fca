//! Tick-synchronous motion control loops.
//!
//! Every loop follows the same shape:
//!
//! 1. The factory validates arguments and preconditions synchronously and
//!    returns an error without spawning anything if they fail.
//! 2. The spawned body snapshots the start position, orients the agent and
//!    checkpoints.
//! 3. Each tick it holds its intent vector, waits for the next tick,
//!    checkpoints, resamples the position and classifies the outcome:
//!    orthogonal drift, vertical drift, goal reached, overshoot, stagnation.
//! 4. Every exit path releases all controls before the task is finalized.
//!
//! No loop retries internally; a failed motion is reported through its
//! [`Task`] and it is up to the caller to try again.

pub mod cruise;
pub mod flight;
pub mod ladder;
pub mod land;
pub mod walk;

use std::future::Future;
use std::sync::Arc;

use crate::agent::{Agent, ControlState};
use crate::config::{Config, MotionTuning, StagnationCheck};
use crate::core::{Queue, Task};
use crate::geometry::Vec3;
use crate::{plog, plog_trace, Error, Result};

pub use cruise::CruiseSummary;
pub use flight::AscentSummary;
pub use walk::{JumpTactic, MoveLevel};

/// Entry point for launching motions on one agent.
///
/// Cheap to clone. Only one motion should drive a given agent at a time;
/// use [`crate::core::AsyncLock`] if several callers share it.
#[derive(Clone)]
pub struct Controller {
    agent: Arc<dyn Agent>,
    tuning: Arc<MotionTuning>,
    skip_validation: bool,
}

impl Controller {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            tuning: Arc::new(MotionTuning::default()),
            skip_validation: false,
        }
    }

    pub fn from_config(agent: Arc<dyn Agent>, config: &Config) -> Self {
        Self {
            agent,
            tuning: Arc::new(config.motion.clone()),
            skip_validation: config.skip_validation,
        }
    }

    pub fn with_tuning(mut self, tuning: MotionTuning) -> Self {
        self.tuning = Arc::new(tuning);
        self
    }

    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn tuning(&self) -> &MotionTuning {
        &self.tuning
    }

    /// Spawn a motion body. Controls are released on every exit path
    /// before the task is finalized.
    pub(crate) fn spawn_motion<T, F, Fut>(&self, name: &'static str, body: F) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(MotionCtx<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let agent = Arc::clone(&self.agent);
        Task::spawn(move |task| async move {
            plog!("{} started as {} at tick {}", name, task.id(), agent.current_tick());
            let ctx = MotionCtx::new(Arc::clone(&agent), task.clone());
            let outcome = body(ctx).await;
            agent.clear_controls();
            match &outcome {
                Ok(_) => plog!("{} {} succeeded at tick {}", name, task.id(), agent.current_tick()),
                Err(err) => plog!(
                    "{} {} ended at tick {}: {}",
                    name,
                    task.id(),
                    agent.current_tick(),
                    err
                ),
            }
            outcome
        })
    }
}

/// Per-invocation state handed to a loop body.
pub(crate) struct MotionCtx<T> {
    pub agent: Arc<dyn Agent>,
    pub task: Task<T>,
    pub controls: ControlState,
    /// Ticks observed so far.
    pub ticks: u32,
}

impl<T> MotionCtx<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(agent: Arc<dyn Agent>, task: Task<T>) -> Self {
        Self {
            agent,
            task,
            controls: ControlState::new(),
            ticks: 0,
        }
    }

    /// Push the intent vector to the agent.
    pub fn apply(&self) {
        self.controls.apply(&*self.agent);
    }

    /// Release every control, locally and on the agent.
    pub fn release(&mut self) {
        self.controls.clear();
        self.agent.clear_controls();
    }

    /// Cancellation point. Controls are released before an interruption is
    /// confirmed.
    pub fn checkpoint(&self) -> Result<()> {
        if self.task.should_interrupt() {
            self.agent.clear_controls();
        }
        self.task.checkpoint()
    }

    /// Wait one tick, checkpoint, reapply intents and return the new
    /// position.
    pub async fn tick(&mut self) -> Result<Vec3> {
        self.agent.wait_ticks(1).await;
        self.checkpoint()?;
        self.apply();
        self.ticks += 1;
        let pos = self.agent.position();
        plog_trace!("{} tick {} pos {}", self.task.id(), self.ticks, pos);
        Ok(pos)
    }

    /// Await a sub-motion as a dependent of this one. Interruption is
    /// forwarded to it and confirmed here only after controls are released.
    pub async fn wait_dependent_one<U>(&self, dep: Task<U>) -> Result<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        let mut outcomes = self.task.join_dependents(dep).await?;
        self.checkpoint()?;
        outcomes.pop().unwrap_or(Err(Error::Cancelled))
    }

    pub async fn look(&self, yaw: f64, pitch: f64) -> Result<()> {
        self.agent.look(yaw, pitch, true).await;
        self.checkpoint()
    }

    /// Pin x and z to `target` and kill horizontal velocity.
    pub fn settle_xz(&self, target: Vec3) {
        let pos = self.agent.position();
        self.agent.set_position(pos.with_xz_of(target));
        let vel = self.agent.velocity();
        self.agent.set_velocity(Vec3::new(0.0, vel.y, 0.0));
    }
}

/// Sliding-window check for lack of progress.
///
/// Keeps the last `window` samples and, every `stride` samples once the
/// window is full, compares the newest against the oldest.
#[derive(Debug, Clone)]
pub struct StagnationDetector {
    samples: Queue<Vec3>,
    check: StagnationCheck,
    pushed: u64,
}

impl StagnationDetector {
    pub fn new(check: StagnationCheck, start: Vec3) -> Self {
        let mut samples = Queue::bounded(check.window.max(StagnationCheck::MIN_WINDOW));
        samples.push(start);
        Self {
            samples,
            check,
            pushed: 0,
        }
    }

    /// Restart the window from `pos`.
    pub fn reset(&mut self, pos: Vec3) {
        self.samples.clear();
        self.samples.push(pos);
        self.pushed = 0;
    }

    /// Record a sample and report whether the agent is stagnating.
    pub fn push(&mut self, pos: Vec3) -> bool {
        self.samples.push(pos);
        self.pushed += 1;
        if !self.samples.is_full() || self.pushed % u64::from(self.check.stride.max(1)) != 0 {
            return false;
        }
        self.samples
            .front()
            .is_some_and(|oldest| pos.distance_squared(*oldest) < self.check.epsilon)
    }

    /// Oldest sample in the window.
    pub fn oldest(&self) -> Option<Vec3> {
        self.samples.front().copied()
    }
}
