//! Cancellable, single-resolution unit of asynchronous work.
//!
//! A [`Task`] is a shared handle: the spawned body holds one clone and
//! calls [`Task::checkpoint`] at safe points, while callers hold others to
//! [`Task::get`] the outcome or [`Task::interrupt`] the work. Interruption
//! is cooperative. Requesting it only flips the status to `Interrupting`;
//! the body observes it at its next checkpoint and unwinds with
//! [`Error::Cancelled`].
//!
//! Lifecycle:
//!
//! ```text
//! Pending -> Running -> Ready
//!                    -> Failed
//!                    -> Interrupting -> Interrupted
//! Pending -> Interrupted
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::plog_debug;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, body not started yet.
    Pending,
    /// Body is executing.
    Running,
    /// Interruption requested, waiting for the body to reach a checkpoint.
    Interrupting,
    /// Finished with a result.
    Ready,
    /// Interruption confirmed.
    Interrupted,
    /// Finished with an error.
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Ready | TaskStatus::Interrupted | TaskStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Interrupting => "interrupting",
            TaskStatus::Ready => "ready",
            TaskStatus::Interrupted => "interrupted",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sub-work a task is currently blocked on.
pub enum Dependents<U> {
    Single(Task<U>),
    Many(Vec<Task<U>>),
}

impl<U> Dependents<U> {
    fn into_vec(self) -> Vec<Task<U>> {
        match self {
            Dependents::Single(task) => vec![task],
            Dependents::Many(tasks) => tasks,
        }
    }
}

impl<U> From<Task<U>> for Dependents<U> {
    fn from(task: Task<U>) -> Self {
        Dependents::Single(task)
    }
}

impl<U> From<Vec<Task<U>>> for Dependents<U> {
    fn from(tasks: Vec<Task<U>>) -> Self {
        Dependents::Many(tasks)
    }
}

/// Type-erased view of a dependent task, so a parent can hold children
/// with a different result type.
trait Dependent: Send + Sync {
    fn request_interrupt(&self);
}

/// Serializable view of a task's current state.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot<T> {
    pub id: TaskId,
    pub status: TaskStatus,
    pub result: Option<T>,
    pub error: Option<String>,
}

struct State<T> {
    status: TaskStatus,
    result: Option<T>,
    error: Option<Error>,
    dependents: Option<Vec<Arc<dyn Dependent>>>,
}

struct Inner<T> {
    id: TaskId,
    state: Mutex<State<T>>,
    status_tx: watch::Sender<TaskStatus>,
}

pub struct Task<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("status", &*self.inner.status_tx.borrow())
            .finish()
    }
}

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a task in `Pending`. Most callers want [`Task::spawn`].
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(TaskStatus::Pending);
        Self {
            inner: Arc::new(Inner {
                id: TaskId::next(),
                state: Mutex::new(State {
                    status: TaskStatus::Pending,
                    result: None,
                    error: None,
                    dependents: None,
                }),
                status_tx,
            }),
        }
    }

    /// Create a task and run `body` on the tokio runtime.
    ///
    /// Returns immediately. The body receives its own handle for
    /// checkpoints and dependents; its `Result` finalizes the task. If the
    /// task is interrupted before the body gets scheduled, the body never
    /// runs.
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Task<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let task = Self::new();
        let handle = task.clone();
        tokio::spawn(async move {
            if handle.start().is_err() {
                plog_debug!("{} not started: {}", handle.id(), handle.status());
                return;
            }
            let outcome = body(handle.clone()).await;
            handle.finish(outcome);
        });
        task
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Stored result, once `Ready`.
    pub fn result(&self) -> Option<T> {
        self.lock().result.clone()
    }

    /// Stored error, once `Failed` or `Interrupted`.
    pub fn error(&self) -> Option<Error> {
        self.lock().error.clone()
    }

    /// Number of dependents currently awaited by the body.
    pub fn dependent_count(&self) -> usize {
        self.lock().dependents.as_ref().map_or(0, Vec::len)
    }

    pub fn snapshot(&self) -> TaskSnapshot<T> {
        let state = self.lock();
        TaskSnapshot {
            id: self.inner.id,
            status: state.status,
            result: state.result.clone(),
            error: state.error.as_ref().map(ToString::to_string),
        }
    }

    /// Move `Pending` to `Running`. Fails on any other status.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock();
        if state.status != TaskStatus::Pending {
            return Err(Error::InvalidTransition {
                from: state.status.to_string(),
                to: TaskStatus::Running.to_string(),
            });
        }
        self.transition(&mut state, TaskStatus::Running);
        Ok(())
    }

    /// Finalize with a result. No-op once terminal.
    ///
    /// A body that completes while `Interrupting` (it never reached another
    /// checkpoint) still finalizes as `Ready`.
    pub fn succeed(&self, result: T) {
        let mut state = self.lock();
        if state.status.is_terminal() {
            return;
        }
        state.result = Some(result);
        self.transition(&mut state, TaskStatus::Ready);
    }

    /// Finalize with an error. No-op once terminal.
    ///
    /// A `Cancelled` error while interruption is pending confirms the
    /// interruption instead of failing.
    pub fn fail(&self, error: Error) {
        let mut state = self.lock();
        if state.status.is_terminal() {
            return;
        }
        if error.is_cancelled() && state.status == TaskStatus::Interrupting {
            self.confirm_interrupt(&mut state);
            return;
        }
        state.error = Some(error);
        self.transition(&mut state, TaskStatus::Failed);
    }

    /// Finalize from a body outcome.
    pub fn finish(&self, outcome: Result<T>) {
        match outcome {
            Ok(result) => self.succeed(result),
            Err(err) => self.fail(err),
        }
    }

    pub fn should_interrupt(&self) -> bool {
        self.lock().status == TaskStatus::Interrupting
    }

    /// Safe point for cancellation.
    ///
    /// If interruption was requested, finalize as `Interrupted` and return
    /// `Err(Cancelled)` so the body unwinds with `?`.
    pub fn checkpoint(&self) -> Result<()> {
        let mut state = self.lock();
        if state.status == TaskStatus::Interrupting {
            self.confirm_interrupt(&mut state);
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Request interruption and return a future that resolves once the task
    /// is terminal.
    ///
    /// The request takes effect immediately, even if the returned future is
    /// dropped. A pending task is interrupted on the spot; a running task
    /// forwards the request to every dependent it is waiting on.
    pub fn interrupt(&self) -> impl Future<Output = ()> + Send + 'static {
        self.request_interrupt();
        self.settled()
    }

    /// Resolves once the task reaches a terminal status.
    pub fn settled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.inner.status_tx.subscribe();
        async move {
            let _ = rx.wait_for(TaskStatus::is_terminal).await;
        }
    }

    /// Wait for the outcome. Resolves immediately once terminal.
    pub async fn get(&self) -> Result<T> {
        self.settled().await;
        self.outcome()
    }

    /// Await sub-tasks as dependents.
    ///
    /// All dependents are awaited to settlement regardless of individual
    /// outcomes. While they are recorded, interrupting this task forwards
    /// the interruption to them. Afterwards this task checkpoints, then
    /// returns the results in order or the first dependent error.
    pub async fn wait_dependent<U>(&self, deps: impl Into<Dependents<U>>) -> Result<Vec<U>>
    where
        U: Clone + Send + Sync + 'static,
    {
        let outcomes = self.join_dependents(deps).await?;
        self.checkpoint()?;
        outcomes.into_iter().collect()
    }

    /// Record `deps` as dependents and await every outcome, without the
    /// trailing checkpoint. Callers must checkpoint before using the results.
    pub(crate) async fn join_dependents<U>(
        &self,
        deps: impl Into<Dependents<U>>,
    ) -> Result<Vec<Result<U>>>
    where
        U: Clone + Send + Sync + 'static,
    {
        let tasks = deps.into().into_vec();
        let interrupting = self.open_dependents(&tasks)?;
        if interrupting {
            for task in &tasks {
                task.request_interrupt();
            }
        }

        let outcomes = join_all(tasks.iter().map(|t| t.get())).await;
        self.lock().dependents = None;
        Ok(outcomes)
    }

    /// [`Task::wait_dependent`] for a single sub-task.
    pub async fn wait_dependent_one<U>(&self, task: Task<U>) -> Result<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        let mut results = self.wait_dependent(task).await?;
        results.pop().ok_or(Error::Cancelled)
    }

    fn open_dependents<U>(&self, tasks: &[Task<U>]) -> Result<bool>
    where
        U: Clone + Send + Sync + 'static,
    {
        let mut state = self.lock();
        if state.dependents.is_some() {
            return Err(Error::DependentWaitOpen);
        }
        state.dependents = Some(
            tasks
                .iter()
                .map(|t| Arc::new(t.clone()) as Arc<dyn Dependent>)
                .collect(),
        );
        Ok(state.status == TaskStatus::Interrupting)
    }

    fn request_interrupt(&self) {
        let dependents = {
            let mut state = self.lock();
            match state.status {
                TaskStatus::Pending => {
                    self.confirm_interrupt(&mut state);
                    return;
                }
                TaskStatus::Running => {
                    self.transition(&mut state, TaskStatus::Interrupting);
                    state.dependents.clone().unwrap_or_default()
                }
                _ => return,
            }
        };
        for dep in dependents {
            dep.request_interrupt();
        }
    }

    fn outcome(&self) -> Result<T> {
        let state = self.lock();
        match (state.status, &state.result, &state.error) {
            (TaskStatus::Ready, Some(result), _) => Ok(result.clone()),
            (_, _, Some(err)) => Err(err.clone()),
            _ => Err(Error::Cancelled),
        }
    }

    fn confirm_interrupt(&self, state: &mut State<T>) {
        state.error = Some(Error::Cancelled);
        self.transition(state, TaskStatus::Interrupted);
    }

    fn transition(&self, state: &mut State<T>, to: TaskStatus) {
        plog_debug!("{} {} -> {}", self.inner.id, state.status, to);
        state.status = to;
        self.inner.status_tx.send_replace(to);
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Dependent for Task<U>
where
    U: Clone + Send + Sync + 'static,
{
    fn request_interrupt(&self) {
        Task::request_interrupt(self);
    }
}
