//! Units of work and their lifecycle.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::result::ResultHolder;

/// Lifecycle of a [`Task`].
///
/// ```text
/// Pending --dispatch--> Running --completes--> Finished
///                          \--panics--> Interrupted
/// Finished | Interrupted --reschedule--> Pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Finished,
    /// The work panicked; the result holder was left invalid.
    Interrupted,
}

impl TaskState {
    /// True for the states an executor may leave a task in.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Interrupted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// The computation a task performs.
///
/// `run` receives a scratch copy of the task's seed value and writes its
/// result there; the task publishes it to the result holder once `run`
/// returns. Work may only touch its own partition-local state.
pub trait Work: Send {
    type Output: Clone + Send;

    fn run(&mut self, output: &mut Self::Output);
}

/// Adapts a closure into [`Work`].
pub struct FnWork<F, O> {
    f: F,
    _output: std::marker::PhantomData<fn() -> O>,
}

impl<F, O> FnWork<F, O>
where
    F: FnMut(&mut O) + Send,
    O: Clone + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _output: std::marker::PhantomData,
        }
    }
}

impl<F, O> Work for FnWork<F, O>
where
    F: FnMut(&mut O) + Send,
    O: Clone + Send,
{
    type Output = O;

    fn run(&mut self, output: &mut O) {
        (self.f)(output);
    }
}

/// A unit of work bound to a partition id, with its own result holder.
pub struct Task<W: Work> {
    id: usize,
    state: TaskState,
    work: W,
    seed: W::Output,
    result: ResultHolder<W::Output>,
}

impl<W: Work> Task<W> {
    /// A pending task whose output starts from `seed` on every run.
    pub fn new(id: usize, work: W, seed: W::Output) -> Self {
        let result = ResultHolder::new(seed.clone());
        Self {
            id,
            state: TaskState::Pending,
            work,
            seed,
            result,
        }
    }

    /// Partition id.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn set_state(&mut self, state: TaskState) {
        tracing::trace!(task = self.id, from = %self.state, to = %state, "task state");
        self.state = state;
    }

    pub fn result(&self) -> &ResultHolder<W::Output> {
        &self.result
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    pub fn work_mut(&mut self) -> &mut W {
        &mut self.work
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == TaskState::Finished
    }

    /// Return the task to `Pending` and invalidate its result so it can be
    /// dispatched again.
    pub fn reschedule(&mut self) {
        self.result.invalidate_and_reset(self.seed.clone());
        self.set_state(TaskState::Pending);
    }

    /// Run the work on the current thread.
    ///
    /// A panic inside the work is contained here: the task ends
    /// `Interrupted` and its result stays invalid.
    pub fn run(&mut self) {
        if self.state != TaskState::Pending {
            tracing::debug!(
                task = self.id,
                state = ?self.state,
                "task dispatched without reschedule, resetting"
            );
            self.reschedule();
        }
        self.set_state(TaskState::Running);

        let mut output = self.seed.clone();
        let work = &mut self.work;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work.run(&mut output)));

        match outcome {
            Ok(()) => {
                self.result.set(output);
                self.set_state(TaskState::Finished);
            }
            Err(payload) => {
                tracing::warn!(
                    task = self.id,
                    reason = panic_message(payload.as_ref()),
                    "task interrupted"
                );
                self.set_state(TaskState::Interrupted);
            }
        }
    }
}

impl<W: Work> fmt::Debug for Task<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("valid", &self.result.is_valid())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// True when every task finished.
pub fn all_finished<W: Work>(tasks: &[Task<W>]) -> bool {
    tasks.iter().all(Task::is_finished)
}
