//! One-shot result channel between a submitted task and its submitter

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::Arc;

/// Why a task produced no value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was dropped before it ran")]
    Abandoned,
}

type Outcome<R> = Result<R, TaskError>;

struct Shared<R> {
    outcome: Mutex<Option<Outcome<R>>>,
    ready: Condvar,
}

/// Create a connected completer/handle pair
pub(crate) fn channel<R>() -> (Completer<R>, TaskHandle<R>) {
    let shared = Arc::new(Shared {
        outcome: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        Completer {
            shared: Some(shared.clone()),
        },
        TaskHandle { shared },
    )
}

/// Sending half, owned by the queued job
///
/// Dropping it without completing resolves the handle to `TaskError::Abandoned`.
pub(crate) struct Completer<R> {
    shared: Option<Arc<Shared<R>>>,
}

impl<R> Completer<R> {
    pub(crate) fn complete(mut self, outcome: Outcome<R>) {
        if let Some(shared) = self.shared.take() {
            fulfil(&shared, outcome);
        }
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            fulfil(&shared, Err(TaskError::Abandoned));
        }
    }
}

fn fulfil<R>(shared: &Shared<R>, outcome: Outcome<R>) {
    *shared.outcome.lock() = Some(outcome);
    shared.ready.notify_all();
}

/// Handle to the eventual result of a task submitted with
/// [`ThreadPool::enqueue`](crate::pool::ThreadPool::enqueue)
#[must_use = "the task result is lost if the handle is dropped"]
pub struct TaskHandle<R> {
    shared: Arc<Shared<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has run and return its result
    pub fn join(self) -> Outcome<R> {
        let mut outcome = self.shared.outcome.lock();
        loop {
            if let Some(result) = outcome.take() {
                return result;
            }
            self.shared.ready.wait(&mut outcome);
        }
    }

    /// Take the result if the task has already finished
    pub fn try_take(&mut self) -> Option<Outcome<R>> {
        self.shared.outcome.lock().take()
    }

    /// Whether a result is waiting to be taken
    pub fn is_finished(&self) -> bool {
        self.shared.outcome.lock().is_some()
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
