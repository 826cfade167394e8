use crate::Time;
use crate::queue::{Slot, TaskKey};
use crate::scheduler::SchedulerInner;
use futures::channel::oneshot;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

/// Callback run once, with the time of the check that found it due.
pub type TaskFn = Box<dyn FnOnce(Time)>;

pub(crate) struct Task {
    pub(crate) callback: TaskFn,
    pub(crate) target: Time,
    pub(crate) slot: Slot,
}

impl Task {
    pub(crate) fn new(callback: TaskFn, target: Time) -> Self {
        Self {
            callback,
            target,
            slot: Slot::UNQUEUED,
        }
    }
}

/// Handle returned by [`crate::Scheduler::schedule`].
///
/// Canceling is idempotent and safe at any point: twice, after the task fired, from inside
/// another task's callback, or after the scheduler itself is gone. Dropping the handle does
/// not cancel the task.
#[derive(Clone, Default)]
pub struct Cancel {
    task: Option<(Weak<SchedulerInner>, TaskKey)>,
}

impl Cancel {
    pub(crate) fn new(scheduler: Weak<SchedulerInner>, key: TaskKey) -> Self {
        Self {
            task: Some((scheduler, key)),
        }
    }

    /// A handle for a task that was never scheduled.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if let Some((scheduler, key)) = &self.task {
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.cancel_task(*key);
            }
        }
    }

    /// Whether the task is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|(scheduler, key)| {
            scheduler
                .upgrade()
                .is_some_and(|scheduler| scheduler.contains(*key))
        })
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancel")
            .field("key", &self.task.as_ref().map(|(_, key)| key))
            .finish()
    }
}

/// Future returned by [`crate::Scheduler::wait_until`].
///
/// Resolves to the firing time, or to `None` if the task can never fire (a `NaN` target, or
/// the scheduler was dropped). Dropping the future cancels the task.
pub struct WaitUntil {
    fired: oneshot::Receiver<Time>,
    cancel: Cancel,
}

impl WaitUntil {
    pub(crate) fn new(fired: oneshot::Receiver<Time>, cancel: Cancel) -> Self {
        Self { fired, cancel }
    }
}

impl Future for WaitUntil {
    type Output = Option<Time>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.fired).poll(cx).map(Result::ok)
    }
}

impl Drop for WaitUntil {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
