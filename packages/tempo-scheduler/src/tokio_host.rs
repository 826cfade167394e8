use crate::host::{Capabilities, HostHandle, TimerCallback, TimerHost};
use crate::{Scheduler, SchedulerOptions};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Coarse timers on a tokio `LocalSet`.
///
/// Every method must be called from within a [`tokio::task::LocalSet`]; timers are local tasks
/// sleeping on the runtime's clock and are aborted when cleared.
#[derive(Default)]
pub struct TokioHost {
    timers: Rc<RefCell<FxHashMap<u64, JoinHandle<()>>>>,
    next_id: Cell<u64>,
}

impl TokioHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn capabilities(self: &Rc<Self>) -> Capabilities {
        Capabilities::timer_only(Rc::clone(self))
    }

    /// A wall-clock scheduler backed by this host.
    pub fn scheduler(self: &Rc<Self>, options: SchedulerOptions) -> Scheduler {
        Scheduler::builder(self.capabilities())
            .options(options)
            .build()
    }

    pub fn live_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl TimerHost for TokioHost {
    fn set_timer(&self, callback: TimerCallback, delay_ms: f64) -> HostHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let delay = Duration::from_secs_f64(delay_ms.max(0.0) / 1000.0);
        let timers = Rc::clone(&self.timers);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            timers.borrow_mut().remove(&id);
            callback();
        });
        self.timers.borrow_mut().insert(id, handle);
        HostHandle(id)
    }

    fn clear_timer(&self, handle: HostHandle) {
        if let Some(timer) = self.timers.borrow_mut().remove(&handle.0) {
            timer.abort();
        }
    }
}
