use crate::config::{MAX_TIMER_DELAY_MS, SchedulerOptions};
use crate::host::{Capabilities, HostHandle};
use crate::queue::{TaskKey, TaskQueue};
use crate::task::{Cancel, Task, WaitUntil};
use crate::{Clock, Time, system_time};
use futures::channel::oneshot;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Multiplexes any number of "call me at `target`" registrations onto a single host timer.
///
/// The handle is cheap to clone; clones share one queue and one armed timer. The scheduler is
/// single-threaded: callbacks run on the host's event loop, one check pass at a time.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tempo_scheduler::ManualHost;
///
/// let host = ManualHost::new();
/// let scheduler = host.scheduler();
/// let fired = Rc::new(Cell::new(None));
///
/// let sink = fired.clone();
/// scheduler.schedule(move |now| sink.set(Some(now)), 250.0);
///
/// host.advance(300.0);
/// assert_eq!(fired.get(), Some(250.0));
/// assert!(!scheduler.is_armed());
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

pub struct SchedulerBuilder {
    capabilities: Capabilities,
    clock: Option<Clock>,
    options: SchedulerOptions,
}

impl SchedulerBuilder {
    pub fn clock(mut self, clock: impl Fn() -> Time + 'static) -> Self {
        self.clock = Some(Rc::new(clock));
        self
    }

    pub fn shared_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Scheduler {
        tracing::debug!(
            capabilities = ?self.capabilities,
            options = ?self.options,
            "creating scheduler"
        );
        Scheduler {
            inner: Rc::new(SchedulerInner {
                clock: self.clock.unwrap_or_else(|| Rc::new(system_time)),
                capabilities: self.capabilities,
                options: self.options,
                state: RefCell::new(State::default()),
            }),
        }
    }
}

impl Scheduler {
    /// A scheduler on the wall clock with default options.
    pub fn new(capabilities: Capabilities) -> Self {
        Self::builder(capabilities).build()
    }

    pub fn builder(capabilities: Capabilities) -> SchedulerBuilder {
        SchedulerBuilder {
            capabilities,
            clock: None,
            options: SchedulerOptions::default(),
        }
    }

    pub fn get_time(&self) -> Time {
        (self.inner.clock)()
    }

    /// Runs `callback` once the clock reaches `target`.
    ///
    /// `±∞` are accepted (`-∞` fires on the next check, `+∞` never fires). A `NaN` target
    /// schedules nothing and yields a no-op handle.
    pub fn schedule(&self, callback: impl FnOnce(Time) + 'static, target: Time) -> Cancel {
        if target.is_nan() {
            tracing::debug!("ignoring task with NaN target");
            return Cancel::noop();
        }

        let (key, is_head) = {
            let mut state = self.inner.state.borrow_mut();
            let key = state.queue.insert(Task::new(Box::new(callback), target));
            (key, state.queue.head().map(|(head, _)| head) == Some(key))
        };
        if is_head {
            self.inner.rearm();
        }
        Cancel::new(Rc::downgrade(&self.inner), key)
    }

    /// Resolves once `target` is reached, yielding the time of the firing check.
    pub fn wait_until(&self, target: Time) -> WaitUntil {
        let (sender, receiver) = oneshot::channel();
        let cancel = self.schedule(
            move |now| {
                let _ = sender.send(now);
            },
            target,
        );
        WaitUntil::new(receiver, cancel)
    }

    /// Fires every task that is due now and re-arms for the rest.
    ///
    /// Hosts call this through the armed timer and the focus listener; calling it directly
    /// forces a resync with the clock. A call made from inside a firing callback is ignored.
    pub fn check(&self) {
        self.inner.check();
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().queue.is_empty()
    }

    /// Whether a host timer or frame request is currently live.
    pub fn is_armed(&self) -> bool {
        self.inner.state.borrow().armed.is_some()
    }

    /// When the armed timer is expected to fire.
    pub fn armed_at(&self) -> Option<Time> {
        self.inner.state.borrow().armed.as_ref().map(|armed| armed.fire_at)
    }

    pub fn next_target(&self) -> Option<Time> {
        self.inner.state.borrow().queue.head_target()
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.inner.options
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Scheduler")
            .field("pending", &state.queue.len())
            .field("armed_at", &state.armed.as_ref().map(|armed| armed.fire_at))
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

pub(crate) struct SchedulerInner {
    clock: Clock,
    capabilities: Capabilities,
    options: SchedulerOptions,
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    queue: TaskQueue,
    armed: Option<Armed>,
    generation: u64,
    dispatching: bool,
}

/// The single live host resource. Released as a unit so a timer never outlives its focus
/// listener or vice versa.
struct Armed {
    mechanism: Mechanism,
    focus: Option<HostHandle>,
    fire_at: Time,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
enum Mechanism {
    Timer(HostHandle),
    Frame(HostHandle),
}

impl SchedulerInner {
    pub(crate) fn contains(&self, key: TaskKey) -> bool {
        self.state.borrow().queue.contains(key)
    }

    pub(crate) fn cancel_task(self: &Rc<Self>, key: TaskKey) {
        let (removed, was_head) = {
            let mut state = self.state.borrow_mut();
            let was_head = state.queue.head().map(|(head, _)| head) == Some(key);
            (state.queue.remove(key), was_head)
        };
        // The callback and whatever it captured drop outside the borrow.
        if removed.is_some() && was_head {
            self.rearm();
        }
    }

    fn check(self: &Rc<Self>) {
        let now = (self.clock)();
        let (due, previous) = {
            let mut state = self.state.borrow_mut();
            if state.dispatching {
                tracing::debug!("check requested while dispatching; deferring to current pass");
                return;
            }
            state.dispatching = true;
            (state.queue.due(now), state.armed.take())
        };
        if let Some(previous) = previous {
            self.release(previous);
        }

        let mut fired = 0usize;
        for key in due {
            // Tasks canceled earlier in this batch are already gone.
            let task = self.state.borrow_mut().queue.remove(key);
            let Some(Task {
                callback, target, ..
            }) = task
            else {
                continue;
            };
            fired += 1;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(now))) {
                tracing::error!(
                    target_time = target,
                    now,
                    "error in scheduled task: {}",
                    panic_message(payload.as_ref())
                );
            }
        }

        self.state.borrow_mut().dispatching = false;
        tracing::trace!(now, fired, "check complete");
        self.rearm();
    }

    /// Points the host timer at the head of the queue, or releases it when the queue is empty.
    fn rearm(self: &Rc<Self>) {
        let now = (self.clock)();
        let mut state = self.state.borrow_mut();
        if state.dispatching {
            return;
        }
        let Some(head) = state.queue.head_target() else {
            if let Some(previous) = state.armed.take() {
                drop(state);
                tracing::trace!("queue drained; disarming");
                self.release(previous);
            }
            return;
        };

        let floor = self.options.throttle_floor(self.capabilities.is_hidden());
        let delay = (head - now).max(floor).min(MAX_TIMER_DELAY_MS);
        let fire_at = now + delay;

        if let Some(armed) = &state.armed {
            if head <= armed.fire_at && fire_at + self.options.rearm_slack_ms >= armed.fire_at {
                return;
            }
        }

        let previous = state.armed.take();
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        if let Some(previous) = previous {
            self.release(previous);
        }
        let armed = self.arm(delay, fire_at, generation);
        self.state.borrow_mut().armed = Some(armed);
    }

    fn arm(self: &Rc<Self>, delay: f64, fire_at: Time, generation: u64) -> Armed {
        let scheduler = Rc::downgrade(self);
        let wake = move || {
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.wake(generation);
            }
        };

        let (mechanism, focus) = match self.capabilities.page() {
            Some(page) if delay <= self.options.frame_threshold_ms => {
                (Mechanism::Frame(page.request_frame(Box::new(wake))), None)
            }
            page => {
                let timer = self
                    .capabilities
                    .timers()
                    .set_timer(Box::new(wake.clone()), delay);
                // Background timers drift; regaining focus forces a resync.
                let focus = page.map(|page| page.add_focus_listener(Rc::new(wake)));
                (Mechanism::Timer(timer), focus)
            }
        };
        tracing::trace!(?mechanism, delay, fire_at, generation, "armed");

        Armed {
            mechanism,
            focus,
            fire_at,
            generation,
        }
    }

    fn wake(self: &Rc<Self>, generation: u64) {
        let current = self
            .state
            .borrow()
            .armed
            .as_ref()
            .map(|armed| armed.generation);
        if current != Some(generation) {
            tracing::trace!(generation, ?current, "ignoring stale wake");
            return;
        }
        self.check();
    }

    fn release(&self, armed: Armed) {
        match armed.mechanism {
            Mechanism::Timer(handle) => self.capabilities.timers().clear_timer(handle),
            Mechanism::Frame(handle) => {
                if let Some(page) = self.capabilities.page() {
                    page.cancel_frame(handle);
                }
            }
        }
        if let (Some(focus), Some(page)) = (armed.focus, self.capabilities.page()) {
            page.remove_focus_listener(focus);
        }
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        if let Some(armed) = self.state.get_mut().armed.take() {
            self.release(armed);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
