//! A deterministic host with a virtual clock, for tests, benchmarks and simulations.

use crate::host::{Capabilities, FocusCallback, HostHandle, PageHost, TimerCallback, TimerHost};
use crate::{Clock, Scheduler, SchedulerOptions, Time};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Counters describing how a scheduler used the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    pub timers_set: usize,
    pub frames_requested: usize,
    pub cleared: usize,
    pub focus_listeners_added: usize,
    /// Highest number of timers and frames that were live at the same time.
    pub max_live: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Timer,
    Frame,
}

struct Pending {
    due: Time,
    kind: Kind,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    pending: BTreeMap<u64, Pending>,
    focus: FxHashMap<u64, FocusCallback>,
    stats: HostStats,
}

impl ManualState {
    fn issue(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn enqueue(&mut self, due: Time, kind: Kind, callback: TimerCallback) -> HostHandle {
        let id = self.issue();
        self.pending.insert(id, Pending { due, kind, callback });
        self.stats.max_live = self.stats.max_live.max(self.pending.len());
        HostHandle(id)
    }

    fn dequeue(&mut self, handle: HostHandle, kind: Kind) {
        if self.pending.get(&handle.0).is_some_and(|p| p.kind == kind) {
            self.pending.remove(&handle.0);
            self.stats.cleared += 1;
        }
    }

    /// Earliest pending entry due at or before `limit`; ties fire in issue order.
    fn next_due(&self, limit: Time) -> Option<u64> {
        self.pending
            .iter()
            .filter(|(_, pending)| pending.due <= limit)
            .min_by(|(a_id, a), (b_id, b)| a.due.total_cmp(&b.due).then(a_id.cmp(b_id)))
            .map(|(&id, _)| id)
    }
}

/// Virtual time, timers, animation frames, visibility and focus, all driven by hand.
///
/// Time only moves through [`advance`](Self::advance), which fires due timers in order with
/// the clock set to each one's due time, or through [`slip`](Self::slip), which moves the
/// clock without firing anything (a backgrounded tab whose timers run late).
pub struct ManualHost {
    now: Cell<Time>,
    hidden: Cell<bool>,
    page: bool,
    frame_interval: Time,
    state: RefCell<ManualState>,
}

impl ManualHost {
    pub const DEFAULT_FRAME_INTERVAL: Time = 16.0;

    /// A host with frames, visibility and focus, starting at time `0`.
    pub fn new() -> Rc<Self> {
        Self::build(true, Self::DEFAULT_FRAME_INTERVAL)
    }

    /// A host offering coarse timers only.
    pub fn timer_only() -> Rc<Self> {
        Self::build(false, Self::DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_frame_interval(frame_interval: Time) -> Rc<Self> {
        Self::build(true, frame_interval)
    }

    fn build(page: bool, frame_interval: Time) -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(0.0),
            hidden: Cell::new(false),
            page,
            frame_interval,
            state: RefCell::new(ManualState::default()),
        })
    }

    pub fn capabilities(self: &Rc<Self>) -> Capabilities {
        if self.page {
            Capabilities::full(Rc::clone(self))
        } else {
            Capabilities::timer_only(Rc::clone(self))
        }
    }

    pub fn clock(self: &Rc<Self>) -> Clock {
        let host = Rc::clone(self);
        Rc::new(move || host.now())
    }

    /// A scheduler on this host's clock with default options.
    pub fn scheduler(self: &Rc<Self>) -> Scheduler {
        self.scheduler_with(SchedulerOptions::default())
    }

    pub fn scheduler_with(self: &Rc<Self>, options: SchedulerOptions) -> Scheduler {
        Scheduler::builder(self.capabilities())
            .shared_clock(self.clock())
            .options(options)
            .build()
    }

    pub fn now(&self) -> Time {
        self.now.get()
    }

    /// Moves the clock forward by `ms`, firing everything that falls due on the way.
    pub fn advance(&self, ms: Time) {
        self.advance_to(self.now() + ms);
    }

    pub fn advance_to(&self, end: Time) {
        loop {
            let fired = {
                let mut state = self.state.borrow_mut();
                state
                    .next_due(end)
                    .and_then(|id| state.pending.remove(&id))
            };
            let Some(pending) = fired else {
                break;
            };
            self.now.set(self.now().max(pending.due));
            (pending.callback)();
        }
        self.now.set(self.now().max(end));
    }

    /// Moves the clock without firing timers.
    pub fn slip(&self, ms: Time) {
        self.now.set(self.now() + ms);
    }

    /// Dispatches a focus event to every registered listener.
    pub fn focus(&self) {
        let listeners: Vec<FocusCallback> = {
            let state = self.state.borrow();
            let mut ids: Vec<_> = state.focus.keys().copied().collect();
            ids.sort_unstable();
            ids.iter().map(|id| Rc::clone(&state.focus[id])).collect()
        };
        for listener in listeners {
            listener();
        }
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    /// Timers and frame requests that have neither fired nor been cleared.
    pub fn live_timers(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn live_focus_listeners(&self) -> usize {
        self.state.borrow().focus.len()
    }

    /// When the earliest live timer or frame will fire.
    pub fn next_due(&self) -> Option<Time> {
        let state = self.state.borrow();
        state.next_due(Time::INFINITY).map(|id| state.pending[&id].due)
    }

    pub fn stats(&self) -> HostStats {
        self.state.borrow().stats
    }
}

impl TimerHost for ManualHost {
    fn set_timer(&self, callback: TimerCallback, delay_ms: f64) -> HostHandle {
        let mut state = self.state.borrow_mut();
        state.stats.timers_set += 1;
        state.enqueue(self.now() + delay_ms.max(0.0), Kind::Timer, callback)
    }

    fn clear_timer(&self, handle: HostHandle) {
        self.state.borrow_mut().dequeue(handle, Kind::Timer);
    }
}

impl PageHost for ManualHost {
    fn request_frame(&self, callback: TimerCallback) -> HostHandle {
        let mut state = self.state.borrow_mut();
        state.stats.frames_requested += 1;
        state.enqueue(self.now() + self.frame_interval, Kind::Frame, callback)
    }

    fn cancel_frame(&self, handle: HostHandle) {
        self.state.borrow_mut().dequeue(handle, Kind::Frame);
    }

    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn add_focus_listener(&self, callback: FocusCallback) -> HostHandle {
        let mut state = self.state.borrow_mut();
        let id = state.issue();
        state.focus.insert(id, callback);
        state.stats.focus_listeners_added += 1;
        HostHandle(id)
    }

    fn remove_focus_listener(&self, handle: HostHandle) {
        self.state.borrow_mut().focus.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must_not_fire() {
        panic!("timer fired unexpectedly");
    }

    #[test]
    fn advance_fires_in_due_order_at_due_time() {
        let host = ManualHost::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(30.0, "late"), (10.0, "early"), (30.0, "late-tie")] {
            let log = log.clone();
            let clock = host.clock();
            host.set_timer(Box::new(move || log.borrow_mut().push((label, clock()))), delay);
        }

        host.advance(25.0);
        assert_eq!(*log.borrow(), vec![("early", 10.0)]);
        assert_eq!(host.now(), 25.0);

        host.advance(25.0);
        assert_eq!(
            *log.borrow(),
            vec![("early", 10.0), ("late", 30.0), ("late-tie", 30.0)]
        );
        assert_eq!(host.now(), 50.0);
    }

    #[test]
    fn cleared_and_fired_handles_are_inert() {
        let host = ManualHost::new();
        let timer = host.set_timer(Box::new(|| {}), 5.0);
        let frame = host.request_frame(Box::new(|| {}));
        assert_eq!(host.live_timers(), 2);

        host.cancel_frame(timer);
        assert_eq!(host.live_timers(), 2, "kinds are not interchangeable");

        host.clear_timer(timer);
        host.clear_timer(timer);
        assert_eq!(host.live_timers(), 1);

        host.advance(ManualHost::DEFAULT_FRAME_INTERVAL);
        host.cancel_frame(frame);
        assert_eq!(host.live_timers(), 0);
        assert_eq!(host.stats().cleared, 1);
        assert_eq!(host.stats().max_live, 2);
    }

    #[test]
    fn slip_moves_clock_without_firing() {
        let host = ManualHost::new();
        host.set_timer(Box::new(must_not_fire), 10.0);
        host.slip(100.0);
        assert_eq!(host.now(), 100.0);
        assert_eq!(host.live_timers(), 1);
        assert_eq!(host.next_due(), Some(10.0));
    }

    #[test]
    fn timer_only_host_hides_page_capabilities() {
        let host = ManualHost::timer_only();
        host.set_hidden(true);
        let capabilities = host.capabilities();
        assert!(capabilities.page().is_none());
        assert!(!capabilities.is_hidden());
    }
}
