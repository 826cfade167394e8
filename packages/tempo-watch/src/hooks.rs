//! The concrete watches, and `use_*` constructors that resolve the scheduler from [`context`].
//!
//! [`context`]: crate::context

use crate::watch::{Sampler, Watch};
use crate::{WatchError, context};
use tempo_quantize::{QuantizeError, Sample, Time};
use tempo_scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalParams {
    pub interval: Time,
    pub anchor: Option<Time>,
    pub stop_at_anchor: bool,
}

impl Sampler for IntervalParams {
    type Value = Time;

    fn sample(&self, now: Time) -> Result<Sample<Time>, QuantizeError> {
        tempo_quantize::time_interval(now, self.interval, self.anchor, self.stop_at_anchor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownParams {
    pub target: Time,
    pub interval: Time,
}

impl Sampler for CountdownParams {
    type Value = f64;

    fn sample(&self, now: Time) -> Result<Sample<f64>, QuantizeError> {
        tempo_quantize::countdown(now, self.target, self.interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AfterParams {
    pub target: Time,
}

impl Sampler for AfterParams {
    type Value = bool;

    fn sample(&self, now: Time) -> Result<Sample<bool>, QuantizeError> {
        tempo_quantize::is_after(now, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeforeParams {
    pub target: Time,
}

impl Sampler for BeforeParams {
    type Value = bool;

    fn sample(&self, now: Time) -> Result<Sample<bool>, QuantizeError> {
        tempo_quantize::is_before(now, self.target)
    }
}

/// The latest tick of an interval grid.
pub type TimeInterval = Watch<IntervalParams>;
/// Whole intervals left until a target, `-1` once reached.
pub type Countdown = Watch<CountdownParams>;
pub type IsAfter = Watch<AfterParams>;
pub type IsBefore = Watch<BeforeParams>;

pub fn time_interval(
    scheduler: &Scheduler,
    interval: Time,
    anchor: Option<Time>,
) -> Result<TimeInterval, WatchError> {
    Watch::new(
        scheduler,
        IntervalParams {
            interval,
            anchor,
            stop_at_anchor: false,
        },
    )
}

pub fn countdown(scheduler: &Scheduler, target: Time, interval: Time) -> Result<Countdown, WatchError> {
    Watch::new(scheduler, CountdownParams { target, interval })
}

pub fn is_after(scheduler: &Scheduler, target: Time) -> Result<IsAfter, WatchError> {
    Watch::new(scheduler, AfterParams { target })
}

pub fn is_before(scheduler: &Scheduler, target: Time) -> Result<IsBefore, WatchError> {
    Watch::new(scheduler, BeforeParams { target })
}

fn current_scheduler() -> Result<Scheduler, WatchError> {
    context::current().ok_or(WatchError::NoScheduler)
}

pub fn use_time_interval(interval: Time, anchor: Option<Time>) -> Result<TimeInterval, WatchError> {
    time_interval(&current_scheduler()?, interval, anchor)
}

pub fn use_countdown(target: Time, interval: Time) -> Result<Countdown, WatchError> {
    countdown(&current_scheduler()?, target, interval)
}

pub fn use_is_after(target: Time) -> Result<IsAfter, WatchError> {
    is_after(&current_scheduler()?, target)
}

pub fn use_is_before(target: Time) -> Result<IsBefore, WatchError> {
    is_before(&current_scheduler()?, target)
}

impl Watch<IntervalParams> {
    pub fn set_interval(&self, interval: Time) -> Result<(), WatchError> {
        self.update(|params| params.interval = interval)
    }

    pub fn set_anchor(&self, anchor: Option<Time>) -> Result<(), WatchError> {
        self.update(|params| params.anchor = anchor)
    }

    /// Stops requesting wakes once the grid passes the anchor.
    pub fn set_stop_at_anchor(&self, stop_at_anchor: bool) -> Result<(), WatchError> {
        self.update(|params| params.stop_at_anchor = stop_at_anchor)
    }
}

impl Watch<CountdownParams> {
    pub fn set_target(&self, target: Time) -> Result<(), WatchError> {
        self.update(|params| params.target = target)
    }

    pub fn set_interval(&self, interval: Time) -> Result<(), WatchError> {
        self.update(|params| params.interval = interval)
    }
}

impl Watch<AfterParams> {
    pub fn set_target(&self, target: Time) -> Result<(), WatchError> {
        self.update(|params| params.target = target)
    }
}

impl Watch<BeforeParams> {
    pub fn set_target(&self, target: Time) -> Result<(), WatchError> {
        self.update(|params| params.target = target)
    }
}
