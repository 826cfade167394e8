//! Time values that keep themselves current.
//!
//! A [`Watch`] samples a quantized value, asks a [`Scheduler`] to wake it when that value can
//! next change, and notifies subscribers whenever it does. Dropping the watch cancels its wake.

pub mod context;
pub mod hooks;
pub mod watch;

pub use hooks::{
    AfterParams, BeforeParams, Countdown, CountdownParams, IntervalParams, IsAfter, IsBefore,
    TimeInterval, countdown, is_after, is_before, time_interval, use_countdown, use_is_after,
    use_is_before, use_time_interval,
};
pub use tempo_quantize::{EXPIRED, QuantizeError, Sample, Time};
pub use tempo_scheduler::Scheduler;
pub use watch::{Sampler, SubscriptionId, Watch};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Quantize(#[from] QuantizeError),
    #[error("no scheduler provided and no root scheduler installed")]
    NoScheduler,
}
