pub mod config;
pub mod host;
pub mod manual;
pub(crate) mod queue;
pub mod scheduler;
pub mod task;
#[cfg(feature = "tokio")]
pub mod tokio_host;

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since an arbitrary epoch. May be `±∞`; `NaN` targets are never scheduled.
pub type Time = f64;

/// Source of the current time. Swapped out in tests and drift simulations.
pub type Clock = Rc<dyn Fn() -> Time>;

/// Wall clock in milliseconds since the Unix epoch.
///
/// Not usable on `wasm32-unknown-unknown`; browser hosts provide their own clock.
pub fn system_time() -> Time {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

pub use config::{MAX_TIMER_DELAY_MS, SchedulerOptions};
pub use host::{Capabilities, FocusCallback, HostHandle, PageHost, TimerCallback, TimerHost};
pub use manual::ManualHost;
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{Cancel, WaitUntil};
#[cfg(feature = "tokio")]
pub use tokio_host::TokioHost;
