//! Pure interval math: where a moment falls on a repeating grid anchored at some point in
//! time, and when the next grid line will be crossed.
//!
//! Nothing in this crate reads a clock or arms a timer. Callers pass `now` explicitly and get
//! back a value plus an optional wake time, which a scheduler can then act upon.

pub mod derive;
pub mod error;
pub mod step;

/// Milliseconds since an arbitrary epoch. May be `±∞`; `NaN` is rejected by validation.
pub type Time = f64;

/// Countdown value reported once the target has been reached.
pub const EXPIRED: f64 = -1.0;

pub use derive::{Sample, countdown, is_after, is_before, time_interval};
pub use error::QuantizeError;
pub use step::{Step, next_update_time, pick_step, quantise};
