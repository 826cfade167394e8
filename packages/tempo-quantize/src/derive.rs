//! Values a binding layer renders, each paired with the time it should next be recomputed.

use crate::error::{QuantizeError, validate_interval, validate_target};
use crate::step::{next_update_time, pick_step, quantise};
use crate::{EXPIRED, Time};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A derived value and the moment it may next change.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Sample<T> {
    pub value: T,
    /// `None` means the value is final.
    pub wake: Option<Time>,
}

impl<T> Sample<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sample<U> {
        Sample {
            value: f(self.value),
            wake: self.wake,
        }
    }

    pub fn is_final(&self) -> bool {
        self.wake.is_none()
    }
}

/// The current tick of a grid anchored at `anchor`.
///
/// Without an anchor the grid is anchored at `0`. With `stop_at_anchor` no wake is requested
/// past the anchor, and an anchor is mandatory.
pub fn time_interval(
    now: Time,
    interval: Time,
    anchor: Option<Time>,
    stop_at_anchor: bool,
) -> Result<Sample<Time>, QuantizeError> {
    let interval = validate_interval(interval)?;
    let anchor = match anchor {
        Some(anchor) => validate_target(anchor)?,
        None if stop_at_anchor => return Err(QuantizeError::MissingTarget),
        None => 0.0,
    };

    let step = pick_step(now, anchor, interval);
    let wake = step.next.filter(|&next| !(stop_at_anchor && next > anchor));
    Ok(Sample {
        value: step.current,
        wake,
    })
}

/// Time left until `target`, rounded down to whole intervals.
///
/// Reports [`EXPIRED`] once the target is reached and `+∞` for a target that never comes.
pub fn countdown(now: Time, target: Time, interval: Time) -> Result<Sample<f64>, QuantizeError> {
    let interval = validate_interval(interval)?;
    let target = validate_target(target)?;

    if now >= target {
        return Ok(Sample {
            value: EXPIRED,
            wake: None,
        });
    }
    if target == Time::INFINITY {
        return Ok(Sample {
            value: Time::INFINITY,
            wake: None,
        });
    }
    Ok(Sample {
        value: quantise(target - now, interval),
        wake: next_update_time(now, target, interval),
    })
}

/// Whether `target` has been reached. Wakes exactly once, at the target.
pub fn is_after(now: Time, target: Time) -> Result<Sample<bool>, QuantizeError> {
    Ok(countdown(now, target, Time::INFINITY)?.map(|_| now >= target))
}

pub fn is_before(now: Time, target: Time) -> Result<Sample<bool>, QuantizeError> {
    Ok(is_after(now, target)?.map(|after| !after))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: Time = Time::INFINITY;

    #[test]
    fn time_interval_defaults_anchor_to_zero() {
        let sample = time_interval(2500.0, 1000.0, None, false).unwrap();
        assert_eq!(sample.value, 2000.0);
        assert_eq!(sample.wake, Some(3000.0));
    }

    #[test]
    fn time_interval_keeps_ticking_past_the_anchor() {
        let sample = time_interval(5000.0, 1000.0, Some(3000.0), false).unwrap();
        assert_eq!(sample.value, 5000.0);
        assert_eq!(sample.wake, Some(6000.0));
    }

    #[test]
    fn stop_at_anchor_suppresses_later_wakes() {
        let before = time_interval(1500.0, 1000.0, Some(3000.0), true).unwrap();
        assert_eq!(before.wake, Some(2000.0));

        let at = time_interval(3000.0, 1000.0, Some(3000.0), true).unwrap();
        assert_eq!(at.value, 3000.0);
        assert!(at.is_final());

        assert_eq!(
            time_interval(0.0, 1000.0, None, true),
            Err(QuantizeError::MissingTarget)
        );
    }

    #[test]
    fn countdown_steps_down_to_expiry() {
        let values: Vec<f64> = [0.0, 10.0, 105.0, 205.0, 305.0]
            .into_iter()
            .map(|now| countdown(now, 305.0, 100.0).unwrap().value)
            .collect();
        assert_eq!(values, vec![300.0, 200.0, 100.0, 0.0, EXPIRED]);
    }

    #[test]
    fn countdown_boundary_belongs_to_new_tick() {
        assert_eq!(countdown(73.0, 374.0, 100.0).unwrap().value, 300.0);
        assert_eq!(countdown(74.0, 374.0, 100.0).unwrap().value, 200.0);
    }

    #[test]
    fn countdown_towards_infinity_never_wakes() {
        let sample = countdown(0.0, INF, 100.0).unwrap();
        assert_eq!(sample.value, INF);
        assert!(sample.is_final());

        let sample = countdown(0.0, -INF, 100.0).unwrap();
        assert_eq!(sample.value, EXPIRED);
        assert!(sample.is_final());
    }

    #[test]
    fn countdown_with_infinite_interval_reports_zero_until_expiry() {
        let sample = countdown(0.0, 500.0, INF).unwrap();
        assert_eq!(sample.value, 0.0);
        assert_eq!(sample.wake, Some(500.0));
    }

    #[test]
    fn derivations_reject_invalid_input() {
        assert!(matches!(
            countdown(0.0, 100.0, 0.0),
            Err(QuantizeError::InvalidInterval(_))
        ));
        assert!(matches!(
            countdown(0.0, Time::NAN, 10.0),
            Err(QuantizeError::InvalidTarget(_))
        ));
        assert!(is_after(0.0, Time::NAN).is_err());
        assert!(is_before(0.0, Time::NAN).is_err());
    }

    #[test]
    fn after_and_before_flip_at_the_target() {
        let pending = is_after(314.0, 315.0).unwrap();
        assert!(!pending.value);
        assert_eq!(pending.wake, Some(315.0));

        let reached = is_after(315.0, 315.0).unwrap();
        assert!(reached.value);
        assert!(reached.is_final());

        assert!(is_before(314.0, 315.0).unwrap().value);
        assert!(!is_before(315.0, 315.0).unwrap().value);
    }
}
