use crate::Time;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Position of `now` on an anchored grid.
///
/// `current` is the last grid line at or before `now`; `next` is the line the caller should
/// wake up for, or `None` when no further line will ever be crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Step {
    pub current: Time,
    pub next: Option<Time>,
}

impl Step {
    const NEVER: Step = Step {
        current: Time::NEG_INFINITY,
        next: None,
    };
}

/// Quantizes `now` onto the grid `anchor + k * interval`.
///
/// A boundary instant belongs to the tick that starts there. With an infinite interval the
/// grid has a single line at `anchor`. A non-finite anchor is never reached.
///
/// `interval` must be positive; see [`crate::error::validate_interval`].
pub fn pick_step(now: Time, anchor: Time, interval: Time) -> Step {
    if !anchor.is_finite() {
        return Step::NEVER;
    }
    if interval == Time::INFINITY {
        if now < anchor {
            return Step {
                current: Time::NEG_INFINITY,
                next: Some(anchor),
            };
        }
        return Step {
            current: anchor,
            next: None,
        };
    }

    let mut current = anchor + ((now - anchor) / interval).floor() * interval;
    // Fractional inputs can land one ulp on the wrong side of `now`.
    if current > now {
        current -= interval;
    } else if current + interval <= now {
        current += interval;
    }
    Step {
        current,
        next: Some(current + interval),
    }
}

/// Next wake for a countdown towards `target`, on the grid
/// `target, target - interval, target - 2 * interval, ...`.
///
/// Returns `None` once the target is due, and for a target that can never be reached.
pub fn next_update_time(now: Time, target: Time, interval: Time) -> Option<Time> {
    if now >= target || !target.is_finite() {
        return None;
    }
    if interval == Time::INFINITY {
        return Some(target);
    }
    let delay = (target - now) % interval;
    Some(now + if delay == 0.0 { interval } else { delay })
}

/// Largest multiple of `interval` strictly below `remaining`, or `0` when `remaining` fits
/// within a single interval.
pub fn quantise(remaining: Time, interval: Time) -> Time {
    if interval.is_infinite() || remaining <= interval {
        return 0.0;
    }
    ((remaining / interval).ceil() - 1.0) * interval
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: Time = Time::INFINITY;

    #[test]
    fn boundary_belongs_to_new_tick() {
        let step = pick_step(1000.0, 0.0, 1000.0);
        assert_eq!(step.current, 1000.0);
        assert_eq!(step.next, Some(2000.0));

        let step = pick_step(999.0, 0.0, 1000.0);
        assert_eq!(step.current, 0.0);
    }

    #[test]
    fn ticks_before_the_anchor_floor_downwards() {
        let step = pick_step(0.0, 3300.0, 1000.0);
        assert_eq!(step.current, -700.0);
        assert_eq!(step.next, Some(300.0));

        let step = pick_step(-1.0, 0.0, 10.0);
        assert_eq!(step.current, -10.0);
        assert_eq!(step.next, Some(0.0));
    }

    #[test]
    fn infinite_anchor_is_never_reached() {
        assert_eq!(pick_step(50.0, INF, 100.0), Step::NEVER);
        assert_eq!(pick_step(50.0, -INF, 100.0), Step::NEVER);
        assert_eq!(pick_step(50.0, Time::NAN, 100.0), Step::NEVER);
        assert_eq!(pick_step(50.0, -INF, INF), Step::NEVER);
    }

    #[test]
    fn infinite_interval_is_single_shot() {
        let pending = pick_step(10.0, 2000.0, INF);
        assert_eq!(pending.current, -INF);
        assert_eq!(pending.next, Some(2000.0));

        let reached = pick_step(2000.0, 2000.0, INF);
        assert_eq!(reached.current, 2000.0);
        assert_eq!(reached.next, None);
    }

    #[test]
    fn countdown_wakes_on_the_target_grid() {
        assert_eq!(next_update_time(0.0, 305.0, 100.0), Some(5.0));
        assert_eq!(next_update_time(5.0, 305.0, 100.0), Some(105.0));
        assert_eq!(next_update_time(205.0, 305.0, 100.0), Some(305.0));
        assert_eq!(next_update_time(305.0, 305.0, 100.0), None);
        assert_eq!(next_update_time(400.0, 305.0, 100.0), None);
    }

    #[test]
    fn countdown_wake_edges() {
        assert_eq!(next_update_time(0.0, INF, 100.0), None);
        assert_eq!(next_update_time(0.0, -INF, 100.0), None);
        assert_eq!(next_update_time(0.0, 2000.0, INF), Some(2000.0));
    }

    #[test]
    fn quantise_rounds_below_remaining() {
        assert_eq!(quantise(374.0, 100.0), 300.0);
        assert_eq!(quantise(301.0, 100.0), 300.0);
        assert_eq!(quantise(300.0, 100.0), 200.0);
        assert_eq!(quantise(100.0, 100.0), 0.0);
        assert_eq!(quantise(1.0, 100.0), 0.0);
        assert_eq!(quantise(0.0, 100.0), 0.0);
        assert_eq!(quantise(5000.0, INF), 0.0);
    }
}
