use serde::{Deserialize, Serialize};

/// Largest delay a host timer is asked for. Browsers overflow above `i32::MAX` milliseconds;
/// a head further out than this simply re-arms when the clamped timer fires.
pub const MAX_TIMER_DELAY_MS: f64 = 2_147_483_647.0;

/// Tuning knobs for a [`crate::Scheduler`]. Unknown keys are ignored when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerOptions {
    /// Minimum delay before a wake while the page is visible.
    pub visible_throttle_ms: f64,
    /// Minimum delay before a wake while the page is hidden.
    pub hidden_throttle_ms: f64,
    /// Delays at or below this use an animation frame when the host has one.
    pub frame_threshold_ms: f64,
    /// An armed timer is kept unless re-arming would bring the wake forward by more than
    /// this many milliseconds.
    pub rearm_slack_ms: f64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            visible_throttle_ms: 10.0,
            hidden_throttle_ms: 500.0,
            frame_threshold_ms: 10.0,
            rearm_slack_ms: 0.0,
        }
    }
}

impl SchedulerOptions {
    pub fn throttle_floor(&self, hidden: bool) -> f64 {
        if hidden {
            self.hidden_throttle_ms
        } else {
            self.visible_throttle_ms
        }
    }

    pub fn with_visible_throttle(mut self, ms: f64) -> Self {
        self.visible_throttle_ms = ms;
        self
    }

    pub fn with_hidden_throttle(mut self, ms: f64) -> Self {
        self.hidden_throttle_ms = ms;
        self
    }

    pub fn with_frame_threshold(mut self, ms: f64) -> Self {
        self.frame_threshold_ms = ms;
        self
    }

    pub fn with_rearm_slack(mut self, ms: f64) -> Self {
        self.rearm_slack_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_follow_visibility() {
        let options = SchedulerOptions::default();
        assert_eq!(options.throttle_floor(false), 10.0);
        assert_eq!(options.throttle_floor(true), 500.0);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let options: SchedulerOptions =
            serde_json::from_str(r#"{ "hidden_throttle_ms": 1000, "getTime": "ignored" }"#)
                .unwrap();
        assert_eq!(options.hidden_throttle_ms, 1000.0);
        assert_eq!(options.visible_throttle_ms, 10.0);
        assert_eq!(options.rearm_slack_ms, 0.0);
    }
}
