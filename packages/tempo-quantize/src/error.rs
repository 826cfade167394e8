use crate::Time;

/// Caller-side programming errors. Raised before anything is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum QuantizeError {
    /// The interval was zero, negative or `NaN`.
    #[error("invalid interval: {0}")]
    InvalidInterval(Time),
    /// The anchor or target was `NaN`.
    #[error("invalid target time: {0}")]
    InvalidTarget(Time),
    /// A target-bound sample was requested without a target.
    #[error("invalid target time: none given")]
    MissingTarget,
}

/// Accepts any positive interval, including `+∞`.
pub fn validate_interval(interval: Time) -> Result<Time, QuantizeError> {
    if interval.is_nan() || interval <= 0.0 {
        return Err(QuantizeError::InvalidInterval(interval));
    }
    Ok(interval)
}

/// Accepts any number, including `±∞`.
pub fn validate_target(target: Time) -> Result<Time, QuantizeError> {
    if target.is_nan() {
        return Err(QuantizeError::InvalidTarget(target));
    }
    Ok(target)
}
