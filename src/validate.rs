//! Range checks for inbound samples

use std::fmt;

use crate::ResourceSample;

/// Reasons a sample is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// CPU percentage outside [0, 100]
    CpuOutOfRange(f64),

    /// Memory percentage outside [0, 100]
    MemoryOutOfRange(f64),

    /// Inbound network rate negative or not finite
    InvalidNetworkIn(f64),

    /// Outbound network rate negative or not finite
    InvalidNetworkOut(f64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CpuOutOfRange(v) => write!(f, "cpu must be within 0-100, got {v}"),
            ValidationError::MemoryOutOfRange(v) => {
                write!(f, "memory must be within 0-100, got {v}")
            }
            ValidationError::InvalidNetworkIn(v) => {
                write!(f, "network_in must be a non-negative rate, got {v}")
            }
            ValidationError::InvalidNetworkOut(v) => {
                write!(f, "network_out must be a non-negative rate, got {v}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_percentage(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

fn is_rate(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Check a sample for range validity, returning it unchanged when valid.
///
/// NaN fails every check, so it is rejected for all fields.
pub fn validate(sample: ResourceSample) -> Result<ResourceSample, ValidationError> {
    if !is_percentage(sample.cpu) {
        return Err(ValidationError::CpuOutOfRange(sample.cpu));
    }
    if !is_percentage(sample.memory) {
        return Err(ValidationError::MemoryOutOfRange(sample.memory));
    }
    if !is_rate(sample.network_in) {
        return Err(ValidationError::InvalidNetworkIn(sample.network_in));
    }
    if !is_rate(sample.network_out) {
        return Err(ValidationError::InvalidNetworkOut(sample.network_out));
    }

    Ok(sample)
}
