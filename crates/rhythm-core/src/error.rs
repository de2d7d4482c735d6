//! Error types shared by the pattern, tone and interval modules.
//!
//! Configuration errors are raised while validating UI input, before any
//! pattern is generated. Tone errors are reported by tone generators for a
//! single onset and never stop a running scheduler.

use thiserror::Error;

use crate::constants::MAX_STEPS;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("step count {0} is outside 1..={max}", max = MAX_STEPS)]
    StepCount(usize),
    #[error("pulse count {pulses} is outside 1..={steps}")]
    PulseCount { pulses: usize, steps: usize },
    #[error("period {0}s is outside the playable range")]
    Period(f64),
    #[error("no preset at index {0}")]
    UnknownPreset(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("octave reduction needs a positive ratio, got {numer}/{denom}")]
    NonPositive { numer: i64, denom: i64 },
    #[error("ratio overflowed while stacking {distance} fifths")]
    Overflow { distance: i32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToneError {
    #[error("no sound registered as {0:?}")]
    UnknownSound(String),
    #[error("tone generator failed: {0}")]
    Backend(String),
}
