use smallvec::SmallVec;

use crate::constants::MAX_STEPS;

/// Onset flags for one cycle of a pattern, index `i` sounding at `i / len`.
pub type Steps = SmallVec<[bool; MAX_STEPS]>;

/// Distribute `pulse_count` onsets as evenly as possible over `step_count`
/// slots and rotate the result by `offset`.
///
/// This is the accumulator (Bresenham) form rather than the recursive bucket
/// method: `pile` grows by `pulse_count` per step and every time it reaches
/// `step_count` the current slot becomes an onset. `offset` rotates the slot
/// index the flag is written to, so `offset` may be any integer and is taken
/// modulo `step_count`.
///
/// Callers validate the counts first (see [`crate::PatternConfig`]); with
/// `step_count == 0` the result is simply empty.
pub fn euclid(step_count: usize, pulse_count: usize, offset: i64) -> Steps {
    let mut steps: Steps = SmallVec::from_elem(false, step_count);
    if step_count == 0 {
        return steps;
    }
    let n = step_count as i64;
    let mut pile = 0usize;
    for step in 0..step_count {
        let idx = (step as i64 + offset).rem_euclid(n) as usize;
        pile += pulse_count;
        if pile >= step_count {
            pile -= step_count;
            steps[idx] = true;
        } else {
            steps[idx] = false;
        }
    }
    steps
}

/// Number of onsets in `steps`.
#[inline]
pub fn onset_count(steps: &[bool]) -> usize {
    steps.iter().filter(|s| **s).count()
}
