//! Collaborator traits and the window chaining shared by the scheduler and
//! the coordinator.
//!
//! Two time domains meet here. The audio clock (`AudioClock::now`) is
//! monotonic and sample-accurate; onsets are handed to the tone generator as
//! absolute audio-clock timestamps. The coarse timer is a wall-clock
//! `after(delay)` facility that may fire late but never early; it is only used
//! to wake up and plan the next window.

use std::time::Duration;

use crate::error::ToneError;

/// Monotonic audio-rate clock in seconds.
pub trait AudioClock {
    fn now(&self) -> f64;
}

/// Anything able to fire a sound at an absolute audio-clock time.
///
/// Calls are fire-and-forget: once handed over, an onset may not be
/// cancellable.
pub trait ToneGenerator: AudioClock {
    type Sound;

    fn play_onset_at(&mut self, sound: &Self::Sound, at: f64) -> Result<(), ToneError>;
}

/// What a coarse timer delivers back to its owner when it fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Wake {
    /// Plan the next window (scheduler) or tick (coordinator).
    Advance,
    /// Cosmetic phase update, fraction of the current window in `[0, 1)`.
    Phase(f64),
}

/// Wall-clock `after`/`cancel` facility.
///
/// The timer does not call back into the scheduler itself; the driver that
/// owns both routes each fired [`Wake`] to `on_wake`.
pub trait CoarseTimer {
    type Token;

    fn after(&mut self, delay: Duration, wake: Wake) -> Self::Token;
    fn cancel(&mut self, token: Self::Token);
}

/// One planned chunk of audio-clock time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleWindow {
    pub start: f64,
    pub end: f64,
    /// Bar (scheduler) or tick (coordinator) counter since start.
    pub index: u64,
}

impl ScheduleWindow {
    #[inline]
    pub fn period(&self) -> f64 {
        self.end - self.start
    }

    /// Audio time of a normalized position inside this window.
    #[inline]
    pub fn time_at(&self, position: f64) -> f64 {
        self.start + position * self.period()
    }
}

/// Virtual performance clock: every window starts where the previous one
/// ended, never at "now".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowChain {
    next_start: f64,
    next_index: u64,
}

impl WindowChain {
    pub fn starting_at(start: f64) -> Self {
        Self {
            next_start: start,
            next_index: 0,
        }
    }

    pub fn next_window(&mut self, period: f64) -> ScheduleWindow {
        let window = ScheduleWindow {
            start: self.next_start,
            end: self.next_start + period,
            index: self.next_index,
        };
        self.next_start = window.end;
        self.next_index += 1;
        window
    }

    /// Start of the window that the next call to `next_window` returns.
    #[inline]
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    #[inline]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }
}

/// Lifecycle shared by the scheduler and the coordinator:
/// `Idle -> Running -> Stopping -> Idle`.
#[derive(Debug)]
pub enum RunState<Tok> {
    Idle,
    Running {
        chain: WindowChain,
        advance: Option<Tok>,
    },
    /// Timers are cancelled but onsets already handed to the tone generator
    /// keep sounding until `drain_until` on the audio clock.
    Stopping { drain_until: f64 },
}

impl<Tok> RunState<Tok> {
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    /// Move `Stopping` to `Idle` once the audio clock passed the drain point.
    pub fn settle(&mut self, now: f64) {
        if let RunState::Stopping { drain_until } = *self {
            if now >= drain_until {
                *self = RunState::Idle;
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running { .. } => "running",
            RunState::Stopping { .. } => "stopping",
        }
    }
}

/// Delay before waking for `deadline`, woken `margin` early.
///
/// Late wake-ups shrink the delay (down to zero) instead of moving the
/// deadline.
pub fn wake_delay(deadline: f64, now: f64, margin: f64) -> Duration {
    seconds_to_delay(deadline - now - margin)
}

/// Clamp a possibly negative or non-finite span of seconds to a `Duration`.
pub fn seconds_to_delay(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

/// True when `period` can drive a window chain.
#[inline]
pub fn is_valid_period(period: f64) -> bool {
    period.is_finite() && period > 0.0
}
