//! Deterministic stand-ins for the clock, the coarse timer and the tone
//! generator.
//!
//! `TimerQueue` is also the event loop of the native front-end: it only
//! needs a time source, so the same queue runs against a manual clock in
//! tests and against the wall clock natively.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::{AudioClock, CoarseTimer, ToneGenerator, Wake};
use crate::error::ToneError;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn set(&self, t: f64) {
        self.0.set(t);
    }

    pub fn advance(&self, dt: f64) {
        self.0.set(self.0.get() + dt);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pending {
    token: u64,
    due: f64,
    wake: Wake,
}

/// Coarse timer backed by a plain list of pending wakes.
#[derive(Debug)]
pub struct TimerQueue<C> {
    clock: C,
    next_token: u64,
    pending: Vec<Pending>,
}

impl<C: AudioClock> TimerQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            next_token: 0,
            pending: Vec::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Earliest due time among pending wakes.
    pub fn next_due(&self) -> Option<f64> {
        self.pending.iter().map(|p| p.due).min_by(|a, b| a.total_cmp(b))
    }

    /// Remove and return the earliest wake due at or before `limit`.
    /// Ties fire in the order they were registered.
    pub fn pop_due(&mut self, limit: f64) -> Option<(f64, Wake)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= limit)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.token.cmp(&b.token)))
            .map(|(i, _)| i)?;
        let p = self.pending.remove(idx);
        Some((p.due, p.wake))
    }

    /// Pending wakes of one kind, for inspection.
    pub fn count_where(&self, f: impl Fn(&Wake) -> bool) -> usize {
        self.pending.iter().filter(|p| f(&p.wake)).count()
    }
}

impl<C: AudioClock> CoarseTimer for TimerQueue<C> {
    type Token = u64;

    fn after(&mut self, delay: Duration, wake: Wake) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.pending.push(Pending {
            token,
            due: self.clock.now() + delay.as_secs_f64(),
            wake,
        });
        token
    }

    fn cancel(&mut self, token: u64) {
        self.pending.retain(|p| p.token != token);
    }
}

/// Tone generator that records every onset it is handed.
#[derive(Debug)]
pub struct RecordingTones<S> {
    clock: ManualClock,
    pub played: Vec<(S, f64)>,
    failing: Vec<S>,
}

impl<S: Clone + PartialEq> RecordingTones<S> {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            played: Vec::new(),
            failing: Vec::new(),
        }
    }

    /// Make every onset of `sound` fail, as an exhausted backend would.
    pub fn fail_on(&mut self, sound: S) {
        self.failing.push(sound);
    }

    pub fn times(&self) -> Vec<f64> {
        self.played.iter().map(|(_, t)| *t).collect()
    }

    pub fn times_of(&self, sound: &S) -> Vec<f64> {
        self.played
            .iter()
            .filter(|(s, _)| s == sound)
            .map(|(_, t)| *t)
            .collect()
    }
}

impl<S> AudioClock for RecordingTones<S> {
    fn now(&self) -> f64 {
        self.clock.now()
    }
}

impl<S: Clone + PartialEq> ToneGenerator for RecordingTones<S> {
    type Sound = S;

    fn play_onset_at(&mut self, sound: &S, at: f64) -> Result<(), ToneError> {
        if self.failing.contains(sound) {
            return Err(ToneError::Backend("simulated exhaustion".into()));
        }
        self.played.push((sound.clone(), at));
        Ok(())
    }
}
