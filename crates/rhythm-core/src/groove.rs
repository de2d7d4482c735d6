//! Loop sources: what the look-ahead scheduler plays in each window.
//!
//! A source is read afresh every time a window is planned, so edits made
//! between windows (for example through an `Rc<RefCell<_>>` held by the UI)
//! take effect at the next window boundary.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::{tempo_to_beat_sec, DEFAULT_BAR_MS, DEFAULT_TEMPO_BPM};
use crate::pattern::RhythmPattern;

/// A scheduled trigger inside one cycle.
///
/// Fields:
/// - `index`: step index reported to listeners
/// - `position`: normalized position within the cycle, `[0, 1)`
/// - `sound`: the handle passed to the tone generator
#[derive(Clone, Debug, PartialEq)]
pub struct Onset<S> {
    pub index: usize,
    pub position: f64,
    pub sound: S,
}

/// Current configuration of a periodic loop.
pub trait LoopSource {
    type Sound;

    /// Length of one cycle in seconds.
    fn period(&self) -> f64;

    /// Append the onsets of cycle `cycle` in index order.
    fn onsets(&self, cycle: u64, out: &mut Vec<Onset<Self::Sound>>);
}

impl<L: LoopSource> LoopSource for Rc<RefCell<L>> {
    type Sound = L::Sound;

    fn period(&self) -> f64 {
        self.borrow().period()
    }

    fn onsets(&self, cycle: u64, out: &mut Vec<Onset<Self::Sound>>) {
        self.borrow().onsets(cycle, out)
    }
}

/// One Euclidean pattern played by one sound, one bar per cycle.
#[derive(Clone, Debug)]
pub struct PatternLoop<S> {
    pub pattern: RhythmPattern,
    pub period: f64,
    pub sound: S,
}

impl<S> PatternLoop<S> {
    pub fn new(pattern: RhythmPattern, period: f64, sound: S) -> Self {
        Self {
            pattern,
            period,
            sound,
        }
    }

    /// Bar length as entered on the page, in milliseconds.
    pub fn with_bar_ms(pattern: RhythmPattern, bar_ms: f64, sound: S) -> Self {
        Self::new(pattern, bar_ms / 1000.0, sound)
    }

    pub fn set_bar_ms(&mut self, bar_ms: f64) {
        self.period = bar_ms / 1000.0;
    }
}

impl<S: Default> Default for PatternLoop<S> {
    fn default() -> Self {
        Self::with_bar_ms(RhythmPattern::default(), DEFAULT_BAR_MS, S::default())
    }
}

impl<S: Clone> LoopSource for PatternLoop<S> {
    type Sound = S;

    fn period(&self) -> f64 {
        self.period
    }

    fn onsets(&self, _cycle: u64, out: &mut Vec<Onset<S>>) {
        out.extend(self.pattern.onsets().map(|(index, position)| Onset {
            index,
            position,
            sound: self.sound.clone(),
        }));
    }
}

/// One beat per cycle: the two beat sounds alternate on the beat and a hat
/// lands on the off-beat.
#[derive(Clone, Debug)]
pub struct ClockGroove<S> {
    pub tempo_bpm: f64,
    pub odd_beat: S,
    pub even_beat: S,
    pub hat: S,
}

impl<S> ClockGroove<S> {
    pub fn new(odd_beat: S, even_beat: S, hat: S) -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            odd_beat,
            even_beat,
            hat,
        }
    }

    /// Position of `beat` within a four-beat bar, for display.
    #[inline]
    pub fn beat_phase(beat: u64) -> u64 {
        beat % 4
    }
}

impl<S: Clone> LoopSource for ClockGroove<S> {
    type Sound = S;

    fn period(&self) -> f64 {
        tempo_to_beat_sec(self.tempo_bpm)
    }

    fn onsets(&self, cycle: u64, out: &mut Vec<Onset<S>>) {
        let beat = if cycle % 2 == 1 {
            &self.odd_beat
        } else {
            &self.even_beat
        };
        out.push(Onset {
            index: 0,
            position: 0.0,
            sound: beat.clone(),
        });
        out.push(Onset {
            index: 1,
            position: 0.5,
            sound: self.hat.clone(),
        });
    }
}

/// A 4/4 bar per cycle with a four-bar variation cycle.
#[derive(Clone, Debug)]
pub struct BarGroove<S> {
    pub tempo_bpm: f64,
    pub kick: S,
    pub snare: S,
    pub hat: S,
}

impl<S> BarGroove<S> {
    pub fn new(kick: S, snare: S, hat: S) -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            kick,
            snare,
            hat,
        }
    }

    /// Position of `bar` in the four-bar variation cycle.
    #[inline]
    pub fn bar_cycle(bar: u64) -> u64 {
        bar % 4
    }
}

impl<S: Clone> LoopSource for BarGroove<S> {
    type Sound = S;

    fn period(&self) -> f64 {
        tempo_to_beat_sec(self.tempo_bpm) * 4.0
    }

    fn onsets(&self, cycle: u64, out: &mut Vec<Onset<S>>) {
        let bar_cycle = Self::bar_cycle(cycle);
        // (position, sound); sorted by position before emitting
        let mut hits: Vec<(f64, &S)> = Vec::with_capacity(10);
        hits.push((0.0, &self.kick));
        if bar_cycle == 1 || bar_cycle == 3 {
            hits.push((1.0 / 4.0, &self.kick));
        }
        if bar_cycle != 1 {
            hits.push((3.0 / 8.0, &self.kick));
        }
        hits.push((2.0 / 4.0, &self.snare));
        for i in 0..4 {
            hits.push(((i * 2 + 1) as f64 / 8.0, &self.hat));
        }
        if bar_cycle == 3 {
            hits.push((6.0 / 8.0, &self.hat));
            hits.push((15.0 / 16.0, &self.hat));
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        out.extend(hits.into_iter().enumerate().map(|(index, (position, sound))| Onset {
            index,
            position,
            sound: sound.clone(),
        }));
    }
}
