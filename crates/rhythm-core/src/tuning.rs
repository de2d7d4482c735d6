//! Tuning tables and the oscillator toggle state of the harmony pages.

use fnv::FnvHashSet;

use crate::constants::{CONCERT_A_HZ, MAX_FIFTHS, MAX_THIRDS};
use crate::error::IntervalError;
use crate::interval::{fifth_from_base, Rational, RationalInterval};

/// Pythagorean series: `fifth_from_base(1, d)` for `d` in `-down..=up`.
pub fn fifths_range(down: u32, up: u32) -> Result<Vec<RationalInterval>, IntervalError> {
    let down = down.min(MAX_FIFTHS) as i32;
    let up = up.min(MAX_FIFTHS) as i32;
    (-down..=up)
        .map(|d| fifth_from_base(Rational::from_integer(1), d))
        .collect()
}

/// Extent of the just-intonation lattice in fifths (columns) and major
/// thirds (rows).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatticeBounds {
    pub fifths_down: u32,
    pub fifths_up: u32,
    pub thirds_down: u32,
    pub thirds_up: u32,
}

impl Default for LatticeBounds {
    fn default() -> Self {
        Self {
            fifths_down: 1,
            fifths_up: 2,
            thirds_down: 0,
            thirds_up: 0,
        }
    }
}

impl LatticeBounds {
    pub fn clamped(self) -> Self {
        Self {
            fifths_down: self.fifths_down.min(MAX_FIFTHS),
            fifths_up: self.fifths_up.min(MAX_FIFTHS),
            thirds_down: self.thirds_down.min(MAX_THIRDS),
            thirds_up: self.thirds_up.min(MAX_THIRDS),
        }
    }
}

/// Rows of fifths, each built on a power of a major third.
///
/// Rows above the root use bases `(5/4)^y` and are listed highest first;
/// rows below use `(8/5)^(y+1)` and follow the root row.
pub fn just_lattice(bounds: LatticeBounds) -> Result<Vec<Vec<RationalInterval>>, IntervalError> {
    let b = bounds.clamped();
    let row = |base: Rational| -> Result<Vec<RationalInterval>, IntervalError> {
        (-(b.fifths_down as i32)..=b.fifths_up as i32)
            .map(|x| fifth_from_base(base, x))
            .collect()
    };

    let mut rows = Vec::new();
    let third_up = Rational::new(5, 4);
    let mut base = Rational::from_integer(1);
    for _ in 0..=b.thirds_up {
        rows.insert(0, row(base)?);
        base *= third_up;
    }
    let third_down = Rational::new(8, 5);
    let mut base = third_down;
    for _ in 0..b.thirds_down {
        rows.push(row(base)?);
        base *= third_down;
    }
    Ok(rows)
}

/// One step of an equal division of the octave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EqualStep {
    pub step: u32,
    pub scale: f64,
    pub cents: f64,
}

pub fn equal_division(steps: u32) -> Vec<EqualStep> {
    (0..steps)
        .map(|step| {
            let scale = 2f64.powf(step as f64 / steps as f64);
            EqualStep {
                step,
                scale,
                cents: scale.log2() * 1200.0,
            }
        })
        .collect()
}

/// Cents from `lower` up to `upper`, wrapped into one octave.
pub fn cents_above(upper: f64, lower: f64) -> f64 {
    if upper >= lower {
        upper - lower
    } else {
        upper - lower + 1200.0
    }
}

/// Overtones `k * base_hz` (k = 1, 2, ..) strictly below `ceiling_hz`.
pub fn harmonic_series(base_hz: f64, ceiling_hz: f64) -> Vec<f64> {
    if !base_hz.is_finite() || base_hz <= 0.0 {
        return Vec::new();
    }
    let mut tones = vec![base_hz];
    let mut k = 2.0;
    while k * base_hz < ceiling_hz {
        tones.push(k * base_hz);
        k += 1.0;
    }
    tones
}

/// Pitch classes of the chord page, C = 0, flats for the black keys.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch class of a note name; sharps resolve to their enharmonic flat.
pub fn note_index(name: &str) -> Option<usize> {
    if let Some(i) = NOTE_NAMES.iter().position(|n| *n == name) {
        return Some(i);
    }
    let natural = name.strip_suffix('#')?;
    let i = NOTE_NAMES.iter().position(|n| *n == natural)?;
    Some((i + 1) % 12)
}

/// Equal-tempered frequency of pitch class `index` in the octave around
/// concert A (index 9).
pub fn equal_note_frequency(index: usize) -> f64 {
    CONCERT_A_HZ * 2f64.powf((index as f64 - 9.0) / 12.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Major,
    Minor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Seventh {
    /// Ten semitones above the root.
    Dominant,
    /// Eleven semitones above the root.
    Major,
}

/// Pitch classes of a triad (plus optional seventh) on `root`, in
/// ascending pitch-class order.
///
/// A major triad is the root, its fifth and the third above; a minor
/// triad swaps in the minor third, as on the fifths/thirds lattice.
pub fn chord_notes(root: usize, quality: ChordQuality, seventh: Option<Seventh>) -> Vec<usize> {
    let third = match quality {
        ChordQuality::Major => 4,
        ChordQuality::Minor => 3,
    };
    let mut notes = vec![root % 12, (root + 7) % 12, (root + third) % 12];
    match seventh {
        None => {}
        Some(Seventh::Dominant) => notes.push((root + 10) % 12),
        Some(Seventh::Major) => notes.push((root + 11) % 12),
    }
    notes.sort_unstable();
    notes
}

/// Frequencies the chord oscillators play: each note one octave below its
/// [`equal_note_frequency`].
pub fn chord_frequencies(
    root: usize,
    quality: ChordQuality,
    seventh: Option<Seventh>,
) -> Vec<f64> {
    chord_notes(root, quality, seventh)
        .into_iter()
        .map(|i| equal_note_frequency(i) / 2.0)
        .collect()
}

/// Identity of one toggleable oscillator: an interval and an octave
/// multiplier (`2^octave`, so -2..=2 covers 0.25..4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ToneKey {
    pub ratio: Rational,
    pub octave: i8,
}

impl ToneKey {
    pub fn new(interval: &RationalInterval, octave: i8) -> Self {
        Self {
            ratio: interval.ratio(),
            octave,
        }
    }

    #[inline]
    pub fn multiplier(&self) -> f64 {
        2f64.powi(self.octave as i32)
    }

    pub fn frequency(&self, base_hz: f64) -> f64 {
        base_hz * crate::interval::to_f64(self.ratio) * self.multiplier()
    }
}

/// Changes needed to bring a set of running oscillators in line with the
/// toggles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToggleDiff {
    pub start: Vec<ToneKey>,
    pub stop: Vec<ToneKey>,
    /// Running and still wanted; their frequency follows the base.
    pub keep: Vec<ToneKey>,
}

/// Which oscillators the user switched on.
#[derive(Clone, Debug, Default)]
pub struct OscillatorToggles {
    active: FnvHashSet<ToneKey>,
}

impl OscillatorToggles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a tone; returns whether it is now on.
    pub fn toggle(&mut self, key: ToneKey) -> bool {
        if self.active.remove(&key) {
            false
        } else {
            self.active.insert(key);
            true
        }
    }

    pub fn is_active(&self, key: &ToneKey) -> bool {
        self.active.contains(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Silence everything.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToneKey> {
        self.active.iter()
    }

    /// Drop toggles whose interval is no longer on the page. Returns true if
    /// anything was removed.
    pub fn retain_available<'a>(&mut self, notes: impl IntoIterator<Item = &'a RationalInterval>) -> bool {
        let available: FnvHashSet<Rational> = notes.into_iter().map(|n| n.ratio()).collect();
        let before = self.active.len();
        self.active.retain(|k| available.contains(&k.ratio));
        self.active.len() != before
    }

    pub fn diff(&self, running: &FnvHashSet<ToneKey>) -> ToggleDiff {
        let mut diff = ToggleDiff::default();
        for key in running {
            if self.active.contains(key) {
                diff.keep.push(*key);
            } else {
                diff.stop.push(*key);
            }
        }
        for key in &self.active {
            if !running.contains(key) {
                diff.start.push(*key);
            }
        }
        diff
    }
}
