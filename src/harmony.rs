use std::rc::Rc;

use rhythm_core::constants::OSCILLATOR_OCTAVES;
use rhythm_core::{
    fifths_range, just_lattice, note_index, ChordQuality, LatticeBounds, OscillatorToggles,
    RationalInterval, Seventh, ToneKey,
};
use wasm_bindgen::prelude::*;

use crate::audio::OscillatorBank;
use crate::constants::{clamp_base_hz, DEFAULT_BASE_HZ};
use crate::session::AudioSession;
use crate::to_js;

/// Cents of every step of an equal division of the octave.
#[wasm_bindgen]
pub fn equal_division_cents(steps: u32) -> Vec<f64> {
    rhythm_core::equal_division(steps)
        .iter()
        .map(|s| s.cents)
        .collect()
}

/// Overtones of `base_hz` below `ceiling_hz`.
#[wasm_bindgen]
pub fn harmonic_series(base_hz: f64, ceiling_hz: f64) -> Vec<f64> {
    rhythm_core::harmonic_series(base_hz, ceiling_hz)
}

/// Cents from `lower` up to `upper`, wrapped into the octave.
#[wasm_bindgen]
pub fn cents_above(upper: f64, lower: f64) -> f64 {
    rhythm_core::cents_above(upper, lower)
}

/// Equal-tempered frequency of a note name such as `"A"` or `"F#"`.
#[wasm_bindgen]
pub fn note_frequency(name: &str) -> Option<f64> {
    note_index(name).map(rhythm_core::equal_note_frequency)
}

/// Oscillator frequencies of the chord on `root`; `seventh` is `"7"`,
/// `"M7"` or absent.
#[wasm_bindgen]
pub fn chord_frequencies(
    root: &str,
    minor: bool,
    seventh: Option<String>,
) -> Result<Vec<f64>, JsValue> {
    let index =
        note_index(root).ok_or_else(|| JsValue::from_str(&format!("unknown note {:?}", root)))?;
    let quality = if minor {
        ChordQuality::Minor
    } else {
        ChordQuality::Major
    };
    let seventh = match seventh.as_deref() {
        None | Some("") => None,
        Some("7") => Some(Seventh::Dominant),
        Some("M7") => Some(Seventh::Major),
        Some(other) => return Err(JsValue::from_str(&format!("unknown seventh {:?}", other))),
    };
    Ok(rhythm_core::chord_frequencies(index, quality, seventh))
}

/// A grid of exact intervals with a bank of sawtooth oscillators the page
/// toggles per note and octave.
///
/// The grid is either one row of Pythagorean fifths or a just-intonation
/// lattice; shrinking it silences oscillators whose note left the grid.
#[wasm_bindgen]
pub struct IntervalBank {
    session: Rc<AudioSession>,
    bank: OscillatorBank,
    toggles: OscillatorToggles,
    rows: Vec<Vec<RationalInterval>>,
    base_hz: f64,
}

#[wasm_bindgen]
impl IntervalBank {
    /// Starts with one fifth either side of the base.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<IntervalBank, JsValue> {
        let session = Rc::new(AudioSession::new().map_err(to_js)?);
        let rows = vec![fifths_range(1, 1).map_err(to_js)?];
        Ok(Self {
            bank: OscillatorBank::new(session.clone()),
            session,
            toggles: OscillatorToggles::new(),
            rows,
            base_hz: DEFAULT_BASE_HZ,
        })
    }

    pub fn set_fifths(&mut self, down: u32, up: u32) -> Result<(), JsValue> {
        self.rows = vec![fifths_range(down, up).map_err(to_js)?];
        self.refresh()
    }

    pub fn set_lattice(
        &mut self,
        fifths_down: u32,
        fifths_up: u32,
        thirds_down: u32,
        thirds_up: u32,
    ) -> Result<(), JsValue> {
        let bounds = LatticeBounds {
            fifths_down,
            fifths_up,
            thirds_down,
            thirds_up,
        };
        self.rows = just_lattice(bounds).map_err(to_js)?;
        self.refresh()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, |r| r.len())
    }

    /// Ratio as a fraction, e.g. `"9/8"`.
    pub fn label(&self, row: usize, col: usize) -> Option<String> {
        self.note(row, col).map(|n| n.to_string())
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.note(row, col).map(|n| n.value())
    }

    pub fn cents(&self, row: usize, col: usize) -> Option<f64> {
        self.note(row, col).map(|n| n.cents())
    }

    pub fn distance(&self, row: usize, col: usize) -> Option<i32> {
        self.note(row, col).map(|n| n.distance())
    }

    /// Frequency of a note at one of the `OSCILLATOR_OCTAVES` multipliers.
    pub fn frequency(&self, row: usize, col: usize, octave: usize) -> Option<f64> {
        self.key(row, col, octave).map(|k| k.frequency(self.base_hz))
    }

    /// Flip one oscillator; returns whether it now sounds.
    pub fn toggle(&mut self, row: usize, col: usize, octave: usize) -> Result<bool, JsValue> {
        let key = self
            .key(row, col, octave)
            .ok_or_else(|| JsValue::from_str(&format!("no note at {},{}/{}", row, col, octave)))?;
        let on = self.toggles.toggle(key);
        self.session.resume();
        self.bank
            .sync(&self.toggles, self.base_hz)
            .map_err(to_js)?;
        Ok(on)
    }

    pub fn is_active(&self, row: usize, col: usize, octave: usize) -> bool {
        self.key(row, col, octave)
            .is_some_and(|k| self.toggles.is_active(&k))
    }

    /// Retune every running oscillator.
    pub fn set_base_hz(&mut self, hz: f64) -> Result<(), JsValue> {
        self.base_hz = clamp_base_hz(hz);
        self.bank
            .sync(&self.toggles, self.base_hz)
            .map_err(to_js)
    }

    pub fn base_hz(&self) -> f64 {
        self.base_hz
    }

    pub fn running_count(&self) -> usize {
        self.bank.len()
    }

    pub fn silence(&mut self) {
        self.toggles.clear();
        self.bank.silence();
    }
}

impl IntervalBank {
    fn note(&self, row: usize, col: usize) -> Option<&RationalInterval> {
        self.rows.get(row)?.get(col)
    }

    fn key(&self, row: usize, col: usize, octave: usize) -> Option<ToneKey> {
        let octave = *OSCILLATOR_OCTAVES.get(octave)?;
        self.note(row, col).map(|n| ToneKey::new(n, octave))
    }

    fn refresh(&mut self) -> Result<(), JsValue> {
        if self.toggles.retain_available(self.rows.iter().flatten()) {
            log::info!("[harmony] dropped toggles outside the grid");
        }
        self.bank
            .sync(&self.toggles, self.base_hz)
            .map_err(to_js)
    }
}
