use std::ops::RangeInclusive;

use crate::constants::{MAX_STEPS, MIN_PULSES};
use crate::error::ConfigError;
use crate::euclid::{euclid, Steps};

/// Validated inputs of the Euclidean generator.
///
/// Fields:
/// - `step_count`: slots per cycle, `1..=MAX_STEPS`
/// - `pulse_count`: onsets per cycle, `1..=step_count`
/// - `offset`: rotation applied to slot indices, any integer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatternConfig {
    pub step_count: usize,
    pub pulse_count: usize,
    pub offset: i64,
}

impl PatternConfig {
    /// Validate raw counts, rejecting anything the generator must never see.
    pub fn new(step_count: usize, pulse_count: usize, offset: i64) -> Result<Self, ConfigError> {
        if !(1..=MAX_STEPS).contains(&step_count) {
            return Err(ConfigError::StepCount(step_count));
        }
        if !(MIN_PULSES..=step_count).contains(&pulse_count) {
            return Err(ConfigError::PulseCount {
                pulses: pulse_count,
                steps: step_count,
            });
        }
        Ok(Self {
            step_count,
            pulse_count,
            offset,
        })
    }

    /// Clamp raw (possibly negative) input the way the number fields do:
    /// steps into `1..=MAX_STEPS`, pulses into `1..=steps` and offset into
    /// `-(steps-1)..=steps-1`.
    pub fn clamped(step_count: i64, pulse_count: i64, offset: i64) -> Self {
        let step_count = step_count.clamp(1, MAX_STEPS as i64);
        let pulse_count = pulse_count.clamp(MIN_PULSES as i64, step_count);
        let span = step_count - 1;
        Self {
            step_count: step_count as usize,
            pulse_count: pulse_count as usize,
            offset: offset.clamp(-span, span),
        }
    }

    /// Offsets the offset field accepts for this step count.
    pub fn offset_range(&self) -> RangeInclusive<i64> {
        let span = self.step_count as i64 - 1;
        -span..=span
    }

    /// Pulse counts the pulses field accepts for this step count.
    pub fn pulse_range(&self) -> RangeInclusive<usize> {
        MIN_PULSES..=self.step_count
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            step_count: 4,
            pulse_count: 2,
            offset: 1,
        }
    }
}

/// A pattern together with its derived onset flags.
///
/// `steps` is always recomputed from the config; there is no way to edit it
/// directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RhythmPattern {
    config: PatternConfig,
    steps: Steps,
}

impl RhythmPattern {
    pub fn new(config: PatternConfig) -> Self {
        let steps = euclid(config.step_count, config.pulse_count, config.offset);
        Self { config, steps }
    }

    pub fn try_new(step_count: usize, pulse_count: usize, offset: i64) -> Result<Self, ConfigError> {
        PatternConfig::new(step_count, pulse_count, offset).map(Self::new)
    }

    #[inline]
    pub fn config(&self) -> PatternConfig {
        self.config
    }

    #[inline]
    pub fn steps(&self) -> &[bool] {
        &self.steps
    }

    #[inline]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn pulse_count(&self) -> usize {
        self.config.pulse_count
    }

    /// Replace the config and re-derive the steps.
    pub fn reconfigure(&mut self, config: PatternConfig) {
        if config != self.config {
            *self = Self::new(config);
        }
    }

    /// Onsets as `(step_index, position)` with `position = index / len` in
    /// `[0, 1)`, in index order.
    pub fn onsets(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        let len = self.steps.len() as f64;
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(move |(i, _)| (i, i as f64 / len))
    }
}

impl Default for RhythmPattern {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}

impl From<PatternConfig> for RhythmPattern {
    fn from(config: PatternConfig) -> Self {
        Self::new(config)
    }
}

/// Named Euclidean rhythm used to pre-fill the pattern inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub pulse_count: usize,
    pub step_count: usize,
    pub offset: i64,
    pub label: &'static str,
}

impl Preset {
    pub fn config(&self) -> PatternConfig {
        PatternConfig {
            step_count: self.step_count,
            pulse_count: self.pulse_count,
            offset: self.offset,
        }
    }

    pub fn by_index(index: usize) -> Result<&'static Preset, ConfigError> {
        PRESETS.get(index).ok_or(ConfigError::UnknownPreset(index))
    }
}

const fn preset(pulse_count: usize, step_count: usize, offset: i64, label: &'static str) -> Preset {
    Preset {
        pulse_count,
        step_count,
        offset,
        label,
    }
}

pub const PRESETS: &[Preset] = &[
    preset(2, 4, 0, "basic"),
    preset(2, 3, 1, "Conga, Latin American"),
    preset(2, 5, -2, "Persian khafif-e-ramal, take five"),
    preset(
        3,
        4,
        1,
        "Cumbia, Calypso, Persian khalif-e-saghil, Greek trochoid choreic",
    ),
    preset(3, 5, 1, "Russian folk"),
    preset(3, 7, -2, "Bulgarian folk dance, Pink Floyd's Money"),
    preset(3, 8, 1, "Cuban tresillo"),
    preset(4, 7, 1, "Bulgarian folk dance"),
    preset(4, 9, -2, "Turkish Aksak rhythm"),
    preset(4, 11, 1, "Frank Zappa's Outside Now"),
    preset(5, 6, 1, "Arabic York-Samai"),
    preset(5, 7, 1, "Arabic Nawakhat"),
    preset(5, 8, -1, "Cuban Cinquillo, Tango, Persian Al-saghil-al-sani"),
    preset(
        5,
        9,
        1,
        "Arabic Agsag-Samai, South African Venda, Rumanian folk dance",
    ),
    preset(5, 11, -2, "Moussorgsky's Pictures at an Exhibition"),
    preset(5, 12, 1, "South African Venda (children's song)"),
    preset(5, 16, 7, "Brazilian Bossa Nova"),
    preset(7, 8, 1, "Tuaregian frame-drum rhythm"),
    preset(7, 12, -3, "common West African bell pattern"),
    preset(7, 16, 3, "Brazilian Samba, Ghanan clapping pattern"),
    preset(9, 16, 4, "various African, Brazilian Samba"),
    preset(11, 24, 1, "Aka pygmies of Central Africa"),
    preset(13, 24, -9, "Aka pygmies of upper Sangha"),
];
