// Tests for the Euclidean generator, pattern validation and the preset table.

use rhythm_core::constants::MAX_STEPS;
use rhythm_core::*;

const T: bool = true;
const F: bool = false;

#[test]
fn generate_has_requested_length_and_onset_count() {
    for steps in 1..=MAX_STEPS {
        for pulses in 1..=steps {
            for offset in [-(steps as i64), -1, 0, 1, 3, steps as i64 + 2] {
                let s = euclid(steps, pulses, offset);
                assert_eq!(s.len(), steps, "length for {steps}/{pulses}/{offset}");
                assert_eq!(
                    onset_count(&s),
                    pulses,
                    "onset count for {steps}/{pulses}/{offset}"
                );
            }
        }
    }
}

#[test]
fn accumulator_golden_values() {
    assert_eq!(euclid(8, 3, 0).as_slice(), &[F, F, T, F, F, T, F, T]);
    assert_eq!(euclid(4, 2, 0).as_slice(), &[F, T, F, T]);
}

#[test]
fn tresillo_preset_matches_literal() {
    // preset offset 1 rotates the accumulator output onto the downbeat
    assert_eq!(euclid(8, 3, 1).as_slice(), &[T, F, F, T, F, F, T, F]);
}

#[test]
fn offset_rotates_index_but_keeps_count() {
    let a = euclid(4, 2, 0);
    let b = euclid(4, 2, 1);
    assert_ne!(a, b);
    assert_eq!(b.as_slice(), &[T, F, T, F]);
    assert_eq!(onset_count(&a), 2);
    assert_eq!(onset_count(&b), 2);
}

#[test]
fn offset_is_taken_modulo_step_count() {
    assert_eq!(euclid(5, 2, 7), euclid(5, 2, 2));
    assert_eq!(euclid(5, 2, -3), euclid(5, 2, 2));
    assert_eq!(euclid(7, 3, -14), euclid(7, 3, 0));
}

#[test]
fn all_pulses_fill_every_step() {
    for n in 1..=16 {
        assert!(euclid(n, n, 0).iter().all(|s| *s), "{n}/{n} should be all onsets");
    }
}

#[test]
fn generate_is_deterministic() {
    for (s, p, o) in [(16, 5, 7), (24, 13, -9), (12, 7, -3)] {
        assert_eq!(euclid(s, p, o), euclid(s, p, o));
    }
}

#[test]
fn zero_steps_yields_empty() {
    assert!(euclid(0, 0, 0).is_empty());
}

#[test]
fn config_rejects_out_of_range_counts() {
    assert_eq!(PatternConfig::new(0, 1, 0), Err(ConfigError::StepCount(0)));
    assert_eq!(
        PatternConfig::new(MAX_STEPS + 1, 1, 0),
        Err(ConfigError::StepCount(MAX_STEPS + 1))
    );
    assert_eq!(
        PatternConfig::new(8, 0, 0),
        Err(ConfigError::PulseCount { pulses: 0, steps: 8 })
    );
    assert_eq!(
        PatternConfig::new(8, 9, 0),
        Err(ConfigError::PulseCount { pulses: 9, steps: 8 })
    );
    assert!(PatternConfig::new(8, 8, -7).is_ok());
}

#[test]
fn config_clamps_like_number_inputs() {
    let c = PatternConfig::clamped(100, 0, -500);
    assert_eq!(c.step_count, MAX_STEPS);
    assert_eq!(c.pulse_count, 1);
    assert_eq!(c.offset, -(MAX_STEPS as i64 - 1));

    let c = PatternConfig::clamped(-3, 9, 4);
    assert_eq!((c.step_count, c.pulse_count, c.offset), (1, 1, 0));

    let c = PatternConfig::clamped(8, 12, 3);
    assert_eq!((c.step_count, c.pulse_count, c.offset), (8, 8, 3));
    assert_eq!(c.offset_range(), -7..=7);
    assert_eq!(c.pulse_range(), 1..=8);
}

#[test]
fn pattern_steps_follow_config() {
    let mut p = RhythmPattern::try_new(8, 3, 1).expect("valid");
    assert_eq!(p.steps(), &[T, F, F, T, F, F, T, F]);
    let onsets: Vec<_> = p.onsets().collect();
    assert_eq!(onsets, vec![(0, 0.0), (3, 3.0 / 8.0), (6, 6.0 / 8.0)]);

    p.reconfigure(PatternConfig::new(4, 2, 0).expect("valid"));
    assert_eq!(p.steps(), &[F, T, F, T]);
    assert_eq!(p.step_count(), 4);
    assert_eq!(p.pulse_count(), 2);
}

#[test]
fn presets_are_valid_configs() {
    assert_eq!(PRESETS.len(), 23);
    for preset in PRESETS {
        let c = preset.config();
        assert!(
            PatternConfig::new(c.step_count, c.pulse_count, c.offset).is_ok(),
            "preset {:?} should validate",
            preset.label
        );
        let p = RhythmPattern::new(c);
        assert_eq!(onset_count(p.steps()), preset.pulse_count);
    }
    let tresillo = Preset::by_index(6).expect("exists");
    assert_eq!(tresillo.label, "Cuban tresillo");
    assert_eq!(Preset::by_index(99), Err(ConfigError::UnknownPreset(99)));
}
