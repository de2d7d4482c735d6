// Tests for the tuning tables and the oscillator toggle set.

use fnv::FnvHashSet;
use rhythm_core::constants::MAX_FIFTHS;
use rhythm_core::*;

fn r(n: i64, d: i64) -> Rational {
    Rational::new(n, d)
}

fn ratios(row: &[RationalInterval]) -> Vec<Rational> {
    row.iter().map(|i| i.ratio()).collect()
}

#[test]
fn fifths_range_runs_from_down_to_up() {
    let series = fifths_range(1, 2).unwrap();
    assert_eq!(ratios(&series), vec![r(4, 3), r(1, 1), r(3, 2), r(9, 8)]);
    let distances: Vec<i32> = series.iter().map(|i| i.distance()).collect();
    assert_eq!(distances, vec![-1, 0, 1, 2]);

    let full = fifths_range(100, 100).unwrap();
    assert_eq!(full.len(), 2 * MAX_FIFTHS as usize + 1);
}

#[test]
fn default_lattice_is_a_single_row() {
    let rows = just_lattice(LatticeBounds::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(ratios(&rows[0]), vec![r(4, 3), r(1, 1), r(3, 2), r(9, 8)]);
}

#[test]
fn lattice_rows_stack_thirds_above_and_below() {
    let bounds = LatticeBounds {
        fifths_down: 0,
        fifths_up: 1,
        thirds_down: 1,
        thirds_up: 1,
    };
    let rows = just_lattice(bounds).unwrap();
    assert_eq!(rows.len(), 3);
    // highest third first, root row in the middle, lower third last
    assert_eq!(ratios(&rows[0]), vec![r(5, 4), r(15, 8)]);
    assert_eq!(ratios(&rows[1]), vec![r(1, 1), r(3, 2)]);
    assert_eq!(ratios(&rows[2]), vec![r(8, 5), r(6, 5)]);
}

#[test]
fn lattice_bounds_are_clamped() {
    let bounds = LatticeBounds {
        fifths_down: 0,
        fifths_up: 0,
        thirds_down: 50,
        thirds_up: 50,
    };
    let rows = just_lattice(bounds).unwrap();
    assert_eq!(rows.len(), 9);
    assert!(rows.iter().all(|row| row.len() == 1));
    assert_eq!(rows[4][0].ratio(), r(1, 1));
}

#[test]
fn twelve_tone_equal_division() {
    let steps = equal_division(12);
    assert_eq!(steps.len(), 12);
    assert_eq!(steps[0].scale, 1.0);
    assert!((steps[7].cents - 700.0).abs() < 1e-9);
    assert!((steps[6].scale - 2f64.sqrt()).abs() < 1e-12);
    assert!(equal_division(0).is_empty());
}

#[test]
fn cents_above_wraps_into_the_octave() {
    assert!((cents_above(700.0, 200.0) - 500.0).abs() < 1e-12);
    assert!((cents_above(200.0, 700.0) - 700.0).abs() < 1e-12);
    assert_eq!(cents_above(300.0, 300.0), 0.0);
}

#[test]
fn harmonic_series_stops_below_ceiling() {
    assert_eq!(harmonic_series(100.0, 450.0), vec![100.0, 200.0, 300.0, 400.0]);
    assert_eq!(harmonic_series(100.0, 400.0), vec![100.0, 200.0, 300.0]);
    assert!(harmonic_series(0.0, 400.0).is_empty());
}

#[test]
fn tone_key_frequency_uses_octave_multiplier() {
    let fifth = fifth_from_base(r(1, 1), 1).unwrap();
    let low = ToneKey::new(&fifth, -1);
    let high = ToneKey::new(&fifth, 2);
    assert!((low.frequency(200.0) - 150.0).abs() < 1e-9);
    assert!((high.frequency(200.0) - 1200.0).abs() < 1e-9);
    assert_eq!(high.multiplier(), 4.0);
}

#[test]
fn toggles_flip_and_clear() {
    let fifth = fifth_from_base(r(1, 1), 1).unwrap();
    let key = ToneKey::new(&fifth, 0);
    let mut toggles = OscillatorToggles::new();

    assert!(toggles.toggle(key));
    assert!(toggles.is_active(&key));
    assert!(!toggles.toggle(key));
    assert!(toggles.is_empty());

    toggles.toggle(key);
    toggles.toggle(ToneKey::new(&fifth, 1));
    assert_eq!(toggles.len(), 2);
    toggles.clear();
    assert!(toggles.is_empty());
}

#[test]
fn shrinking_the_page_drops_orphaned_toggles() {
    let wide = fifths_range(2, 2).unwrap();
    let narrow = fifths_range(1, 1).unwrap();
    let mut toggles = OscillatorToggles::new();
    for note in &wide {
        toggles.toggle(ToneKey::new(note, 0));
    }
    assert_eq!(toggles.len(), 5);

    assert!(toggles.retain_available(&narrow));
    assert_eq!(toggles.len(), 3);
    assert!(!toggles.retain_available(&narrow));
}

#[test]
fn diff_against_running_oscillators() {
    let notes = fifths_range(0, 2).unwrap();
    let a = ToneKey::new(&notes[0], 0);
    let b = ToneKey::new(&notes[1], 0);
    let c = ToneKey::new(&notes[2], 0);

    let mut toggles = OscillatorToggles::new();
    toggles.toggle(a);
    toggles.toggle(b);
    let running: FnvHashSet<ToneKey> = [b, c].into_iter().collect();

    let diff = toggles.diff(&running);
    assert_eq!(diff.start, vec![a]);
    assert_eq!(diff.stop, vec![c]);
    assert_eq!(diff.keep, vec![b]);
    assert_eq!(toggles.iter().count(), 2);
}

#[test]
fn note_names_resolve_enharmonics() {
    assert_eq!(note_index("C"), Some(0));
    assert_eq!(note_index("Bb"), Some(10));
    assert_eq!(note_index("F#"), Some(6));
    assert_eq!(note_index("Gb"), note_index("F#"));
    assert_eq!(note_index("B#"), Some(0));
    assert_eq!(note_index("H"), None);
}

#[test]
fn equal_notes_are_tuned_to_concert_a() {
    assert!((equal_note_frequency(9) - 440.0).abs() < 1e-9);
    assert!((equal_note_frequency(0) - 261.625_565).abs() < 1e-5);
    let semitone = equal_note_frequency(10) / equal_note_frequency(9);
    assert!((semitone - 2f64.powf(1.0 / 12.0)).abs() < 1e-12);
}

#[test]
fn chords_stack_fifth_third_and_seventh() {
    assert_eq!(chord_notes(0, ChordQuality::Major, None), vec![0, 4, 7]);
    assert_eq!(chord_notes(9, ChordQuality::Minor, None), vec![0, 4, 9]);
    assert_eq!(
        chord_notes(7, ChordQuality::Major, Some(Seventh::Dominant)),
        vec![2, 5, 7, 11]
    );
    assert_eq!(
        chord_notes(0, ChordQuality::Major, Some(Seventh::Major)),
        vec![0, 4, 7, 11]
    );

    // chord oscillators sound an octave below the note grid
    let freqs = chord_frequencies(9, ChordQuality::Minor, None);
    assert_eq!(freqs.len(), 3);
    assert!((freqs[2] - 220.0).abs() < 1e-9);
}
