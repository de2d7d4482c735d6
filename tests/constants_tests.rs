// Host-side tests for the WebAudio tuning constants.
// The main crate is wasm-only, so we include the pure-Rust module directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}

use constants::*;

#[test]
#[allow(clippy::assertions_on_constants)]
fn gains_are_audible_and_unclipped() {
    for (name, gain) in PERCUSSION {
        assert!(gain > 0.0 && gain <= 1.0, "{} gain {}", name, gain);
    }
    assert!(DEFAULT_SOUND_GAIN > 0.0 && DEFAULT_SOUND_GAIN <= 1.0);
    assert!(OSC_GAIN > 0.0 && OSC_GAIN <= 1.0);
}

#[test]
fn kit_gains_match_sound_levels() {
    assert_eq!(percussion_gain("kick"), 0.8);
    assert_eq!(percussion_gain("snare"), 0.4);
    assert_eq!(percussion_gain("hat"), 0.2);
    assert_eq!(percussion_gain("clap"), 0.5);
    assert_eq!(percussion_gain("chimes"), DEFAULT_SOUND_GAIN);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn ramp_floor_is_positive_and_below_gain() {
    // exponential ramps need a strictly positive target
    assert!(OSC_RAMP_FLOOR > 0.0);
    assert!(OSC_RAMP_FLOOR < OSC_GAIN / 1000.0);
}

#[test]
fn sound_urls_point_at_sample_folder() {
    assert_eq!(sound_url("kick"), "/sounds/kick.mp3");
}

#[test]
fn base_frequency_is_clamped_to_input_range() {
    assert_eq!(clamp_base_hz(5.0), MIN_BASE_HZ);
    assert_eq!(clamp_base_hz(5000.0), MAX_BASE_HZ);
    assert_eq!(clamp_base_hz(440.0), 440.0);
    assert_eq!(clamp_base_hz(f64::NAN), DEFAULT_BASE_HZ);
    assert!((MIN_BASE_HZ..=MAX_BASE_HZ).contains(&DEFAULT_BASE_HZ));
}
