/// WebAudio tuning for the pages.
///
/// Gains and ramp targets are kept here so the audio code only wires nodes.
// Percussion one-shot gains, by sound name
pub const KICK_GAIN: f32 = 0.8;
pub const SNARE_GAIN: f32 = 0.4;
pub const HAT_GAIN: f32 = 0.2;
pub const CLAP_GAIN: f32 = 0.5;

// Gain used when a sound is registered without one
pub const DEFAULT_SOUND_GAIN: f32 = 0.5;

pub const PERCUSSION: [(&str, f32); 4] = [
    ("kick", KICK_GAIN),
    ("snare", SNARE_GAIN),
    ("hat", HAT_GAIN),
    ("clap", CLAP_GAIN),
];

// Decoded sample location: `{SOUND_URL_PREFIX}{name}{SOUND_URL_SUFFIX}`
pub const SOUND_URL_PREFIX: &str = "/sounds/";
pub const SOUND_URL_SUFFIX: &str = ".mp3";

// Sustained oscillator bank (harmony pages)
pub const OSC_GAIN: f32 = 0.15;
pub const OSC_RAMP_FLOOR: f32 = 0.00001; // exponential ramps cannot reach 0

// Base frequency input bounds (Hz)
pub const DEFAULT_BASE_HZ: f64 = 200.0;
pub const MIN_BASE_HZ: f64 = 20.0;
pub const MAX_BASE_HZ: f64 = 2000.0;

pub fn sound_url(name: &str) -> String {
    format!("{}{}{}", SOUND_URL_PREFIX, name, SOUND_URL_SUFFIX)
}

/// Registered gain for a percussion sound, or the default.
pub fn percussion_gain(name: &str) -> f32 {
    PERCUSSION
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, g)| *g)
        .unwrap_or(DEFAULT_SOUND_GAIN)
}

/// Clamp a base frequency the way the number field does; non-finite input
/// falls back to the default.
pub fn clamp_base_hz(hz: f64) -> f64 {
    if hz.is_finite() {
        hz.clamp(MIN_BASE_HZ, MAX_BASE_HZ)
    } else {
        DEFAULT_BASE_HZ
    }
}
