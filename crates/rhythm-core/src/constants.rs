// Shared timing and range constants used by the scheduler, the coordinator
// and both front-ends.

// Pattern input ranges
pub const MAX_STEPS: usize = 64; // largest step count the pattern inputs accept
pub const MIN_PULSES: usize = 1; // zero pulses is clamped away before generation

// Look-ahead scheduling
pub const SCHEDULE_MARGIN_SEC: f64 = 0.010; // wake this far ahead of the next window
pub const PHASE_TICKS_PER_WINDOW: usize = 64; // visual phase updates per window
pub const DEFAULT_LEAD_IN_SEC: f64 = 0.25; // first window starts this far after `now`

// Multi-track coordinator
pub const DEFAULT_TRACK_TICK_SEC: f64 = 0.050; // shared coarse tick
pub const MIN_TRACK_PERIOD_SEC: f64 = 0.2;
pub const MAX_TRACK_PERIOD_SEC: f64 = 20.0;

// Single-pattern bar length (milliseconds, as entered on the page)
pub const MIN_BAR_MS: f64 = 500.0;
pub const MAX_BAR_MS: f64 = 4000.0;
pub const DEFAULT_BAR_MS: f64 = 2000.0;

// Beats page tempo
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const MIN_TEMPO_BPM: f64 = 30.0;
pub const MAX_TEMPO_BPM: f64 = 300.0; // a 50ms clock window, well above timer granularity

// Alignment display resolution: periods are compared on a millisecond grid
pub const ALIGNMENT_RESOLUTION_SEC: f64 = 0.001;

// Harmony pages
pub const MAX_FIFTHS: u32 = 12; // per direction
pub const MAX_THIRDS: u32 = 4; // per direction
pub const OSCILLATOR_OCTAVES: [i8; 5] = [-2, -1, 0, 1, 2]; // multipliers 0.25 .. 4
pub const OSCILLATOR_RAMP_SEC: f64 = 0.25; // frequency/gain ramp lead time
pub const CONCERT_A_HZ: f64 = 440.0; // chord page reference pitch

#[inline]
pub fn tempo_to_beat_sec(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Clamp a tempo into the playable range; non-finite input falls back to
/// the default.
pub fn clamp_tempo_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)
    } else {
        DEFAULT_TEMPO_BPM
    }
}
