use std::rc::Rc;

use fnv::{FnvHashMap, FnvHashSet};
use rhythm_core::constants::OSCILLATOR_RAMP_SEC;
use rhythm_core::{AudioClock, OscillatorToggles, ToneError, ToneGenerator, ToneKey};
use wasm_bindgen::JsValue;
use web_sys as web;

use crate::constants::{OSC_GAIN, OSC_RAMP_FLOOR};
use crate::session::{AudioSession, LoadedSound};

fn backend(e: JsValue) -> ToneError {
    ToneError::Backend(format!("{:?}", e))
}

// Create a GainNode with an initial value at `at`; logs on failure
fn create_gain(
    audio_ctx: &web::AudioContext,
    value: f32,
    at: f64,
    label: &str,
) -> Result<web::GainNode, JsValue> {
    let g = web::GainNode::new(audio_ctx).map_err(|e| {
        log::error!("{} GainNode error: {:?}", label, e);
        e
    })?;
    g.gain().set_value_at_time(value, at)?;
    Ok(g)
}

/// Start a decoded sample at an absolute audio-clock time.
///
/// Buffer sources can only be started once, so every onset gets its own
/// source and gain node; both are released by the browser after playback.
pub fn trigger_one_shot(
    audio_ctx: &web::AudioContext,
    sound: &LoadedSound,
    at: f64,
) -> Result<(), JsValue> {
    let src = audio_ctx.create_buffer_source()?;
    src.set_buffer(Some(&sound.buffer));
    let gain = create_gain(audio_ctx, sound.gain, audio_ctx.current_time(), "one-shot")?;
    src.connect_with_audio_node(&gain)?;
    gain.connect_with_audio_node(&audio_ctx.destination())?;
    src.start_with_when(at)?;
    Ok(())
}

/// Tone generator for the rhythm pages: sounds are sample names registered
/// on the session.
pub struct WebTones {
    session: Rc<AudioSession>,
}

impl WebTones {
    pub fn new(session: Rc<AudioSession>) -> Self {
        Self { session }
    }
}

impl AudioClock for WebTones {
    fn now(&self) -> f64 {
        self.session.now()
    }
}

impl ToneGenerator for WebTones {
    type Sound = String;

    fn play_onset_at(&mut self, sound: &String, at: f64) -> Result<(), ToneError> {
        let loaded = self
            .session
            .sound(sound)
            .ok_or_else(|| ToneError::UnknownSound(sound.clone()))?;
        trigger_one_shot(self.session.context(), &loaded, at).map_err(backend)
    }
}

struct Voice {
    osc: web::OscillatorNode,
    gain: web::GainNode,
    frequency: f64,
}

/// Sustained sawtooth oscillators of the harmony pages, keyed by tone.
pub struct OscillatorBank {
    session: Rc<AudioSession>,
    running: FnvHashMap<ToneKey, Voice>,
}

impl OscillatorBank {
    pub fn new(session: Rc<AudioSession>) -> Self {
        Self {
            session,
            running: FnvHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn running_keys(&self) -> FnvHashSet<ToneKey> {
        self.running.keys().copied().collect()
    }

    /// Bring the running oscillators in line with `toggles` at `base_hz`.
    ///
    /// New tones fade in and removed tones fade out over
    /// `OSCILLATOR_RAMP_SEC`; kept tones glide to their new frequency.
    pub fn sync(&mut self, toggles: &OscillatorToggles, base_hz: f64) -> Result<(), ToneError> {
        let now = self.session.now();
        let target = now + OSCILLATOR_RAMP_SEC;
        let diff = toggles.diff(&self.running_keys());

        for key in &diff.stop {
            if let Some(voice) = self.running.remove(key) {
                release(&voice, target);
            }
        }
        for key in &diff.keep {
            if let Some(voice) = self.running.get_mut(key) {
                let frequency = key.frequency(base_hz);
                if voice.frequency != frequency {
                    voice
                        .osc
                        .frequency()
                        .linear_ramp_to_value_at_time(frequency as f32, target)
                        .map_err(backend)?;
                    voice.frequency = frequency;
                }
            }
        }
        for key in &diff.start {
            let voice = self.start_voice(key.frequency(base_hz), now, target)?;
            self.running.insert(*key, voice);
        }
        log::debug!(
            "[oscillators] +{} -{} ={}",
            diff.start.len(),
            diff.stop.len(),
            diff.keep.len()
        );
        Ok(())
    }

    /// Fade out everything.
    pub fn silence(&mut self) {
        let target = self.session.now() + OSCILLATOR_RAMP_SEC;
        for (_, voice) in self.running.drain() {
            release(&voice, target);
        }
    }

    fn start_voice(&self, frequency: f64, now: f64, target: f64) -> Result<Voice, ToneError> {
        let ctx = self.session.context();
        let osc = web::OscillatorNode::new(ctx).map_err(backend)?;
        osc.set_type(web::OscillatorType::Sawtooth);
        osc.frequency()
            .set_value_at_time(frequency as f32, now)
            .map_err(backend)?;
        let gain = create_gain(ctx, OSC_RAMP_FLOOR, now, "oscillator").map_err(backend)?;
        gain.gain()
            .exponential_ramp_to_value_at_time(OSC_GAIN, target)
            .map_err(backend)?;
        osc.connect_with_audio_node(&gain).map_err(backend)?;
        gain.connect_with_audio_node(&ctx.destination())
            .map_err(backend)?;
        osc.start().map_err(backend)?;
        Ok(Voice {
            osc,
            gain,
            frequency,
        })
    }
}

fn release(voice: &Voice, target: f64) {
    if let Err(e) = voice
        .gain
        .gain()
        .exponential_ramp_to_value_at_time(OSC_RAMP_FLOOR, target)
    {
        log::warn!("[oscillators] fade failed: {:?}", e);
    }
    if let Err(e) = voice.osc.stop_with_when(target) {
        log::warn!("[oscillators] stop failed: {:?}", e);
    }
}
