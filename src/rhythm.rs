use std::cell::RefCell;
use std::rc::Rc;

use rhythm_core::constants::{clamp_tempo_bpm, DEFAULT_BAR_MS, MAX_BAR_MS, MIN_BAR_MS};
use rhythm_core::{
    BarGroove, ClockGroove, LoopSource, Onset, PatternConfig, PatternLoop, Preset,
    RhythmPattern, Track, PRESETS,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::constants::percussion_gain;
use crate::driver::{LoopDriver, TrackDriver};
use crate::session::AudioSession;
use crate::to_js;

fn steps_to_js(steps: &[bool]) -> Vec<u8> {
    steps.iter().map(|s| *s as u8).collect()
}

fn load_percussion(session: &Rc<AudioSession>) -> js_sys::Promise {
    let session = session.clone();
    future_to_promise(async move {
        session.load_percussion().await.map_err(to_js)?;
        Ok(JsValue::UNDEFINED)
    })
}

fn load_named(session: &Rc<AudioSession>, name: String, gain: Option<f32>) -> js_sys::Promise {
    let session = session.clone();
    let gain = gain.unwrap_or_else(|| percussion_gain(&name));
    future_to_promise(async move {
        session.load(&name, gain).await.map_err(to_js)?;
        Ok(JsValue::UNDEFINED)
    })
}

/// Labels of the named Euclidean rhythms, in preset index order.
#[wasm_bindgen]
pub fn preset_labels() -> js_sys::Array {
    PRESETS.iter().map(|p| JsValue::from_str(p.label)).collect()
}

type SharedLoop = Rc<RefCell<PatternLoop<String>>>;

/// One Euclidean pattern looped over a bar.
#[wasm_bindgen]
pub struct EuclidPlayer {
    session: Rc<AudioSession>,
    config: SharedLoop,
    driver: Rc<RefCell<LoopDriver<SharedLoop>>>,
}

#[wasm_bindgen]
impl EuclidPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<EuclidPlayer, JsValue> {
        let session = Rc::new(AudioSession::new().map_err(to_js)?);
        let config = Rc::new(RefCell::new(PatternLoop::with_bar_ms(
            RhythmPattern::default(),
            DEFAULT_BAR_MS,
            "kick".to_string(),
        )));
        let driver = LoopDriver::new(config.clone(), session.clone()).map_err(to_js)?;
        Ok(Self {
            session,
            config,
            driver,
        })
    }

    pub fn load_sounds(&self) -> js_sys::Promise {
        load_percussion(&self.session)
    }

    /// Load an extra sample; `gain` defaults to the kit's gain for known
    /// names.
    pub fn load_sound(&self, name: String, gain: Option<f32>) -> js_sys::Promise {
        load_named(&self.session, name, gain)
    }

    /// Clamp and apply raw input; returns the new steps (1 = onset).
    /// Takes effect from the next bar while playing.
    pub fn set_pattern(&self, step_count: i32, pulse_count: i32, offset: i32) -> Vec<u8> {
        let config =
            PatternConfig::clamped(step_count as i64, pulse_count as i64, offset as i64);
        let mut looped = self.config.borrow_mut();
        looped.pattern.reconfigure(config);
        steps_to_js(looped.pattern.steps())
    }

    pub fn apply_preset(&self, index: usize) -> Result<Vec<u8>, JsValue> {
        let preset = Preset::by_index(index).map_err(to_js)?;
        log::info!("[euclid] preset {}", preset.label);
        let mut looped = self.config.borrow_mut();
        looped.pattern.reconfigure(preset.config());
        Ok(steps_to_js(looped.pattern.steps()))
    }

    pub fn steps(&self) -> Vec<u8> {
        steps_to_js(self.config.borrow().pattern.steps())
    }

    pub fn step_count(&self) -> usize {
        self.config.borrow().pattern.step_count()
    }

    pub fn pulse_count(&self) -> usize {
        self.config.borrow().pattern.pulse_count()
    }

    pub fn offset(&self) -> i32 {
        self.config.borrow().pattern.config().offset as i32
    }

    pub fn set_bar_ms(&self, bar_ms: f64) {
        let bar_ms = if bar_ms.is_finite() {
            bar_ms.clamp(MIN_BAR_MS, MAX_BAR_MS)
        } else {
            DEFAULT_BAR_MS
        };
        self.config.borrow_mut().set_bar_ms(bar_ms);
    }

    pub fn set_sound(&self, name: String) {
        if !self.session.has_sound(&name) {
            log::warn!("[euclid] {} is not loaded yet", name);
        }
        self.config.borrow_mut().sound = name;
    }

    pub fn on_step(&self, f: js_sys::Function) {
        self.driver.borrow_mut().callbacks.step = Some(f);
    }

    pub fn on_phase(&self, f: js_sys::Function) {
        self.driver.borrow_mut().callbacks.phase = Some(f);
    }

    pub fn start(&self) {
        self.session.resume();
        let deferred = self.driver.borrow_mut().start();
        deferred.deliver();
    }

    pub fn stop(&self) {
        self.driver.borrow_mut().stop();
    }

    pub fn is_running(&self) -> bool {
        self.driver.borrow().is_running()
    }
}

impl Drop for EuclidPlayer {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.try_borrow_mut() {
            driver.stop();
        }
    }
}

/// The two hand-written grooves of the beats page.
#[derive(Clone, Debug)]
pub enum Groove {
    Clock(ClockGroove<String>),
    Bar(BarGroove<String>),
}

impl Groove {
    pub fn by_name(name: &str) -> Option<Self> {
        let (kick, snare, hat) = ("kick".to_string(), "snare".to_string(), "hat".to_string());
        match name {
            "clock" => Some(Groove::Clock(ClockGroove::new(kick, snare, hat))),
            "bar" => Some(Groove::Bar(BarGroove::new(kick, snare, hat))),
            _ => None,
        }
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        match self {
            Groove::Clock(g) => g.tempo_bpm = bpm,
            Groove::Bar(g) => g.tempo_bpm = bpm,
        }
    }

    /// Display position of window `index`: beat in the bar, or bar in the
    /// four-bar cycle.
    pub fn position(&self, index: u64) -> u64 {
        match self {
            Groove::Clock(_) => ClockGroove::<String>::beat_phase(index),
            Groove::Bar(_) => BarGroove::<String>::bar_cycle(index),
        }
    }
}

impl LoopSource for Groove {
    type Sound = String;

    fn period(&self) -> f64 {
        match self {
            Groove::Clock(g) => g.period(),
            Groove::Bar(g) => g.period(),
        }
    }

    fn onsets(&self, cycle: u64, out: &mut Vec<Onset<String>>) {
        match self {
            Groove::Clock(g) => g.onsets(cycle, out),
            Groove::Bar(g) => g.onsets(cycle, out),
        }
    }
}

type SharedGroove = Rc<RefCell<Groove>>;

#[wasm_bindgen]
pub struct GroovePlayer {
    session: Rc<AudioSession>,
    groove: SharedGroove,
    driver: Rc<RefCell<LoopDriver<SharedGroove>>>,
}

#[wasm_bindgen]
impl GroovePlayer {
    /// `kind` is `"clock"` or `"bar"`.
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str) -> Result<GroovePlayer, JsValue> {
        let groove = Groove::by_name(kind)
            .ok_or_else(|| JsValue::from_str(&format!("unknown groove {:?}", kind)))?;
        let session = Rc::new(AudioSession::new().map_err(to_js)?);
        let groove = Rc::new(RefCell::new(groove));
        let driver = LoopDriver::new(groove.clone(), session.clone()).map_err(to_js)?;
        Ok(Self {
            session,
            groove,
            driver,
        })
    }

    pub fn load_sounds(&self) -> js_sys::Promise {
        load_percussion(&self.session)
    }

    /// Clamp and apply a tempo; returns the tempo actually used.
    pub fn set_tempo(&self, bpm: f64) -> f64 {
        let bpm = clamp_tempo_bpm(bpm);
        self.groove.borrow_mut().set_tempo(bpm);
        bpm
    }

    pub fn position(&self, index: u32) -> u32 {
        self.groove.borrow().position(index as u64) as u32
    }

    /// `f(index, start)` for every planned window.
    pub fn on_window(&self, f: js_sys::Function) {
        self.driver.borrow_mut().callbacks.window = Some(f);
    }

    pub fn on_phase(&self, f: js_sys::Function) {
        self.driver.borrow_mut().callbacks.phase = Some(f);
    }

    pub fn start(&self) {
        self.session.resume();
        let deferred = self.driver.borrow_mut().start();
        deferred.deliver();
    }

    pub fn stop(&self) {
        self.driver.borrow_mut().stop();
    }

    pub fn is_running(&self) -> bool {
        self.driver.borrow().is_running()
    }
}

impl Drop for GroovePlayer {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.try_borrow_mut() {
            driver.stop();
        }
    }
}

type SharedTracks = Rc<RefCell<Vec<Track<String>>>>;

/// Several Euclidean tracks, each with its own period.
#[wasm_bindgen]
pub struct PolyPlayer {
    session: Rc<AudioSession>,
    tracks: SharedTracks,
    driver: Rc<RefCell<TrackDriver<SharedTracks>>>,
}

#[wasm_bindgen]
impl PolyPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<PolyPlayer, JsValue> {
        let session = Rc::new(AudioSession::new().map_err(to_js)?);
        let tracks: SharedTracks = Rc::new(RefCell::new(Vec::new()));
        let driver = TrackDriver::new(tracks.clone(), session.clone()).map_err(to_js)?;
        Ok(Self {
            session,
            tracks,
            driver,
        })
    }

    pub fn load_sounds(&self) -> js_sys::Promise {
        load_percussion(&self.session)
    }

    /// Load an extra sample; `gain` defaults to the kit's gain for known
    /// names.
    pub fn load_sound(&self, name: String, gain: Option<f32>) -> js_sys::Promise {
        load_named(&self.session, name, gain)
    }

    /// Append a track; returns its index.
    pub fn add_track(
        &self,
        step_count: i32,
        pulse_count: i32,
        offset: i32,
        period_sec: f64,
        sound: String,
    ) -> Result<usize, JsValue> {
        let config = PatternConfig::clamped(step_count as i64, pulse_count as i64, offset as i64);
        let track = Track::try_new(RhythmPattern::new(config), period_sec, sound).map_err(to_js)?;
        let mut tracks = self.tracks.borrow_mut();
        tracks.push(track);
        Ok(tracks.len() - 1)
    }

    pub fn remove_track(&self, index: usize) -> Result<(), JsValue> {
        let mut tracks = self.tracks.borrow_mut();
        if index >= tracks.len() {
            return Err(JsValue::from_str(&format!("no track {}", index)));
        }
        tracks.remove(index);
        drop(tracks);
        self.driver.borrow_mut().remove_track(index);
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.borrow().len()
    }

    pub fn set_track_pattern(
        &self,
        index: usize,
        step_count: i32,
        pulse_count: i32,
        offset: i32,
    ) -> Result<Vec<u8>, JsValue> {
        let config = PatternConfig::clamped(step_count as i64, pulse_count as i64, offset as i64);
        self.with_track(index, |t| {
            t.pattern.reconfigure(config);
            Ok(steps_to_js(t.pattern.steps()))
        })
    }

    pub fn set_track_period(&self, index: usize, period_sec: f64) -> Result<(), JsValue> {
        let period = rhythm_core::check_track_period(period_sec).map_err(to_js)?;
        self.with_track(index, |t| {
            t.period = period;
            Ok(())
        })
    }

    pub fn set_track_sound(&self, index: usize, sound: String) -> Result<(), JsValue> {
        self.with_track(index, |t| {
            t.sound = sound;
            Ok(())
        })
    }

    pub fn track_steps(&self, index: usize) -> Result<Vec<u8>, JsValue> {
        self.with_track(index, |t| Ok(steps_to_js(t.pattern.steps())))
    }

    /// Current phase of every track.
    pub fn phases(&self) -> Vec<f64> {
        self.driver.borrow().coordinator().phases().to_vec()
    }

    /// Seconds until tracks `a` and `b` line up again; `0` if they never do.
    pub fn alignment(&self, a: usize, b: usize) -> f64 {
        let tracks = self.tracks.borrow();
        match (tracks.get(a), tracks.get(b)) {
            (Some(a), Some(b)) => rhythm_core::lcm_periods(a.period, b.period),
            _ => 0.0,
        }
    }

    /// `f(track, step, at)` for every planned onset.
    pub fn on_step(&self, f: js_sys::Function) {
        self.driver.borrow_mut().callbacks.step = Some(f);
    }

    /// `f(phases)` after every tick.
    pub fn on_tick(&self, f: js_sys::Function) {
        self.driver.borrow_mut().callbacks.phases = Some(f);
    }

    pub fn start(&self) {
        self.session.resume();
        let deferred = self.driver.borrow_mut().start();
        deferred.deliver();
    }

    /// Bring every track back to phase 0.
    pub fn restart(&self) {
        self.session.resume();
        let deferred = self.driver.borrow_mut().restart();
        deferred.deliver();
    }

    pub fn stop(&self) {
        self.driver.borrow_mut().stop();
    }

    pub fn is_running(&self) -> bool {
        self.driver.borrow().is_running()
    }
}

impl PolyPlayer {
    fn with_track<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut Track<String>) -> Result<R, JsValue>,
    ) -> Result<R, JsValue> {
        let mut tracks = self.tracks.borrow_mut();
        let track = tracks
            .get_mut(index)
            .ok_or_else(|| JsValue::from_str(&format!("no track {}", index)))?;
        f(track)
    }
}

impl Drop for PolyPlayer {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.try_borrow_mut() {
            driver.stop();
        }
    }
}
