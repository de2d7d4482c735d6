//! Multi-track phase coordinator for polyrhythms.
//!
//! Every track has its own period, but all of them share one coarse tick.
//! Each tick covers a fixed slice of audio time; for each track the slice is
//! converted to a span of phase, the onsets inside that span are handed to
//! the tone generator and the track's phase advances by the span. Phases are
//! never realigned across tracks except by an explicit [`PhaseCoordinator::restart`],
//! so genuine polyrhythmic drift stays observable.

use std::cell::RefCell;
use std::rc::Rc;

use num_integer::Integer;

use crate::clock::{
    is_valid_period, wake_delay, CoarseTimer, RunState, ScheduleWindow, ToneGenerator, Wake,
    WindowChain,
};
use crate::constants::{
    ALIGNMENT_RESOLUTION_SEC, DEFAULT_LEAD_IN_SEC, DEFAULT_TRACK_TICK_SEC, MAX_TRACK_PERIOD_SEC,
    MIN_TRACK_PERIOD_SEC, SCHEDULE_MARGIN_SEC,
};
use crate::error::ConfigError;
use crate::pattern::RhythmPattern;

/// Tuning for the coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorParams {
    pub tick_sec: f64,
    pub margin_sec: f64,
    pub lead_in_sec: f64,
}

impl Default for CoordinatorParams {
    fn default() -> Self {
        Self {
            tick_sec: DEFAULT_TRACK_TICK_SEC,
            margin_sec: SCHEDULE_MARGIN_SEC,
            lead_in_sec: DEFAULT_LEAD_IN_SEC,
        }
    }
}

/// Static configuration of one track.
#[derive(Clone, Debug)]
pub struct Track<S> {
    pub pattern: RhythmPattern,
    pub period: f64,
    pub sound: S,
}

impl<S> Track<S> {
    pub fn new(pattern: RhythmPattern, period: f64, sound: S) -> Self {
        Self {
            pattern,
            period,
            sound,
        }
    }

    /// Like [`Track::new`], rejecting periods outside the page's input range.
    pub fn try_new(pattern: RhythmPattern, period: f64, sound: S) -> Result<Self, ConfigError> {
        Ok(Self::new(pattern, check_track_period(period)?, sound))
    }
}

/// Accept a track period within `MIN_TRACK_PERIOD_SEC..=MAX_TRACK_PERIOD_SEC`.
pub fn check_track_period(period: f64) -> Result<f64, ConfigError> {
    if (MIN_TRACK_PERIOD_SEC..=MAX_TRACK_PERIOD_SEC).contains(&period) {
        Ok(period)
    } else {
        Err(ConfigError::Period(period))
    }
}

/// Live track list, read at every tick.
pub trait TrackSource {
    type Sound;

    fn with_tracks<R>(&self, f: impl FnOnce(&[Track<Self::Sound>]) -> R) -> R;
}

impl<S> TrackSource for Vec<Track<S>> {
    type Sound = S;

    fn with_tracks<R>(&self, f: impl FnOnce(&[Track<S>]) -> R) -> R {
        f(self)
    }
}

impl<T: TrackSource> TrackSource for Rc<RefCell<T>> {
    type Sound = T::Sound;

    fn with_tracks<R>(&self, f: impl FnOnce(&[Track<Self::Sound>]) -> R) -> R {
        self.borrow().with_tracks(f)
    }
}

pub trait TrackListener {
    fn on_trigger(&mut self, _track: usize, _step_index: usize, _at: f64) {}
    /// Called after every tick with the updated phase of each track.
    fn on_tick(&mut self, _window: &ScheduleWindow, _phases: &[f64]) {}
}

impl TrackListener for () {}

/// Read-only view of a track for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPhase {
    pub track: usize,
    pub phase: f64,
    pub period: f64,
}

/// When two tracks' cycles next coincide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pub first: usize,
    pub second: usize,
    /// Seconds between coincidences; `0.0` means the pair never aligns.
    pub period: f64,
}

/// Onsets of `pattern` whose phase lies in `[start, end)`.
///
/// `end` may exceed 1 (a tick longer than the remaining cycle, or than a
/// whole cycle); positions are unrolled across cycle boundaries. Each hit is
/// `(step_index, offset)` where `offset` is the phase distance from `start`.
pub fn onsets_in_span(pattern: &RhythmPattern, start: f64, end: f64, out: &mut Vec<(usize, f64)>) {
    if end.is_nan() || end <= start {
        return;
    }
    let last_cycle = end.floor() as u64;
    for cycle in 0..=last_cycle {
        let c = cycle as f64;
        let lo = start - c;
        let hi = end - c;
        for (index, position) in pattern.onsets() {
            if position >= lo && position < hi {
                out.push((index, c + position - start));
            }
        }
    }
}

/// Least common multiple of two periods in seconds, on a millisecond grid.
///
/// `lcm(a, 0) == 0`: a zero (or invalid) period never aligns.
pub fn lcm_periods(a: f64, b: f64) -> f64 {
    let (Some(a), Some(b)) = (quantize(a), quantize(b)) else {
        return 0.0;
    };
    if a == 0 || b == 0 {
        return 0.0;
    }
    // a / gcd * b, returning the never-aligns sentinel if it leaves u64
    match (a / a.gcd(&b)).checked_mul(b) {
        Some(lcm) => lcm as f64 * ALIGNMENT_RESOLUTION_SEC,
        None => 0.0,
    }
}

fn quantize(secs: f64) -> Option<u64> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let steps = (secs / ALIGNMENT_RESOLUTION_SEC).round();
    // u64::MAX as f64 rounds up to 2^64, which no u64 can hold
    if steps >= u64::MAX as f64 {
        return None;
    }
    Some(steps as u64)
}

/// Pairwise alignment of every track pair, in `(i, j)` order with `i < j`.
pub fn alignments(periods: &[f64]) -> Vec<Alignment> {
    let mut out = Vec::new();
    for (i, a) in periods.iter().enumerate() {
        for (j, b) in periods.iter().enumerate().skip(i + 1) {
            out.push(Alignment {
                first: i,
                second: j,
                period: lcm_periods(*a, *b),
            });
        }
    }
    out
}

pub struct PhaseCoordinator<Src: TrackSource, Tok> {
    source: Src,
    params: CoordinatorParams,
    state: RunState<Tok>,
    phases: Vec<f64>,
    hits: Vec<(usize, f64)>,
}

impl<Src: TrackSource, Tok> PhaseCoordinator<Src, Tok> {
    pub fn new(source: Src, params: CoordinatorParams) -> Self {
        let count = source.with_tracks(|t| t.len());
        Self {
            source,
            params,
            state: RunState::Idle,
            phases: vec![0.0; count],
            hits: Vec::new(),
        }
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    pub fn params(&self) -> &CoordinatorParams {
        &self.params
    }

    pub fn state(&self) -> &RunState<Tok> {
        &self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Current phase of every track, `[0, 1)`.
    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    /// Drop the phase of track `index` after it was removed from the live
    /// list, so later tracks keep their own phases.
    pub fn remove_track(&mut self, index: usize) {
        if index < self.phases.len() {
            self.phases.remove(index);
        }
    }

    pub fn snapshot(&self) -> Vec<TrackPhase> {
        self.source.with_tracks(|tracks| {
            tracks
                .iter()
                .enumerate()
                .map(|(track, t)| TrackPhase {
                    track,
                    phase: self.phases.get(track).copied().unwrap_or(0.0),
                    period: t.period,
                })
                .collect()
        })
    }

    /// Pairwise alignment of the current track periods.
    pub fn alignments(&self) -> Vec<Alignment> {
        let periods = self
            .source
            .with_tracks(|tracks| tracks.iter().map(|t| t.period).collect::<Vec<_>>());
        alignments(&periods)
    }

    pub fn start<G, T, Lst>(&mut self, tones: &mut G, timer: &mut T, listener: &mut Lst)
    where
        G: ToneGenerator<Sound = Src::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: TrackListener,
    {
        self.state.settle(tones.now());
        if self.state.is_running() {
            log::warn!("[coordinator] start ignored; already running");
            return;
        }
        if !is_valid_period(self.params.tick_sec) {
            log::warn!("[coordinator] invalid tick {}; not starting", self.params.tick_sec);
            return;
        }
        let t0 = tones.now() + self.params.lead_in_sec;
        log::info!("[coordinator] start at {:.3}, tick {:.3}s", t0, self.params.tick_sec);
        self.state = RunState::Running {
            chain: WindowChain::starting_at(t0),
            advance: None,
        };
        self.tick(tones, timer, listener);
    }

    /// Zero every phase and restart the tick chain from `now + lead_in`.
    /// This is the only way tracks are brought back into step.
    pub fn restart<G, T, Lst>(&mut self, tones: &mut G, timer: &mut T, listener: &mut Lst)
    where
        G: ToneGenerator<Sound = Src::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: TrackListener,
    {
        if let RunState::Running { advance, .. } = &mut self.state {
            if let Some(token) = advance.take() {
                timer.cancel(token);
            }
        }
        self.state = RunState::Idle;
        self.phases.iter_mut().for_each(|p| *p = 0.0);
        log::info!("[coordinator] restart");
        self.start(tones, timer, listener);
    }

    pub fn on_wake<G, T, Lst>(
        &mut self,
        wake: Wake,
        tones: &mut G,
        timer: &mut T,
        listener: &mut Lst,
    ) -> Option<ScheduleWindow>
    where
        G: ToneGenerator<Sound = Src::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: TrackListener,
    {
        self.state.settle(tones.now());
        match wake {
            Wake::Advance if self.state.is_running() => self.tick(tones, timer, listener),
            _ => {
                log::debug!("[coordinator] ignoring {:?} while {}", wake, self.state.label());
                None
            }
        }
    }

    /// Cancel the pending tick. Onsets already handed over still sound.
    pub fn stop<T>(&mut self, now: f64, timer: &mut T)
    where
        T: CoarseTimer<Token = Tok>,
    {
        let state = std::mem::replace(&mut self.state, RunState::Idle);
        if let RunState::Running { chain, advance } = state {
            if let Some(token) = advance {
                timer.cancel(token);
            }
            log::info!("[coordinator] stop; draining until {:.3}", chain.next_start());
            self.state = RunState::Stopping {
                drain_until: chain.next_start(),
            };
            self.state.settle(now);
        }
    }

    fn tick<G, T, Lst>(
        &mut self,
        tones: &mut G,
        timer: &mut T,
        listener: &mut Lst,
    ) -> Option<ScheduleWindow>
    where
        G: ToneGenerator<Sound = Src::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: TrackListener,
    {
        let RunState::Running { chain, advance } = &mut self.state else {
            return None;
        };
        *advance = None;
        let tick_sec = self.params.tick_sec;
        let window = chain.next_window(tick_sec);

        let phases = &mut self.phases;
        let hits = &mut self.hits;
        self.source.with_tracks(|tracks| {
            phases.resize(tracks.len(), 0.0);
            for (i, track) in tracks.iter().enumerate() {
                if check_track_period(track.period).is_err() {
                    log::warn!("[coordinator] track {} has unplayable period {}", i, track.period);
                    continue;
                }
                let start = phases[i];
                let end = start + tick_sec / track.period;
                hits.clear();
                onsets_in_span(&track.pattern, start, end, hits);
                for (step, offset) in hits.iter() {
                    let at = window.start + offset * track.period;
                    match tones.play_onset_at(&track.sound, at) {
                        Ok(()) => listener.on_trigger(i, *step, at),
                        Err(e) => log::warn!(
                            "[coordinator] track {} dropped onset {} at {:.3}: {}",
                            i,
                            step,
                            at,
                            e
                        ),
                    }
                }
                phases[i] = end.rem_euclid(1.0);
            }
        });

        let now = tones.now();
        *advance = Some(timer.after(
            wake_delay(window.end, now, self.params.margin_sec),
            Wake::Advance,
        ));
        listener.on_tick(&window, &self.phases);
        Some(window)
    }
}
