//! Look-ahead scheduler for a single loop.
//!
//! Planning and sounding run on different clocks. A single coarse timer wakes
//! the scheduler shortly before each window starts; on that wake every onset
//! of the window is handed to the tone generator at once as an absolute
//! audio-clock timestamp. Timer jitter therefore moves only the planning
//! moment. Window starts are chained from the previous window's end, so
//! tempo stays locked to the audio clock over arbitrarily long runs.
//!
//! Typical usage:
//! - Construct with `LookAheadScheduler::new(source, params)`
//! - Call `start(..)` once, then route every fired [`Wake`] to `on_wake(..)`
//! - Call `stop(..)` to cancel the pending timers

use std::collections::VecDeque;

use crate::clock::{
    is_valid_period, seconds_to_delay, wake_delay, CoarseTimer, RunState, ScheduleWindow,
    ToneGenerator, Wake, WindowChain,
};
use crate::constants::{DEFAULT_LEAD_IN_SEC, PHASE_TICKS_PER_WINDOW, SCHEDULE_MARGIN_SEC};
use crate::groove::{LoopSource, Onset};

/// Tuning for the look-ahead scheduler.
///
/// - `margin_sec`: how far ahead of a window's start the planning wake is set
/// - `lead_in_sec`: gap between `start()` and the first window
/// - `phase_ticks`: number of cosmetic phase updates per window
#[derive(Clone, Debug)]
pub struct SchedulerParams {
    pub margin_sec: f64,
    pub lead_in_sec: f64,
    pub phase_ticks: usize,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            margin_sec: SCHEDULE_MARGIN_SEC,
            lead_in_sec: DEFAULT_LEAD_IN_SEC,
            phase_ticks: PHASE_TICKS_PER_WINDOW,
        }
    }
}

/// Receives what the scheduler planned. All methods default to no-ops.
pub trait ScheduleListener {
    /// An onset was accepted by the tone generator.
    fn on_trigger(&mut self, _step_index: usize, _at: f64) {}
    /// Cosmetic playhead position within the current window.
    fn on_phase(&mut self, _fraction: f64) {}
    /// A window was planned.
    fn on_window(&mut self, _window: &ScheduleWindow) {}
}

impl ScheduleListener for () {}

pub struct LookAheadScheduler<L: LoopSource, Tok> {
    source: L,
    params: SchedulerParams,
    state: RunState<Tok>,
    // phase timers in flight, keyed by the audio time they represent
    phase_timers: VecDeque<(f64, Tok)>,
    scratch: Vec<Onset<L::Sound>>,
}

impl<L: LoopSource, Tok> LookAheadScheduler<L, Tok> {
    pub fn new(source: L, params: SchedulerParams) -> Self {
        Self {
            source,
            params,
            state: RunState::Idle,
            phase_timers: VecDeque::new(),
            scratch: Vec::new(),
        }
    }

    pub fn source(&self) -> &L {
        &self.source
    }

    /// Mutable access to the loop; changes apply from the next window.
    pub fn source_mut(&mut self) -> &mut L {
        &mut self.source
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn state(&self) -> &RunState<Tok> {
        &self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Start of the next window that will be planned, while running.
    pub fn next_window_start(&self) -> Option<f64> {
        match &self.state {
            RunState::Running { chain, .. } => Some(chain.next_start()),
            _ => None,
        }
    }

    /// Begin playback; the first window starts `lead_in_sec` after `now` and
    /// is planned immediately.
    pub fn start<G, T, Lst>(&mut self, tones: &mut G, timer: &mut T, listener: &mut Lst)
    where
        G: ToneGenerator<Sound = L::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: ScheduleListener,
    {
        self.state.settle(tones.now());
        if self.state.is_running() {
            log::warn!("[scheduler] start ignored; already running");
            return;
        }
        let t0 = tones.now() + self.params.lead_in_sec;
        log::info!("[scheduler] start at {:.3}", t0);
        self.state = RunState::Running {
            chain: WindowChain::starting_at(t0),
            advance: None,
        };
        self.advance(tones, timer, listener);
    }

    /// Entry point for every fired timer.
    pub fn on_wake<G, T, Lst>(
        &mut self,
        wake: Wake,
        tones: &mut G,
        timer: &mut T,
        listener: &mut Lst,
    ) -> Option<ScheduleWindow>
    where
        G: ToneGenerator<Sound = L::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: ScheduleListener,
    {
        self.state.settle(tones.now());
        if !self.state.is_running() {
            log::debug!("[scheduler] stale {:?} while {}", wake, self.state.label());
            return None;
        }
        match wake {
            Wake::Advance => self.advance(tones, timer, listener),
            Wake::Phase(fraction) => {
                listener.on_phase(fraction);
                None
            }
        }
    }

    /// Cancel pending timers. Onsets already handed to the tone generator
    /// are not recalled and play out; the state reads `Stopping` until the
    /// last planned window has elapsed.
    pub fn stop<T>(&mut self, now: f64, timer: &mut T)
    where
        T: CoarseTimer<Token = Tok>,
    {
        for (_, token) in self.phase_timers.drain(..) {
            timer.cancel(token);
        }
        let state = std::mem::replace(&mut self.state, RunState::Idle);
        if let RunState::Running { chain, advance } = state {
            if let Some(token) = advance {
                timer.cancel(token);
            }
            log::info!("[scheduler] stop; draining until {:.3}", chain.next_start());
            self.state = RunState::Stopping {
                drain_until: chain.next_start(),
            };
            self.state.settle(now);
        }
    }

    fn advance<G, T, Lst>(
        &mut self,
        tones: &mut G,
        timer: &mut T,
        listener: &mut Lst,
    ) -> Option<ScheduleWindow>
    where
        G: ToneGenerator<Sound = L::Sound>,
        T: CoarseTimer<Token = Tok>,
        Lst: ScheduleListener,
    {
        let RunState::Running { chain, advance } = &mut self.state else {
            return None;
        };
        // the wake that led here consumed the pending token
        *advance = None;

        let period = self.source.period();
        if !is_valid_period(period) {
            log::warn!("[scheduler] invalid period {}; stopping", period);
            for (_, token) in self.phase_timers.drain(..) {
                timer.cancel(token);
            }
            self.state = RunState::Idle;
            return None;
        }

        let window = chain.next_window(period);
        self.scratch.clear();
        self.source.onsets(window.index, &mut self.scratch);
        for onset in &self.scratch {
            let at = window.time_at(onset.position);
            match tones.play_onset_at(&onset.sound, at) {
                Ok(()) => listener.on_trigger(onset.index, at),
                Err(e) => log::warn!("[scheduler] dropped onset {} at {:.3}: {}", onset.index, at, e),
            }
        }

        let now = tones.now();
        while matches!(self.phase_timers.front(), Some((due, _)) if *due < now) {
            self.phase_timers.pop_front();
        }
        let ticks = self.params.phase_ticks;
        for i in 0..ticks {
            let fraction = i as f64 / ticks as f64;
            let due = window.time_at(fraction);
            let token = timer.after(seconds_to_delay(due - now), Wake::Phase(fraction));
            self.phase_timers.push_back((due, token));
        }

        *advance = Some(timer.after(
            wake_delay(window.end, now, self.params.margin_sec),
            Wake::Advance,
        ));
        log::debug!(
            "[scheduler] window {} {:.3}..{:.3} ({} onsets)",
            window.index,
            window.start,
            window.end,
            self.scratch.len()
        );
        listener.on_window(&window);
        Some(window)
    }
}
