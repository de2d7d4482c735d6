// Tests for the multi-track phase coordinator and the alignment math.

use std::cell::RefCell;
use std::rc::Rc;

use rhythm_core::sim::{ManualClock, RecordingTones, TimerQueue};
use rhythm_core::*;

#[derive(Default)]
struct Recorder {
    triggers: Vec<(usize, usize, f64)>,
    ticks: Vec<(ScheduleWindow, Vec<f64>)>,
}

impl TrackListener for Recorder {
    fn on_trigger(&mut self, track: usize, step_index: usize, at: f64) {
        self.triggers.push((track, step_index, at));
    }
    fn on_tick(&mut self, window: &ScheduleWindow, phases: &[f64]) {
        self.ticks.push((*window, phases.to_vec()));
    }
}

type Coord<S> = PhaseCoordinator<S, u64>;

struct Rig {
    clock: ManualClock,
    tones: RecordingTones<&'static str>,
    timer: TimerQueue<ManualClock>,
    rec: Recorder,
}

impl Rig {
    fn new() -> Self {
        let clock = ManualClock::new(0.0);
        Self {
            tones: RecordingTones::new(clock.clone()),
            timer: TimerQueue::new(clock.clone()),
            clock,
            rec: Recorder::default(),
        }
    }

    /// Fire the next `n` wakes, each `lateness` seconds late.
    fn fire<S>(&mut self, coord: &mut Coord<S>, n: usize, lateness: f64)
    where
        S: TrackSource<Sound = &'static str>,
    {
        for _ in 0..n {
            let (due, wake) = self.timer.pop_due(f64::MAX).expect("a pending tick");
            self.clock.set(self.clock.now().max(due + lateness));
            coord.on_wake(wake, &mut self.tones, &mut self.timer, &mut self.rec);
        }
    }
}

fn pattern(steps: usize, pulses: usize, offset: i64) -> RhythmPattern {
    RhythmPattern::try_new(steps, pulses, offset).unwrap()
}

fn params(tick_sec: f64) -> CoordinatorParams {
    CoordinatorParams {
        tick_sec,
        ..CoordinatorParams::default()
    }
}

#[test]
fn phase_wraps_after_one_full_cycle() {
    let mut rig = Rig::new();
    let tracks = vec![Track::new(pattern(4, 1, 0), 2.0, "kick")];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.5));

    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    rig.fire(&mut coord, 3, 0.0);
    assert_eq!(rig.rec.ticks.len(), 4);
    assert_eq!(coord.phases(), &[0.0]);

    rig.fire(&mut coord, 1, 0.0);
    assert!((coord.phases()[0] - 0.25).abs() < 1e-12);
}

#[test]
fn onsets_land_at_exact_audio_times() {
    let mut rig = Rig::new();
    // onsets at 0 and 1/2 of a 2s cycle
    let tracks = vec![Track::new(pattern(4, 2, 1), 2.0, "kick")];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.3));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    rig.fire(&mut coord, 20, 0.004);

    let t0 = rig.rec.ticks[0].0.start;
    let times = rig.tones.times();
    assert!(times.len() >= 3);
    assert_eq!(rig.rec.triggers.len(), times.len());
    assert!(rig.rec.triggers.iter().all(|(track, _, _)| *track == 0));
    for (k, t) in times.iter().enumerate() {
        let expected = t0 + k as f64 * 1.0;
        assert!((t - expected).abs() < 1e-9, "onset {k} at {t}, expected {expected}");
    }
}

#[test]
fn each_onset_plays_once_across_tick_boundaries() {
    let mut rig = Rig::new();
    // a quarter of a cycle per tick; ticks split the 1/6 grid mid-step
    let tracks = vec![Track::new(pattern(6, 6, 0), 0.2, "hat")];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.05));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    // 31 ticks cover phase [0, 7.75): steps 0..=46
    rig.fire(&mut coord, 30, 0.0);

    let times = rig.tones.times();
    assert_eq!(times.len(), 47);
    for pair in times.windows(2) {
        assert!(pair[1] > pair[0]);
        assert!((pair[1] - pair[0] - 0.2 / 6.0).abs() < 1e-9);
    }
}

#[test]
fn tick_longer_than_period_plays_several_cycles() {
    let mut rig = Rig::new();
    let tracks = vec![Track::new(pattern(2, 1, 1), 0.2, "clap")];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.5));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);

    // phase 0..2.5: onsets at cycles 0, 1, 2
    let start = rig.rec.ticks[0].0.start;
    let times = rig.tones.times();
    assert_eq!(times.len(), 3);
    for (k, t) in times.iter().enumerate() {
        assert!((t - (start + k as f64 * 0.2)).abs() < 1e-9);
    }
    assert!((coord.phases()[0] - 0.5).abs() < 1e-9);
}

#[test]
fn tracks_keep_independent_phases() {
    let mut rig = Rig::new();
    let tracks = vec![
        Track::new(pattern(3, 3, 0), 2.0, "kick"),
        Track::new(pattern(2, 2, 0), 3.0, "snare"),
    ];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.5));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    rig.fire(&mut coord, 12, 0.002);

    // 13 ticks == 6.5 seconds: one common cycle plus a quarter kick cycle
    assert!((coord.phases()[0] - 0.25).abs() < 1e-9);
    assert!((coord.phases()[1] - 1.0 / 6.0).abs() < 1e-9);
    assert_eq!(rig.tones.times_of(&"kick").len(), 10);
    assert_eq!(rig.tones.times_of(&"snare").len(), 5);

    let snapshot = coord.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].track, 1);
    assert!((snapshot[1].period - 3.0).abs() < 1e-12);
}

#[test]
fn restart_zeroes_phases_and_reschedules() {
    let mut rig = Rig::new();
    let tracks = vec![Track::new(pattern(4, 1, 0), 2.0, "kick")];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.5));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    rig.fire(&mut coord, 2, 0.0);
    assert!(coord.phases()[0] > 0.0);

    coord.restart(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    assert_eq!(rig.timer.pending(), 1, "old tick cancelled, one new tick pending");
    let last = rig.rec.ticks.last().unwrap();
    assert_eq!(last.0.index, 0);
    assert!((last.0.start - (rig.clock.now() + 0.25)).abs() < 1e-12);
    // the restart tick itself advanced the phase by one slice
    assert!((coord.phases()[0] - 0.25).abs() < 1e-12);
}

#[test]
fn live_track_edits_apply_at_next_tick() {
    let mut rig = Rig::new();
    let live = Rc::new(RefCell::new(vec![Track::new(pattern(4, 1, 0), 2.0, "kick")]));
    let mut coord: Coord<_> = PhaseCoordinator::new(live.clone(), params(0.5));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);

    live.borrow_mut()
        .push(Track::new(pattern(1, 1, 0), 1.0, "hat"));
    rig.fire(&mut coord, 1, 0.0);
    assert_eq!(coord.phases().len(), 2);
    // the new track starts from phase 0 and sounds immediately
    assert_eq!(rig.tones.times_of(&"hat").len(), 1);
    assert!((coord.phases()[1] - 0.5).abs() < 1e-12);
}

#[test]
fn removed_track_takes_its_phase_with_it() {
    let mut rig = Rig::new();
    let live = Rc::new(RefCell::new(vec![
        Track::new(pattern(4, 1, 0), 2.0, "kick"),
        Track::new(pattern(4, 1, 0), 4.0, "snare"),
    ]));
    let mut coord: Coord<_> = PhaseCoordinator::new(live.clone(), params(0.5));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    assert!((coord.phases()[0] - 0.25).abs() < 1e-12);
    assert!((coord.phases()[1] - 0.125).abs() < 1e-12);

    live.borrow_mut().remove(0);
    coord.remove_track(0);
    rig.fire(&mut coord, 1, 0.0);

    // the 4s track keeps advancing from its own phase
    assert_eq!(coord.phases().len(), 1);
    assert!((coord.phases()[0] - 0.25).abs() < 1e-12);

    // out of range is a no-op
    coord.remove_track(5);
    assert_eq!(coord.phases().len(), 1);
}

#[test]
fn unplayable_periods_are_skipped() {
    let mut rig = Rig::new();
    let tracks = vec![
        Track::new(pattern(4, 4, 0), 1.0e-9, "hat"),
        Track::new(pattern(4, 1, 0), 2.0, "kick"),
    ];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.5));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    rig.fire(&mut coord, 3, 0.0);

    assert!(rig.tones.times_of(&"hat").is_empty());
    assert_eq!(rig.tones.times_of(&"kick").len(), 1);
    assert_eq!(coord.phases()[0], 0.0);
}

#[test]
fn stop_cancels_pending_tick() {
    let mut rig = Rig::new();
    let tracks = vec![Track::new(pattern(4, 4, 0), 1.0, "hat")];
    let mut coord: Coord<_> = PhaseCoordinator::new(tracks, params(0.05));
    coord.start(&mut rig.tones, &mut rig.timer, &mut rig.rec);
    rig.fire(&mut coord, 5, 0.0);
    let played = rig.tones.played.len();

    coord.stop(rig.clock.now(), &mut rig.timer);
    assert_eq!(rig.timer.pending(), 0);
    assert!(!coord.is_running());
    let planned = coord.on_wake(Wake::Advance, &mut rig.tones, &mut rig.timer, &mut rig.rec);
    assert!(planned.is_none());
    assert_eq!(rig.tones.played.len(), played);
}

#[test]
fn lcm_of_periods() {
    assert!((lcm_periods(2.0, 3.0) - 6.0).abs() < 1e-12);
    assert!((lcm_periods(1.5, 2.0) - 6.0).abs() < 1e-12);
    assert!((lcm_periods(0.4, 0.6) - 1.2).abs() < 1e-12);
    assert_eq!(lcm_periods(2.0, 0.0), 0.0);
    assert_eq!(lcm_periods(0.0, 2.0), 0.0);
    assert_eq!(lcm_periods(f64::NAN, 2.0), 0.0);
}

#[test]
fn huge_periods_never_align_instead_of_overflowing() {
    assert_eq!(lcm_periods(1.0e9 + 0.001, 1.0e9 + 0.002), 0.0);
    assert_eq!(lcm_periods(1.0e300, 2.0), 0.0);
    assert_eq!(lcm_periods(f64::INFINITY, 2.0), 0.0);
    // large but representable still works
    assert!((lcm_periods(1000.0, 1500.0) - 3000.0).abs() < 1e-9);

    let pairs = alignments(&[1.0e9 + 0.001, 1.0e9 + 0.002, 2.0]);
    assert_eq!(pairs[0].period, 0.0);
}

#[test]
fn pairwise_alignments_cover_every_pair() {
    let pairs = alignments(&[2.0, 3.0, 4.0]);
    assert_eq!(pairs.len(), 3);
    assert_eq!((pairs[0].first, pairs[0].second), (0, 1));
    assert!((pairs[0].period - 6.0).abs() < 1e-12);
    assert_eq!((pairs[1].first, pairs[1].second), (0, 2));
    assert!((pairs[1].period - 4.0).abs() < 1e-12);
    assert_eq!((pairs[2].first, pairs[2].second), (1, 2));
    assert!((pairs[2].period - 12.0).abs() < 1e-12);

    let tracks = vec![
        Track::new(pattern(4, 1, 0), 2.0, "a"),
        Track::new(pattern(4, 1, 0), 0.0, "b"),
    ];
    let coord: Coord<_> = PhaseCoordinator::new(tracks, CoordinatorParams::default());
    assert_eq!(coord.alignments()[0].period, 0.0);
}

#[test]
fn span_includes_start_and_excludes_end() {
    let p = pattern(4, 4, 0);
    let mut hits = Vec::new();
    onsets_in_span(&p, 0.25, 0.75, &mut hits);
    assert_eq!(hits, vec![(1, 0.0), (2, 0.25)]);

    hits.clear();
    onsets_in_span(&p, 0.75, 1.25, &mut hits);
    assert_eq!(hits, vec![(3, 0.0), (0, 0.25)]);

    hits.clear();
    onsets_in_span(&p, 0.5, 0.5, &mut hits);
    assert!(hits.is_empty());
}

#[test]
fn track_periods_are_range_checked() {
    assert!(Track::try_new(pattern(4, 1, 0), 2.0, "kick").is_ok());
    assert_eq!(check_track_period(0.1), Err(ConfigError::Period(0.1)));
    assert_eq!(check_track_period(25.0), Err(ConfigError::Period(25.0)));
    assert!(check_track_period(f64::NAN).is_err());
    assert_eq!(check_track_period(20.0), Ok(20.0));
}

#[test]
fn queued_tick_events_can_touch_the_live_list() {
    let clock = ManualClock::new(0.0);
    let mut tones = RecordingTones::new(clock.clone());
    let mut timer = TimerQueue::new(clock.clone());
    let live = Rc::new(RefCell::new(vec![Track::new(pattern(4, 2, 1), 2.0, "kick")]));
    let mut coord: Coord<_> = PhaseCoordinator::new(live.clone(), params(0.5));
    let mut queue = EventQueue::new();
    coord.start(&mut tones, &mut timer, &mut queue);

    let events = queue.take();
    assert_eq!(events.len(), 2);
    match &events[0] {
        ListenerEvent::TrackTrigger { track, step, at } => {
            assert_eq!((*track, *step), (0, 0));
            assert!((at - 0.25).abs() < 1e-12);
        }
        other => panic!("expected a trigger, got {:?}", other),
    }
    match &events[1] {
        ListenerEvent::Tick { window, phases } => {
            assert_eq!(window.index, 0);
            assert_eq!(phases, &vec![0.25]);
        }
        other => panic!("expected a tick, got {:?}", other),
    }

    // handlers run after the tick, so they may edit the tracks it read
    for event in &events {
        if let ListenerEvent::TrackTrigger { track, .. } = event {
            live.borrow_mut()[*track].period = 4.0;
        }
    }
    next_tick(&mut coord, &mut tones, &mut timer, &clock, &mut queue);
    assert!((coord.phases()[0] - 0.375).abs() < 1e-12);
}

fn next_tick(
    coord: &mut Coord<Rc<RefCell<Vec<Track<&'static str>>>>>,
    tones: &mut RecordingTones<&'static str>,
    timer: &mut TimerQueue<ManualClock>,
    clock: &ManualClock,
    queue: &mut EventQueue,
) {
    let (due, wake) = timer.pop_due(f64::MAX).expect("a pending tick");
    clock.set(clock.now().max(due));
    coord.on_wake(wake, tones, timer, queue);
}
