use std::thread;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rhythm_core::constants::{DEFAULT_BAR_MS, DEFAULT_TEMPO_BPM, MAX_TEMPO_BPM, MIN_TEMPO_BPM};
use rhythm_core::sim::TimerQueue;
use rhythm_core::{
    alignments, seconds_to_delay, AudioClock, BarGroove, ClockGroove,
    CoordinatorParams, LookAheadScheduler, LoopSource, PatternConfig, PatternLoop,
    PhaseCoordinator, Preset, RhythmPattern, RunState, ScheduleListener, ScheduleWindow,
    SchedulerParams, Track, TrackListener, TrackSource, Wake, PRESETS,
};

mod synth;

use synth::{Drum, NativeTones};

// Longest sleep between timer checks
const IDLE_POLL_SEC: f64 = 0.05;
// Extra time after the last window so the final hits can ring out
const RING_OUT_SEC: f64 = 0.5;

#[derive(Parser)]
#[command(about = "Play Euclidean rhythms and grooves on the default audio device")]
struct Args {
    /// How long to play before stopping
    #[arg(long, default_value_t = 16.0)]
    seconds: f64,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// One Euclidean pattern looped over a bar
    Euclid {
        /// Index into the preset table; overrides steps/pulses/offset
        #[arg(long)]
        preset: Option<usize>,
        #[arg(long, default_value_t = 8)]
        steps: i64,
        #[arg(long, default_value_t = 3)]
        pulses: i64,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        offset: i64,
        #[arg(long, default_value_t = DEFAULT_BAR_MS)]
        bar_ms: f64,
        #[arg(long, default_value = "kick")]
        sound: String,
    },
    /// Alternating kick/snare on the beat with an off-beat hat
    Clock {
        #[arg(long, default_value_t = DEFAULT_TEMPO_BPM)]
        bpm: f64,
    },
    /// A 4/4 bar with a four-bar variation
    Bar {
        #[arg(long, default_value_t = DEFAULT_TEMPO_BPM)]
        bpm: f64,
    },
    /// Several tracks, each given as `steps:pulses:offset:period_sec:sound`
    Poly {
        #[arg(required = true)]
        tracks: Vec<String>,
    },
    /// List the preset table
    Presets,
}

/// Wall-clock time since start, used by the coarse timer.
struct WallClock(Instant);

impl AudioClock for WallClock {
    fn now(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

type Timer = TimerQueue<WallClock>;

struct LogListener;

impl ScheduleListener for LogListener {
    fn on_trigger(&mut self, step_index: usize, at: f64) {
        log::debug!("[play] step {} at {:.3}", step_index, at);
    }

    fn on_window(&mut self, window: &ScheduleWindow) {
        log::info!(
            "[play] window {} at {:.3} ({:.3}s)",
            window.index,
            window.start,
            window.period()
        );
    }
}

impl TrackListener for LogListener {
    fn on_trigger(&mut self, track: usize, step_index: usize, at: f64) {
        log::debug!("[play] track {} step {} at {:.3}", track, step_index, at);
    }
}

/// Either engine, driven by the same timer loop.
trait Player {
    fn begin(&mut self, tones: &mut NativeTones, timer: &mut Timer);
    fn wake(&mut self, wake: Wake, tones: &mut NativeTones, timer: &mut Timer);
    fn halt(&mut self, now: f64, timer: &mut Timer);
    fn state(&self) -> &RunState<u64>;
}

impl<L: LoopSource<Sound = Drum>> Player for LookAheadScheduler<L, u64> {
    fn begin(&mut self, tones: &mut NativeTones, timer: &mut Timer) {
        self.start(tones, timer, &mut LogListener);
    }

    fn wake(&mut self, wake: Wake, tones: &mut NativeTones, timer: &mut Timer) {
        self.on_wake(wake, tones, timer, &mut LogListener);
    }

    fn halt(&mut self, now: f64, timer: &mut Timer) {
        self.stop(now, timer);
    }

    fn state(&self) -> &RunState<u64> {
        LookAheadScheduler::state(self)
    }
}

impl<S: TrackSource<Sound = Drum>> Player for PhaseCoordinator<S, u64> {
    fn begin(&mut self, tones: &mut NativeTones, timer: &mut Timer) {
        self.start(tones, timer, &mut LogListener);
    }

    fn wake(&mut self, wake: Wake, tones: &mut NativeTones, timer: &mut Timer) {
        self.on_wake(wake, tones, timer, &mut LogListener);
    }

    fn halt(&mut self, now: f64, timer: &mut Timer) {
        self.stop(now, timer);
    }

    fn state(&self) -> &RunState<u64> {
        PhaseCoordinator::state(self)
    }
}

fn drive(player: &mut impl Player, tones: &mut NativeTones, seconds: f64) {
    let mut timer = TimerQueue::new(WallClock(Instant::now()));
    player.begin(tones, &mut timer);
    let stop_at = timer.clock().now() + seconds;

    while player.state().is_running() {
        let now = timer.clock().now();
        while let Some((_, wake)) = timer.pop_due(now) {
            player.wake(wake, tones, &mut timer);
        }
        if now >= stop_at {
            player.halt(tones.now(), &mut timer);
            break;
        }
        let wait = timer
            .next_due()
            .map_or(IDLE_POLL_SEC, |due| (due - now).min(IDLE_POLL_SEC));
        thread::sleep(seconds_to_delay(wait));
    }

    if let RunState::Stopping { drain_until } = player.state() {
        let ring_out = drain_until + RING_OUT_SEC - tones.now();
        log::info!("[play] letting {} hits ring out", tones.active());
        thread::sleep(seconds_to_delay(ring_out));
    }
}

fn parse_track(spec: &str) -> anyhow::Result<Track<Drum>> {
    let parts: Vec<&str> = spec.split(':').collect();
    let [steps, pulses, offset, period, sound] = parts.as_slice() else {
        anyhow::bail!("track {:?} is not steps:pulses:offset:period_sec:sound", spec);
    };
    let config = PatternConfig::new(steps.parse()?, pulses.parse()?, offset.parse()?)?;
    let sound: Drum = sound.parse()?;
    Ok(Track::try_new(RhythmPattern::new(config), period.parse()?, sound)?)
}

fn check_tempo(bpm: f64) -> anyhow::Result<f64> {
    if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&bpm) {
        anyhow::bail!(
            "tempo {} bpm is outside {}..={}",
            bpm,
            MIN_TEMPO_BPM,
            MAX_TEMPO_BPM
        );
    }
    Ok(bpm)
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let mode = args.mode.unwrap_or(Mode::Euclid {
        preset: None,
        steps: 8,
        pulses: 3,
        offset: 1,
        bar_ms: DEFAULT_BAR_MS,
        sound: "kick".into(),
    });

    if let Mode::Presets = mode {
        for (i, p) in PRESETS.iter().enumerate() {
            println!(
                "{:>2}  ({}, {}, {:>2})  {}",
                i, p.pulse_count, p.step_count, p.offset, p.label
            );
        }
        return Ok(());
    }

    let mut tones = NativeTones::open()?;
    match mode {
        Mode::Euclid {
            preset,
            steps,
            pulses,
            offset,
            bar_ms,
            sound,
        } => {
            let config = match preset {
                Some(i) => {
                    let p = Preset::by_index(i)?;
                    log::info!("[play] preset {}", p.label);
                    p.config()
                }
                None => PatternConfig::clamped(steps, pulses, offset),
            };
            let pattern = RhythmPattern::new(config);
            log::info!(
                "[play] {}/{} offset {}: {:?}",
                config.pulse_count,
                config.step_count,
                config.offset,
                pattern.steps()
            );
            let source = PatternLoop::with_bar_ms(pattern, bar_ms, sound.parse::<Drum>()?);
            let mut scheduler: LookAheadScheduler<_, u64> =
                LookAheadScheduler::new(source, SchedulerParams::default());
            drive(&mut scheduler, &mut tones, args.seconds);
        }
        Mode::Clock { bpm } => {
            let mut groove = ClockGroove::new(Drum::Kick, Drum::Snare, Drum::Hat);
            groove.tempo_bpm = check_tempo(bpm)?;
            let mut scheduler: LookAheadScheduler<_, u64> =
                LookAheadScheduler::new(groove, SchedulerParams::default());
            drive(&mut scheduler, &mut tones, args.seconds);
        }
        Mode::Bar { bpm } => {
            let mut groove = BarGroove::new(Drum::Kick, Drum::Snare, Drum::Hat);
            groove.tempo_bpm = check_tempo(bpm)?;
            let mut scheduler: LookAheadScheduler<_, u64> =
                LookAheadScheduler::new(groove, SchedulerParams::default());
            drive(&mut scheduler, &mut tones, args.seconds);
        }
        Mode::Poly { tracks } => {
            let tracks = tracks
                .iter()
                .map(|t| parse_track(t))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let periods: Vec<f64> = tracks.iter().map(|t| t.period).collect();
            for a in alignments(&periods) {
                log::info!(
                    "[play] tracks {} and {} align every {:.3}s",
                    a.first,
                    a.second,
                    a.period
                );
            }
            let mut coordinator: PhaseCoordinator<_, u64> =
                PhaseCoordinator::new(tracks, CoordinatorParams::default());
            drive(&mut coordinator, &mut tones, args.seconds);
        }
        Mode::Presets => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_outside_range_is_rejected() {
        assert_eq!(check_tempo(120.0).unwrap(), 120.0);
        assert!(check_tempo(1.0e6).is_err());
        assert!(check_tempo(0.0).is_err());
        assert!(check_tempo(f64::NAN).is_err());
    }

    #[test]
    fn tracks_parse_from_colon_lists() {
        let track = parse_track("8:3:1:2:kick").unwrap();
        assert_eq!(track.sound, Drum::Kick);
        assert_eq!(track.pattern.pulse_count(), 3);
        assert!((track.period - 2.0).abs() < 1e-12);

        assert!(parse_track("8:3:1:0.01:kick").is_err());
        assert!(parse_track("8:3:kick").is_err());
    }
}
