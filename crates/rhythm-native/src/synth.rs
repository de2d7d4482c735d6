//! Percussion synth rendered on the cpal callback thread.
//!
//! The mixer counts every frame it renders; that count divided by the sample
//! rate is the audio clock the scheduler plans against, so an onset handed
//! over for time `t` starts on frame `round(t * sample_rate)`.

use std::f32::consts::TAU;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rhythm_core::{AudioClock, ToneError, ToneGenerator};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Drum {
    Kick,
    Snare,
    Hat,
    Clap,
}

impl Drum {
    /// Same levels as the sampled kit of the web pages.
    pub fn gain(self) -> f32 {
        match self {
            Drum::Kick => 0.8,
            Drum::Snare => 0.4,
            Drum::Hat => 0.2,
            Drum::Clap => 0.5,
        }
    }

    fn length_sec(self) -> f32 {
        match self {
            Drum::Kick => 0.35,
            Drum::Snare => 0.2,
            Drum::Hat => 0.06,
            Drum::Clap => 0.3,
        }
    }
}

impl FromStr for Drum {
    type Err = ToneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kick" => Ok(Drum::Kick),
            "snare" => Ok(Drum::Snare),
            "hat" => Ok(Drum::Hat),
            "clap" => Ok(Drum::Clap),
            other => Err(ToneError::UnknownSound(other.to_string())),
        }
    }
}

struct Hit {
    drum: Drum,
    start_frame: u64,
    phase: f32, // radians, kick only
    noise: u32, // xorshift32 state
}

impl Hit {
    /// Sample `age` seconds after the start, or `None` once the hit is over.
    fn sample(&mut self, age: f32, sample_rate: f32) -> Option<f32> {
        if age >= self.drum.length_sec() {
            return None;
        }
        let v = match self.drum {
            Drum::Kick => {
                // pitch sweeps from 150 Hz down to 50 Hz
                let freq = 50.0 + 100.0 * (-age * 30.0).exp();
                self.phase += TAU * freq / sample_rate;
                if self.phase > TAU {
                    self.phase -= TAU;
                }
                self.phase.sin() * (-age * 8.0).exp()
            }
            Drum::Snare => {
                0.6 * self.noise() * (-age * 20.0).exp()
                    + 0.4 * (TAU * 180.0 * age).sin() * (-age * 25.0).exp()
            }
            Drum::Hat => self.noise() * (-age * 80.0).exp(),
            Drum::Clap => {
                // three short bursts, then a tail
                let env = if age < 0.03 {
                    (-(age % 0.01) * 300.0).exp()
                } else {
                    (-(age - 0.03) * 15.0).exp()
                };
                self.noise() * env
            }
        };
        Some(v * self.drum.gain())
    }

    fn noise(&mut self) -> f32 {
        let mut x = self.noise;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

pub struct Mixer {
    sample_rate: f32,
    frames: u64,
    hits: Vec<Hit>,
    seed: u32,
}

impl Mixer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
            hits: Vec::new(),
            seed: 0x1234_ABCD,
        }
    }

    /// Seconds rendered so far.
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Queue `drum` to start at audio time `at`. Late onsets start on the
    /// next rendered frame.
    pub fn schedule(&mut self, drum: Drum, at: f64) {
        let start_frame = ((at * self.sample_rate as f64).round().max(0.0) as u64).max(self.frames);
        self.seed = self.seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223) | 1;
        self.hits.push(Hit {
            drum,
            start_frame,
            phase: 0.0,
            noise: self.seed,
        });
    }

    /// Hits queued or still sounding.
    pub fn active(&self) -> usize {
        self.hits.len()
    }

    pub fn next_frame(&mut self) -> f32 {
        let frame = self.frames;
        let mut out = 0.0f32;
        let mut i = 0usize;
        while i < self.hits.len() {
            let hit = &mut self.hits[i];
            if frame < hit.start_frame {
                i += 1;
                continue;
            }
            let age = (frame - hit.start_frame) as f32 / self.sample_rate;
            match hit.sample(age, self.sample_rate) {
                Some(v) => {
                    out += v;
                    i += 1;
                }
                None => {
                    self.hits.swap_remove(i);
                }
            }
        }
        self.frames += 1;
        out.tanh()
    }

    fn process<T>(&mut self, output: &mut [T], channels: usize)
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        for frame in output.chunks_mut(channels) {
            let v = self.next_frame();
            for sample in frame.iter_mut() {
                *sample = T::from_sample(v);
            }
        }
    }
}

/// Default output device driven by a [`Mixer`].
pub struct NativeTones {
    mixer: Arc<Mutex<Mixer>>,
    _stream: cpal::Stream,
}

impl NativeTones {
    pub fn open() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no output device"))?;
        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate as f32)));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config.into(), mixer.clone(), channels)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config.into(), mixer.clone(), channels)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config.into(), mixer.clone(), channels)
            }
            other => anyhow::bail!("unsupported sample format {:?}", other),
        }?;
        stream.play()?;
        log::info!("[audio] output at {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            mixer,
            _stream: stream,
        })
    }

    pub fn active(&self) -> usize {
        self.mixer.lock().map(|m| m.active()).unwrap_or(0)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
    channels: usize,
) -> anyhow::Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| match mixer.lock() {
            Ok(mut mixer) => mixer.process(data, channels),
            Err(_) => data.fill(T::from_sample(0.0f32)),
        },
        |err| log::error!("[audio] stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl AudioClock for NativeTones {
    fn now(&self) -> f64 {
        self.mixer.lock().map(|m| m.now()).unwrap_or(0.0)
    }
}

impl ToneGenerator for NativeTones {
    type Sound = Drum;

    fn play_onset_at(&mut self, sound: &Drum, at: f64) -> Result<(), ToneError> {
        let mut mixer = self
            .mixer
            .lock()
            .map_err(|_| ToneError::Backend("mixer lock poisoned".into()))?;
        mixer.schedule(*sound, at);
        Ok(())
    }
}
