//! # Audio Output Module
//!
//! Plays triggered samples through the default output device using CPAL
//! (Cross-Platform Audio Library).
//!
//! ## Design
//! - [`AudioEngine`] is an explicitly owned handle: creating it opens the
//!   stream, dropping it releases the device. There is no global engine.
//! - The output callback owns a [`Mixer`]; everything else talks to it over a
//!   channel, so the callback never blocks on a lock.
//! - The sequencer only sees the [`SampleSink`] trait, which keeps the
//!   scheduling core testable without an audio device.

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, SupportedStreamConfigRange};
use crossbeam_channel::{Receiver, Sender};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use crate::samples::Sample;

/// Preferred output sample rate; the device default is used if unsupported.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Fade applied to the tail of every held note.
const RELEASE_MS: f64 = 8.0;

/// Voices mixed at once. A new note beyond this replaces the voice closest
/// to its end, so the callback never grows the voice list.
pub const MAX_VOICES: usize = 16;

/// Frames rendered per pass; larger device buffers are filled in several passes.
const MAX_BLOCK_FRAMES: usize = 4096;

/// Something that can make samples audible.
pub trait SampleSink {
    /// Starts `sample` now, cut off after `hold`.
    fn trigger(&mut self, sample: Arc<Sample>, hold: Duration);
    /// Cuts every sounding voice.
    fn silence(&mut self);
}

/// A sink that discards everything. Used when no output device is available
/// so the rest of the trainer keeps working.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn trigger(&mut self, _sample: Arc<Sample>, _hold: Duration) {}
    fn silence(&mut self) {}
}

#[derive(Debug)]
pub enum MixerCommand {
    Play { sample: Arc<Sample>, hold: Duration },
    Silence,
}

#[derive(Debug)]
struct Voice {
    sample: Arc<Sample>,
    position: f64,
    step: f64,
    frames_left: usize,
    fade_frames: usize,
}

impl Voice {
    fn next_frame(&mut self) -> f32 {
        if self.frames_left == 0 {
            return 0.0;
        }
        let data = &self.sample.data;
        let index = self.position as usize;
        if index >= data.len() {
            self.frames_left = 0;
            return 0.0;
        }
        // Linear interpolation covers sample/device rate mismatches
        let current = data[index];
        let next = data.get(index + 1).copied().unwrap_or(0.0);
        let frac = (self.position - index as f64) as f32;
        let value = current + (next - current) * frac;

        let gain = if self.frames_left < self.fade_frames {
            self.frames_left as f32 / self.fade_frames as f32
        } else {
            1.0
        };
        self.position += self.step;
        self.frames_left -= 1;
        value * gain
    }
}

/// Sums the active voices into an interleaved output buffer.
#[derive(Debug)]
pub struct Mixer {
    output_rate: u32,
    commands: Receiver<MixerCommand>,
    voices: Vec<Voice>,
}

impl Mixer {
    pub fn new(output_rate: u32, commands: Receiver<MixerCommand>) -> Self {
        Self {
            output_rate,
            commands,
            voices: Vec::with_capacity(MAX_VOICES),
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn apply(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::Play { sample, hold } => {
                let rate = self.output_rate as f64;
                let frames_left = (hold.as_secs_f64() * rate).round() as usize;
                let fade_frames = ((RELEASE_MS / 1000.0 * rate) as usize).clamp(1, frames_left.max(1));
                let voice = Voice {
                    step: sample.sample_rate as f64 / rate,
                    sample,
                    position: 0.0,
                    frames_left,
                    fade_frames,
                };
                if self.voices.len() < MAX_VOICES {
                    self.voices.push(voice);
                } else if let Some(oldest) = self.voices.iter_mut().min_by_key(|v| v.frames_left) {
                    *oldest = voice;
                }
            }
            MixerCommand::Silence => self.voices.clear(),
        }
    }

    /// Fills `out` (interleaved, `channels` wide) with the next block of audio.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
        for frame in out.chunks_mut(channels.max(1)) {
            let mixed: f32 = self.voices.iter_mut().map(Voice::next_frame).sum();
            frame.fill(mixed.clamp(-1.0, 1.0));
        }
        self.voices.retain(|v| v.frames_left > 0);
    }
}

/// Owned handle to the output stream. Dropping it stops playback.
pub struct AudioEngine {
    stream: cpal::Stream,
    sample_rate: u32,
    commands: Sender<MixerCommand>,
}

impl AudioEngine {
    /// Opens the default output device and starts an idle stream.
    ///
    /// # Returns
    /// * `Ok(engine)` - running engine, silent until triggered
    /// * `Err(e)` - no device, no usable configuration, or the stream failed to start
    pub fn start() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;

        info!("Using audio output device: {}", device.name()?);

        let preferred = device
            .supported_output_configs()
            .ok()
            .and_then(|configs| find_supported_config(configs.collect(), TARGET_SAMPLE_RATE));
        let supported = match preferred {
            Some(config) => config,
            None => device
                .default_output_config()
                .context("querying the default output configuration")?,
        };

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        info!(
            "Selected output: {} Hz, {} channels, {:?}",
            sample_rate, config.channels, sample_format
        );

        let (commands, receiver) = crossbeam_channel::unbounded();
        let mixer = Mixer::new(sample_rate, receiver);
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
            other => bail!("Unsupported output sample format {other:?}"),
        };
        stream.play().context("starting the output stream")?;

        Ok(Self {
            stream,
            sample_rate,
            commands,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl SampleSink for AudioEngine {
    fn trigger(&mut self, sample: Arc<Sample>, hold: Duration) {
        // The receiver lives as long as the stream, which we own
        let _ = self.commands.send(MixerCommand::Play { sample, hold });
    }

    fn silence(&mut self) {
        let _ = self.commands.send(MixerCommand::Silence);
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            error!("Error pausing output stream: {}", e);
        }
        info!("Audio output released");
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = (config.channels as usize).max(1);
    // Sized once here; the callback only ever borrows slices of it
    let mut scratch = vec![0.0_f32; MAX_BLOCK_FRAMES * channels];
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for block in data.chunks_mut(scratch.len()) {
                let mixed = &mut scratch[..block.len()];
                mixer.render(mixed, channels);
                for (out, value) in block.iter_mut().zip(mixed.iter()) {
                    *out = T::from_sample(*value);
                }
            }
        },
        |err| error!("An error occurred on the output stream: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Picks a 32-bit float configuration that supports the target rate, preferring stereo.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<cpal::SupportedStreamConfig> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| (c.channels() as i32 - 2).abs())
        .map(|c| c.with_sample_rate(cpal::SampleRate(target_rate)))
}
