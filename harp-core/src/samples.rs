//! # Sample Set Module
//!
//! Holds one mono sample per (harp key, tab) plus the metronome clicks.
//! A set is built once, wrapped in an `Arc` and only read afterwards.
//!
//! Samples come either from recorded WAV files laid out as
//! `<dir>/<KEY>_harp/<tab>.wav` (e.g. `G_harp/-3_p.wav`) or from an additive
//! synthesis fallback when no recordings are installed.

use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::harp::{HarpKey, Tab, note_for};

/// Length of a synthesized note.
const SYNTH_DURATION_MS: f32 = 2000.0;
const SYNTH_ATTACK_MS: f32 = 15.0;
const SYNTH_RELEASE_MS: f32 = 100.0;
const SYNTH_HARMONICS: u32 = 8;
/// Peak level after normalisation, leaves headroom for overlapping voices.
const SYNTH_PEAK: f32 = 0.8;

/// Length of a metronome click.
const CLICK_DURATION_S: f32 = 0.06;

/// A decoded mono sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub data: Vec<f32>,
    pub sample_rate: u32,
}

impl Sample {
    pub fn duration_ms(&self) -> f64 {
        self.data.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

#[derive(Debug, Clone)]
pub struct SampleSet {
    notes: HashMap<(HarpKey, Tab), Arc<Sample>>,
    click_accent: Arc<Sample>,
    click: Arc<Sample>,
}

impl SampleSet {
    /// A set with clicks but no note samples.
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            notes: HashMap::new(),
            click_accent: Arc::new(generate_click(true, sample_rate)),
            click: Arc::new(generate_click(false, sample_rate)),
        }
    }

    /// Loads recorded samples for `keys`. Missing files leave gaps; unreadable
    /// files are logged and skipped.
    pub fn load_dir(dir: &Path, keys: &[HarpKey], sample_rate: u32) -> Self {
        let mut set = Self::empty(sample_rate);
        for &key in keys {
            let key_dir = dir.join(key.sample_dir_name());
            if !key_dir.is_dir() {
                warn!("No sample directory for {} harp at {}", key, key_dir.display());
                continue;
            }
            for tab in Tab::all() {
                let path = key_dir.join(format!("{}.wav", tab.file_stem()));
                if !path.exists() {
                    continue;
                }
                match read_wav(&path) {
                    Ok(sample) => set.insert(key, tab, sample),
                    Err(e) => warn!("Skipping sample {}: {:#}", path.display(), e),
                }
            }
        }
        info!("Loaded {} recorded samples from {}", set.len(), dir.display());
        set
    }

    /// Generates a tone for every tab on every requested key.
    pub fn synthesize(keys: &[HarpKey], sample_rate: u32) -> Self {
        let mut set = Self::empty(sample_rate);
        for &key in keys {
            for tab in Tab::all() {
                if let Some(note) = note_for(key, tab) {
                    set.insert(key, tab, generate_harmonica_tone(note.frequency, sample_rate));
                }
            }
        }
        info!("Synthesized {} samples at {} Hz", set.len(), sample_rate);
        set
    }

    pub fn insert(&mut self, key: HarpKey, tab: Tab, sample: Sample) {
        self.notes.insert((key, tab), Arc::new(sample));
    }

    pub fn get(&self, key: HarpKey, tab: Tab) -> Option<Arc<Sample>> {
        self.notes.get(&(key, tab)).cloned()
    }

    pub fn click(&self, downbeat: bool) -> Arc<Sample> {
        if downbeat {
            Arc::clone(&self.click_accent)
        } else {
            Arc::clone(&self.click)
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Reads a WAV file and folds it down to mono f32.
pub fn read_wav(path: &Path) -> Result<Sample> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("decoding float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("decoding integer samples")?
        }
    };

    let data = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(Sample {
        data,
        sample_rate: spec.sample_rate,
    })
}

/// Builds a harmonica-like tone from a fundamental and falling harmonics.
///
/// Each harmonic `n` is attenuated by 6 dB per octave above the fundamental.
/// The result gets a linear attack and release and is normalised.
pub fn generate_harmonica_tone(frequency: f32, sample_rate: u32) -> Sample {
    let rate = sample_rate as f32;
    let n_samples = (SYNTH_DURATION_MS / 1000.0 * rate) as usize;
    let attack = (SYNTH_ATTACK_MS / 1000.0 * rate) as usize;
    let release = (SYNTH_RELEASE_MS / 1000.0 * rate) as usize;
    let nyquist = rate / 2.0;

    let partials: Vec<(f32, f32)> = (1..=SYNTH_HARMONICS)
        .map(|n| {
            let gain_db = -6.0 * (n as f32).log2();
            (frequency * n as f32, 10.0_f32.powf(gain_db / 20.0))
        })
        .filter(|(f, _)| *f < nyquist)
        .collect();

    let mut data: Vec<f32> = (0..n_samples)
        .map(|i| {
            let t = i as f32 / rate;
            partials
                .iter()
                .map(|(f, gain)| gain * (2.0 * std::f32::consts::PI * f * t).sin())
                .sum::<f32>()
        })
        .collect();

    for (i, sample) in data.iter_mut().enumerate() {
        let fade_in = if attack > 0 { (i as f32 / attack as f32).min(1.0) } else { 1.0 };
        let remaining = n_samples - i;
        let fade_out = if release > 0 { (remaining as f32 / release as f32).min(1.0) } else { 1.0 };
        *sample *= fade_in * fade_out;
    }

    let peak = data.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for sample in data.iter_mut() {
            *sample *= SYNTH_PEAK / peak;
        }
    }

    Sample { data, sample_rate }
}

/// Generates a short decaying square-wave click, higher pitched on the downbeat.
pub fn generate_click(downbeat: bool, sample_rate: u32) -> Sample {
    let rate = sample_rate as f32;
    let n_samples = (CLICK_DURATION_S * rate) as usize;
    let freq = if downbeat { 1000.0 } else { 700.0 };
    let tau = 0.010_f32;

    let data = (0..n_samples)
        .map(|n| {
            let t = n as f32 / rate;
            let square = (2.0 * std::f32::consts::PI * freq * t).sin().signum();
            let envelope = (-t / tau).exp();
            // Short ramp so the click itself does not pop
            let ramp = (t / 0.002).clamp(0.0, 1.0);
            square * 0.8 * envelope * ramp
        })
        .collect();

    Sample { data, sample_rate }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_tone_shape() {
        let tone = generate_harmonica_tone(440.0, 8_000);
        assert_eq!(tone.data.len(), 16_000);
        assert_eq!(tone.data[0], 0.0);
        let peak = tone.data.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - SYNTH_PEAK).abs() < 1e-4);
        assert!(tone.data.last().unwrap().abs() < 0.01);
    }

    #[test]
    fn test_synthesize_covers_every_tab() {
        let set = SampleSet::synthesize(&[HarpKey::C], 4_000);
        assert_eq!(set.len(), Tab::all().count());
        assert!(set.get(HarpKey::C, Tab::parse("-3_ppp").unwrap()).is_some());
        assert!(set.get(HarpKey::G, Tab::parse("4").unwrap()).is_none());
    }

    #[test]
    fn test_clicks() {
        let set = SampleSet::empty(44_100);
        let accent = set.click(true);
        let plain = set.click(false);
        assert!((2_645..=2_646).contains(&accent.data.len()));
        assert_ne!(accent.data, plain.data);
        assert!(accent.data.iter().all(|s| s.abs() <= 0.8));
    }

    #[test]
    fn test_wav_round_trip_and_missing_files() {
        let dir = std::env::temp_dir().join(format!("harp-samples-{}", std::process::id()));
        let key_dir = dir.join("G_harp");
        std::fs::create_dir_all(&key_dir).unwrap();

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(key_dir.join("-2.wav"), spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16_384_i16).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();
        std::fs::write(key_dir.join("4.wav"), b"not a wav file").unwrap();

        let set = SampleSet::load_dir(&dir, &[HarpKey::G, HarpKey::A], 44_100);
        assert_eq!(set.len(), 1);
        let sample = set.get(HarpKey::G, Tab::parse("-2").unwrap()).unwrap();
        assert_eq!(sample.sample_rate, 22_050);
        assert_eq!(sample.data.len(), 100);
        assert!((sample.data[0] - 0.25).abs() < 1e-6);
        assert!(set.get(HarpKey::G, Tab::parse("4").unwrap()).is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
