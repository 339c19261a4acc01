//! # Timeline Module
//!
//! Turns beat-based licks into millisecond schedules.
//!
//! Offsets are computed from the running sum of beats, multiplied by the
//! beat length once per entry, so no per-note rounding can accumulate:
//! the last entry ends exactly at `total_beats * ms_per_beat`.

use std::time::Duration;

use crate::catalog::Lick;
use crate::error::ConfigError;
use crate::harp::Tab;

pub const BPM_MIN: f64 = 20.0;
pub const BPM_MAX: f64 = 400.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// A validated tempo in beats (quarter notes) per minute.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Bpm(f64);

impl Bpm {
    /// Rejects anything outside [`BPM_MIN`]..=[`BPM_MAX`]; values are never clamped.
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_finite() && (BPM_MIN..=BPM_MAX).contains(&value) {
            Ok(Bpm(value))
        } else {
            Err(ConfigError::BpmOutOfRange {
                value,
                min: BPM_MIN,
                max: BPM_MAX,
            })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn ms_per_beat(self) -> f64 {
        60_000.0 / self.0
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Bpm(DEFAULT_BPM)
    }
}

/// What an entry makes audible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sound {
    Note(Tab),
    Rest,
    Click { downbeat: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    /// Position of the event in its lick (or beat number in a response window)
    pub index: usize,
    pub sound: Sound,
    /// Offset from the timeline start in milliseconds
    pub start_ms: f64,
    /// How long the sample is held in milliseconds
    pub hold_ms: f64,
}

impl TimelineEntry {
    pub fn start(&self) -> Duration {
        span(self.start_ms)
    }

    pub fn hold(&self) -> Duration {
        span(self.hold_ms)
    }
}

/// Longest offset a timeline converts to; anything beyond saturates here.
pub const MAX_SPAN: Duration = Duration::from_secs(24 * 60 * 60);

/// Milliseconds to a [`Duration`], saturating at [`MAX_SPAN`]. Negative or
/// NaN input maps to zero.
pub fn span(ms: f64) -> Duration {
    match Duration::try_from_secs_f64(ms / 1000.0) {
        Ok(duration) => duration.min(MAX_SPAN),
        Err(_) if ms > 0.0 => MAX_SPAN,
        Err(_) => Duration::ZERO,
    }
}

/// A compiled, ready-to-schedule sequence. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub beats: f64,
    pub ms_per_beat: f64,
    pub total_ms: f64,
    pub beats_per_bar: u32,
    /// Id of the lick this was compiled from, `None` for response windows
    pub lick_id: Option<String>,
}

impl Timeline {
    pub fn total(&self) -> Duration {
        span(self.total_ms)
    }

    pub fn offsets_ms(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.start_ms).collect()
    }
}

/// Compiles a lick at a tempo.
pub fn compile_timeline(lick: &Lick, bpm: Bpm) -> Timeline {
    let ms_per_beat = bpm.ms_per_beat();
    let mut beats_before = 0.0;
    let entries = lick
        .notes
        .iter()
        .enumerate()
        .map(|(index, note)| {
            let entry = TimelineEntry {
                index,
                sound: note.tab.map_or(Sound::Rest, Sound::Note),
                start_ms: beats_before * ms_per_beat,
                hold_ms: note.duration * ms_per_beat,
            };
            beats_before += note.duration;
            entry
        })
        .collect();

    Timeline {
        entries,
        beats: beats_before,
        ms_per_beat,
        total_ms: beats_before * ms_per_beat,
        beats_per_bar: beats_per_bar(&lick.time_signature),
        lick_id: Some(lick.id.clone()),
    }
}

/// Compiles a metronome response window of `beats` length.
///
/// A click lands on every whole beat inside the window; the first beat of
/// each bar is accented. A fractional tail stays silent but still counts
/// towards the window length.
pub fn compile_response(beats: f64, bpm: Bpm, beats_per_bar: u32) -> Timeline {
    response_window(beats, bpm.ms_per_beat(), beats_per_bar)
}

/// The response window that answers a compiled lick: same beats, same beat length.
pub fn response_for(lick: &Timeline) -> Timeline {
    response_window(lick.beats, lick.ms_per_beat, lick.beats_per_bar)
}

fn response_window(beats: f64, ms_per_beat: f64, beats_per_bar: u32) -> Timeline {
    let bar = beats_per_bar.max(1) as usize;
    let entries = (0..)
        .map(|b| b as f64)
        .take_while(|b| *b < beats)
        .enumerate()
        .map(|(index, b)| TimelineEntry {
            index,
            sound: Sound::Click {
                downbeat: index % bar == 0,
            },
            start_ms: b * ms_per_beat,
            hold_ms: (beats - b).min(1.0) * ms_per_beat,
        })
        .collect();

    Timeline {
        entries,
        beats,
        ms_per_beat,
        total_ms: beats * ms_per_beat,
        beats_per_bar: bar as u32,
        lick_id: None,
    }
}

/// Numerator of a time signature such as "3/4"; 4 when it cannot be read.
pub fn beats_per_bar(time_signature: &str) -> u32 {
    time_signature
        .split('/')
        .next()
        .and_then(|n| n.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(4)
}
