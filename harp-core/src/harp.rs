//! # Harmonica Layout Module
//!
//! Describes the diatonic (Richter tuned) harmonica the trainer plays:
//! which keys exist, which tab references are valid, and which note each tab
//! sounds on a harp of a given key.
//!
//! ## Tab notation
//! - `4` - hole 4 blow
//! - `-4` - hole 4 draw
//! - `-3_p`, `-3_pp`, `-3_ppp` - hole 3 draw bent down one, two or three semitones
//!
//! The underscore form is file-safe and names the sample files. The display
//! form (`-3''`) is what the user sees when tabs are revealed.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::NoteEvent;
use crate::error::{CatalogError, ConfigError};

const SEMITONES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Blow-note offsets in semitones above the key root, holes 1-10.
const BLOW_OFFSETS: [i32; 10] = [0, 4, 7, 12, 16, 19, 24, 28, 31, 36];
/// Draw-note offsets in semitones above the key root, holes 1-10.
const DRAW_OFFSETS: [i32; 10] = [2, 7, 11, 14, 17, 21, 23, 26, 29, 33];
/// Deepest draw bend available on each hole.
const DRAW_BENDS: [u8; 10] = [1, 2, 3, 1, 0, 1, 0, 0, 0, 0];

/// The key a harmonica is tuned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HarpKey {
    C,
    Db,
    D,
    Eb,
    E,
    F,
    FSharp,
    G,
    Ab,
    A,
    Bb,
    B,
}

impl HarpKey {
    pub const ALL: [HarpKey; 12] = [
        HarpKey::C,
        HarpKey::Db,
        HarpKey::D,
        HarpKey::Eb,
        HarpKey::E,
        HarpKey::F,
        HarpKey::FSharp,
        HarpKey::G,
        HarpKey::Ab,
        HarpKey::A,
        HarpKey::Bb,
        HarpKey::B,
    ];

    /// Pitch class of the key root, C = 0.
    pub fn semitone(self) -> i32 {
        match self {
            HarpKey::C => 0,
            HarpKey::Db => 1,
            HarpKey::D => 2,
            HarpKey::Eb => 3,
            HarpKey::E => 4,
            HarpKey::F => 5,
            HarpKey::FSharp => 6,
            HarpKey::G => 7,
            HarpKey::Ab => 8,
            HarpKey::A => 9,
            HarpKey::Bb => 10,
            HarpKey::B => 11,
        }
    }

    /// Octave of hole 1 blow. G through B harps sit below middle C.
    pub fn start_octave(self) -> i32 {
        if self.semitone() >= HarpKey::G.semitone() { 3 } else { 4 }
    }

    /// Name used for the per-key sample directory, e.g. `G_harp`.
    pub fn sample_dir_name(self) -> String {
        format!("{}_harp", self)
    }
}

impl fmt::Display for HarpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarpKey::C => "C",
            HarpKey::Db => "Db",
            HarpKey::D => "D",
            HarpKey::Eb => "Eb",
            HarpKey::E => "E",
            HarpKey::F => "F",
            HarpKey::FSharp => "F#",
            HarpKey::G => "G",
            HarpKey::Ab => "Ab",
            HarpKey::A => "A",
            HarpKey::Bb => "Bb",
            HarpKey::B => "B",
        };
        f.write_str(name)
    }
}

impl FromStr for HarpKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next().map(|c| c.to_ascii_uppercase());
        let accidental: String = chars.collect();
        let key = match (letter, accidental.as_str()) {
            (Some('C'), "") => HarpKey::C,
            (Some('C'), "#") | (Some('D'), "b") => HarpKey::Db,
            (Some('D'), "") => HarpKey::D,
            (Some('D'), "#") | (Some('E'), "b") => HarpKey::Eb,
            (Some('E'), "") => HarpKey::E,
            (Some('F'), "") => HarpKey::F,
            (Some('F'), "#") | (Some('G'), "b") => HarpKey::FSharp,
            (Some('G'), "") => HarpKey::G,
            (Some('G'), "#") | (Some('A'), "b") => HarpKey::Ab,
            (Some('A'), "") => HarpKey::A,
            (Some('A'), "#") | (Some('B'), "b") => HarpKey::Bb,
            (Some('B'), "") => HarpKey::B,
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "key",
                    value: s.to_string(),
                });
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for HarpKey {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HarpKey> for String {
    fn from(key: HarpKey) -> Self {
        key.to_string()
    }
}

/// Whether air is blown into or drawn out of a hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Breath {
    Blow,
    Draw,
}

/// A single harmonica note reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tab {
    pub hole: u8,
    pub breath: Breath,
    /// Draw bend depth in semitones (0 = unbent).
    pub bend: u8,
}

/// Every valid tab on a Richter harp with its semitone offset above the key root.
static RICHTER_LAYOUT: Lazy<Vec<(Tab, i32)>> = Lazy::new(|| {
    let mut layout = Vec::with_capacity(32);
    for hole in 1..=10u8 {
        let i = (hole - 1) as usize;
        layout.push((Tab { hole, breath: Breath::Blow, bend: 0 }, BLOW_OFFSETS[i]));
        layout.push((Tab { hole, breath: Breath::Draw, bend: 0 }, DRAW_OFFSETS[i]));
        for bend in 1..=DRAW_BENDS[i] {
            layout.push((
                Tab { hole, breath: Breath::Draw, bend },
                DRAW_OFFSETS[i] - bend as i32,
            ));
        }
    }
    layout
});

impl Tab {
    /// Parses either the file-safe (`-3_pp`) or the display (`-3''`) form.
    pub fn parse(s: &str) -> Result<Tab, CatalogError> {
        let unknown = || CatalogError::UnknownTab(s.to_string());
        let trimmed = s.trim();

        let (breath, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (Breath::Draw, rest),
            None => (Breath::Blow, trimmed),
        };
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let hole: u8 = rest[..digits_end].parse().map_err(|_| unknown())?;
        let suffix = &rest[digits_end..];
        let marks = suffix.strip_prefix('_').unwrap_or(suffix);
        if !marks.chars().all(|c| c == 'p' || c == '\'') {
            return Err(unknown());
        }
        if suffix.starts_with('_') && marks.is_empty() {
            return Err(unknown());
        }

        let tab = Tab {
            hole,
            breath,
            bend: marks.len() as u8,
        };
        if tab.semitone_offset().is_some() {
            Ok(tab)
        } else {
            Err(unknown())
        }
    }

    /// All tabs of the Richter layout, low to high hole.
    pub fn all() -> impl Iterator<Item = Tab> {
        RICHTER_LAYOUT.iter().map(|(tab, _)| *tab)
    }

    /// Semitones above the key root, `None` if the tab is not on the harp.
    pub fn semitone_offset(&self) -> Option<i32> {
        RICHTER_LAYOUT
            .iter()
            .find(|(tab, _)| tab == self)
            .map(|(_, offset)| *offset)
    }

    /// File-safe form used for sample names, e.g. `-3_pp`.
    pub fn file_stem(&self) -> String {
        let mut s = self.base();
        if self.bend > 0 {
            s.push('_');
            s.push_str(&"p".repeat(self.bend as usize));
        }
        s
    }

    /// Form shown to the player, e.g. `-3''`.
    pub fn display(&self) -> String {
        let mut s = self.base();
        s.push_str(&"'".repeat(self.bend as usize));
        s
    }

    fn base(&self) -> String {
        match self.breath {
            Breath::Blow => self.hole.to_string(),
            Breath::Draw => format!("-{}", self.hole),
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// The concrete pitch a tab sounds on a harp of some key.
#[derive(Debug, Clone, PartialEq)]
pub struct HarpNote {
    /// Note name with octave, e.g. "B3"
    pub name: String,
    /// Frequency in Hz (equal temperament, A4 = 440 Hz)
    pub frequency: f32,
}

/// Finds the note a tab plays on a harp in `key`.
pub fn note_for(key: HarpKey, tab: Tab) -> Option<HarpNote> {
    let offset = tab.semitone_offset()?;
    let total = key.semitone() + offset;
    let octave = key.start_octave() + total.div_euclid(12);
    let index = total.rem_euclid(12);
    let name = format!("{}{}", SEMITONES[index as usize], octave);

    // Semitones away from A4 (index 9, octave 4)
    let from_a4 = (octave - 4) * 12 + index - 9;
    let frequency = 440.0 * 2.0_f32.powf(from_a4 as f32 / 12.0);

    Some(HarpNote { name, frequency })
}

/// Renders a note sequence as a single line of tablature.
pub fn format_tabs(notes: &[NoteEvent]) -> String {
    notes
        .iter()
        .map(|note| match note.tab {
            Some(tab) => tab.display(),
            None => "~".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_parse_file_safe_and_display_forms() {
        let bent = Tab::parse("-3_pp").unwrap();
        assert_eq!(bent, Tab { hole: 3, breath: Breath::Draw, bend: 2 });
        assert_eq!(Tab::parse("-3''").unwrap(), bent);
        assert_eq!(bent.display(), "-3''");
        assert_eq!(bent.file_stem(), "-3_pp");

        let blow = Tab::parse("10").unwrap();
        assert_eq!(blow, Tab { hole: 10, breath: Breath::Blow, bend: 0 });
        assert_eq!(blow.file_stem(), "10");
    }

    #[test]
    fn test_rejects_tabs_off_the_harp() {
        for bad in ["11", "0", "-5_p", "-1_pp", "4_p", "x", "-", "-2_", "-2_q", ""] {
            assert!(Tab::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_layout_size() {
        // 20 natural notes plus 1 + 2 + 3 + 1 + 1 draw bends
        assert_eq!(Tab::all().count(), 28);
    }

    #[test]
    fn test_notes_on_c_and_g_harps() {
        let c4 = note_for(HarpKey::C, Tab::parse("1").unwrap()).unwrap();
        assert_eq!(c4.name, "C4");
        assert_approx_eq!(c4.frequency, 261.6256, 0.01);

        // 2 draw is the fifth above the key root
        let d4 = note_for(HarpKey::G, Tab::parse("-2").unwrap()).unwrap();
        assert_eq!(d4.name, "D4");

        let bent = note_for(HarpKey::C, Tab::parse("-3_p").unwrap()).unwrap();
        assert_eq!(bent.name, "A#4");

        let top = note_for(HarpKey::A, Tab::parse("10").unwrap()).unwrap();
        assert_eq!(top.name, "A6");
        assert_approx_eq!(top.frequency, 1760.0, 0.01);
    }

    #[test]
    fn test_key_parsing_accepts_enharmonics() {
        assert_eq!("g".parse::<HarpKey>().unwrap(), HarpKey::G);
        assert_eq!("C#".parse::<HarpKey>().unwrap(), HarpKey::Db);
        assert_eq!("Gb".parse::<HarpKey>().unwrap(), HarpKey::FSharp);
        assert_eq!(HarpKey::FSharp.to_string(), "F#");
        assert!("H".parse::<HarpKey>().is_err());
        assert_eq!(HarpKey::G.sample_dir_name(), "G_harp");
    }
}
