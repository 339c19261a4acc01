//! # Lick Catalog Module
//!
//! Loads lick and scale definitions from JSON files and hands out licks for
//! a (key, scale, register) selection.
//!
//! Loading is forgiving: a malformed entry becomes a [`CatalogError`] and is
//! left out of every bucket, while the rest of the file (and every other
//! file) still loads. The errors are returned together so they can be
//! reported once at start-up.
//!
//! Selection is a pure function of the catalog, the criteria, the id of the
//! last lick played and an injected random source, so it is reproducible
//! under a seeded RNG.

use log::{info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CatalogError, ConfigError, SelectionError};
use crate::harp::{HarpKey, Tab, format_tabs};

/// Lick definitions bundled with the application, used when no catalog files are configured.
pub const DEFAULT_LICKS: &str = include_str!("../licks/default_licks.json");

/// Longest lick (or single note) accepted, in beats. At the slowest tempo
/// this is just over twelve minutes.
pub const MAX_LICK_BEATS: f64 = 256.0;

/// Pitch range of the harp a lick lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    Low,
    Middle,
    High,
    Mixed,
}

impl Register {
    pub const ALL: [Register; 4] = [Register::Low, Register::Middle, Register::High, Register::Mixed];
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::Low => "low",
            Register::Middle => "middle",
            Register::High => "high",
            Register::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

impl FromStr for Register {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Register::Low),
            "middle" | "mid" => Ok(Register::Middle),
            "high" => Ok(Register::High),
            "mixed" => Ok(Register::Mixed),
            _ => Err(ConfigError::InvalidValue {
                field: "register",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether an entry is a practice lick or the reference scale for its key/scale pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LickKind {
    Lick,
    Scale,
}

/// One note or rest of a lick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// `None` marks a rest
    pub tab: Option<Tab>,
    /// Length in beats (quarter notes), always > 0
    pub duration: f64,
}

impl NoteEvent {
    pub fn note(tab: Tab, duration: f64) -> Self {
        Self { tab: Some(tab), duration }
    }

    pub fn rest(duration: f64) -> Self {
        Self { tab: None, duration }
    }

    pub fn is_rest(&self) -> bool {
        self.tab.is_none()
    }
}

/// A short phrase from the catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Lick {
    pub id: String,
    pub key: HarpKey,
    pub scale: String,
    pub register: Register,
    pub kind: LickKind,
    pub time_signature: String,
    pub notes: Vec<NoteEvent>,
    /// Optional hand-written tablature that overrides the generated line
    pub tab_text: Option<String>,
}

impl Lick {
    /// Sum of all note and rest durations.
    pub fn total_beats(&self) -> f64 {
        self.notes.iter().map(|n| n.duration).sum()
    }

    /// Tablature shown when the player reveals the answer.
    pub fn tab_line(&self) -> String {
        self.tab_text
            .clone()
            .unwrap_or_else(|| format_tabs(&self.notes))
    }

    /// Distinct tabs played, rests excluded.
    pub fn tabs(&self) -> BTreeSet<Tab> {
        self.notes.iter().filter_map(|n| n.tab).collect()
    }
}

/// What the player asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Criteria {
    pub key: HarpKey,
    pub scale: String,
    pub register: Register,
}

impl Criteria {
    pub fn new(key: HarpKey, scale: impl Into<String>, register: Register) -> Self {
        Self {
            key,
            scale: scale.into(),
            register,
        }
    }
}

/// All loaded licks, bucketed for selection.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    licks: BTreeMap<Criteria, Vec<Lick>>,
    scales: BTreeMap<(HarpKey, String), Vec<Lick>>,
}

/// Result of loading: whatever parsed, plus every error encountered on the way.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub catalog: Catalog,
    pub errors: Vec<CatalogError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LickFile {
    Wrapped { licks: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

#[derive(Deserialize)]
struct RawLick {
    id: Option<String>,
    key: String,
    scale: String,
    register: String,
    kind: Option<String>,
    time_signature: Option<String>,
    tab: Option<String>,
    #[serde(alias = "lick_data")]
    notes: Vec<RawNote>,
}

#[derive(Deserialize)]
struct RawNote {
    tab: String,
    duration: f64,
}

/// Loads every file in `paths`, collecting errors instead of stopping at the first.
pub fn load_catalog<P: AsRef<Path>>(paths: &[P]) -> CatalogLoad {
    let mut load = CatalogLoad::default();
    for path in paths {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(source) => load.extend_from_str(path, &source),
            Err(e) => load.errors.push(CatalogError::File {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }
    load.report();
    load
}

/// Loads the definitions bundled with the crate.
pub fn load_default_catalog() -> CatalogLoad {
    let mut load = CatalogLoad::default();
    load.extend_from_str(Path::new("default_licks.json"), DEFAULT_LICKS);
    load.report();
    load
}

impl CatalogLoad {
    /// Parses one JSON document; `path` only labels entries and errors.
    pub fn extend_from_str(&mut self, path: &Path, source: &str) {
        let entries = match serde_json::from_str::<LickFile>(source) {
            Ok(LickFile::Wrapped { licks }) | Ok(LickFile::Bare(licks)) => licks,
            Err(e) => {
                self.errors.push(CatalogError::File {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let mut seen: HashSet<String> = self.catalog.ids().map(str::to_string).collect();
        for (index, value) in entries.into_iter().enumerate() {
            let entry_error = |message: String| CatalogError::Entry {
                path: path.to_path_buf(),
                index,
                message,
            };
            let lick = serde_json::from_value::<RawLick>(value)
                .map_err(|e| entry_error(e.to_string()))
                .and_then(|raw| build_lick(path, index, raw).map_err(entry_error));
            match lick {
                Ok(lick) if !seen.insert(lick.id.clone()) => {
                    self.errors
                        .push(entry_error(format!("duplicate lick id '{}'", lick.id)));
                }
                Ok(lick) => self.catalog.insert(lick),
                Err(e) => self.errors.push(e),
            }
        }
    }

    fn report(&self) {
        for error in &self.errors {
            warn!("{}", error);
        }
        info!(
            "Lick catalog loaded: {} licks, {} scales, {} rejected entries",
            self.catalog.len(),
            self.catalog.scale_count(),
            self.errors.len()
        );
    }
}

fn build_lick(path: &Path, index: usize, raw: RawLick) -> Result<Lick, String> {
    let key: HarpKey = raw.key.parse().map_err(|e: ConfigError| e.to_string())?;
    let register: Register = raw.register.parse().map_err(|e: ConfigError| e.to_string())?;
    let kind = match raw.kind.as_deref().map(str::trim) {
        None | Some("lick") => LickKind::Lick,
        Some("scale") => LickKind::Scale,
        Some(other) => return Err(format!("unknown kind '{other}'")),
    };
    let scale = raw.scale.trim().to_string();
    if scale.is_empty() {
        return Err("scale must not be empty".to_string());
    }
    if raw.notes.is_empty() {
        return Err("a lick needs at least one note".to_string());
    }

    let mut notes = Vec::with_capacity(raw.notes.len());
    let mut total_beats = 0.0;
    for (i, note) in raw.notes.iter().enumerate() {
        if !note.duration.is_finite() || note.duration <= 0.0 {
            return Err(format!(
                "note {i}: duration must be greater than zero, got {}",
                note.duration
            ));
        }
        total_beats += note.duration;
        if total_beats > MAX_LICK_BEATS {
            return Err(format!(
                "note {i}: lick runs past the {MAX_LICK_BEATS} beat limit"
            ));
        }
        if note.tab.trim().eq_ignore_ascii_case("rest") {
            notes.push(NoteEvent::rest(note.duration));
        } else {
            let tab = Tab::parse(&note.tab).map_err(|e| format!("note {i}: {e}"))?;
            notes.push(NoteEvent::note(tab, note.duration));
        }
    }

    let id = raw.id.unwrap_or_else(|| {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "licks".to_string());
        format!("{stem}#{index}")
    });

    Ok(Lick {
        id,
        key,
        scale,
        register,
        kind,
        time_signature: raw.time_signature.unwrap_or_else(|| "4/4".to_string()),
        notes,
        tab_text: raw.tab,
    })
}

impl Catalog {
    fn insert(&mut self, lick: Lick) {
        match lick.kind {
            LickKind::Lick => self
                .licks
                .entry(Criteria::new(lick.key, lick.scale.clone(), lick.register))
                .or_default()
                .push(lick),
            LickKind::Scale => self
                .scales
                .entry((lick.key, lick.scale.clone()))
                .or_default()
                .push(lick),
        }
    }

    fn ids(&self) -> impl Iterator<Item = &str> {
        self.licks
            .values()
            .chain(self.scales.values())
            .flatten()
            .map(|l| l.id.as_str())
    }

    /// Number of practice licks (reference scales excluded).
    pub fn len(&self) -> usize {
        self.licks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.scale_count() == 0
    }

    pub fn scale_count(&self) -> usize {
        self.scales.values().map(Vec::len).sum()
    }

    /// The licks in one bucket, empty if nothing matches.
    pub fn bucket(&self, criteria: &Criteria) -> &[Lick] {
        self.licks.get(criteria).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys that have at least one lick or scale.
    pub fn keys(&self) -> Vec<HarpKey> {
        let keys: BTreeSet<HarpKey> = self
            .licks
            .keys()
            .map(|c| c.key)
            .chain(self.scales.keys().map(|(k, _)| *k))
            .collect();
        keys.into_iter().collect()
    }

    /// Scale names available on a harp key, sorted.
    pub fn scales(&self, key: HarpKey) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .licks
            .keys()
            .filter(|c| c.key == key)
            .map(|c| &c.scale)
            .chain(self.scales.keys().filter(|(k, _)| *k == key).map(|(_, s)| s))
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Registers with at least one lick for the pair.
    pub fn registers_for(&self, key: HarpKey, scale: &str) -> Vec<Register> {
        self.licks
            .iter()
            .filter(|(c, licks)| c.key == key && c.scale == scale && !licks.is_empty())
            .map(|(c, _)| c.register)
            .collect()
    }

    /// Reference scale entries for a pair, in load order.
    pub fn scale_entries(&self, key: HarpKey, scale: &str) -> &[Lick] {
        self.scales
            .get(&(key, scale.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Registers `lick` actually touches, judged against the low, middle and
    /// high scale entries for its key and scale. `None` when any of the three
    /// is missing from the catalog.
    pub fn registers_of(&self, lick: &Lick) -> Option<Vec<Register>> {
        let entries = self.scale_entries(lick.key, &lick.scale);
        let part = |register| entries.iter().find(|e| e.register == register);
        let low = part(Register::Low)?;
        let middle = part(Register::Middle)?;
        let high = part(Register::High)?;
        Some(infer_registers(lick, low, middle, high))
    }

    /// Looks a lick or scale up by id.
    pub fn find(&self, id: &str) -> Option<&Lick> {
        self.licks
            .values()
            .chain(self.scales.values())
            .flatten()
            .find(|l| l.id == id)
    }
}

/// Picks a lick from the bucket matching `criteria`.
///
/// If the bucket holds more than one lick and the first draw is `exclude_id`,
/// the draw is repeated exactly once and its result kept, so repeats become
/// less likely without ever being impossible.
pub fn select_lick<'a, R: Rng + ?Sized>(
    catalog: &'a Catalog,
    criteria: &Criteria,
    exclude_id: Option<&str>,
    rng: &mut R,
) -> Result<&'a Lick, SelectionError> {
    let bucket = catalog.bucket(criteria);
    let no_licks = || SelectionError::NoLicksAvailable {
        key: criteria.key,
        scale: criteria.scale.clone(),
        register: criteria.register,
    };

    let first = bucket.choose(rng).ok_or_else(no_licks)?;
    if bucket.len() > 1 && exclude_id == Some(first.id.as_str()) {
        return bucket.choose(rng).ok_or_else(no_licks);
    }
    Ok(first)
}

/// Fetches the reference scale for a key/scale pair.
///
/// A `mixed` register entry (the whole scale) wins over partial ones; ties go
/// to the lowest id.
pub fn select_scale<'a>(
    catalog: &'a Catalog,
    key: HarpKey,
    scale: &str,
) -> Result<&'a Lick, SelectionError> {
    catalog
        .scale_entries(key, scale)
        .iter()
        .min_by(|a, b| {
            let a_rank = (a.register != Register::Mixed, &a.id);
            let b_rank = (b.register != Register::Mixed, &b.id);
            a_rank.cmp(&b_rank)
        })
        .ok_or_else(|| SelectionError::NoScaleAvailable {
            key,
            scale: scale.to_string(),
        })
}

/// Which registers a lick touches, judged against the low, middle and high
/// parts of its reference scale.
pub fn infer_registers(lick: &Lick, low: &Lick, middle: &Lick, high: &Lick) -> Vec<Register> {
    let played = lick.tabs();
    [(Register::Low, low), (Register::Middle, middle), (Register::High, high)]
        .into_iter()
        .filter(|(_, part)| !played.is_disjoint(&part.tabs()))
        .map(|(register, _)| register)
        .collect()
}

/// Paths of every `.json` file in a directory, sorted by name.
pub fn catalog_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const SAMPLE: &str = r#"{
        "licks": [
            { "id": "g-low-1", "key": "G", "scale": "Blues", "register": "low",
              "notes": [ { "tab": "-2", "duration": 1 }, { "tab": "-3_p", "duration": 0.5 },
                         { "tab": "rest", "duration": 0.5 } ] },
            { "id": "g-low-2", "key": "G", "scale": "Blues", "register": "low",
              "lick_data": [ { "tab": "-2", "duration": 0.5 }, { "tab": "-1", "duration": 1.5 } ] },
            { "id": "g-mid-1", "key": "G", "scale": "Blues", "register": "middle",
              "notes": [ { "tab": "-4", "duration": 1 }, { "tab": "5", "duration": 1 } ] },
            { "id": "g-scale-low", "key": "G", "scale": "Blues", "register": "low", "kind": "scale",
              "notes": [ { "tab": "-2", "duration": 1 }, { "tab": "-3_p", "duration": 1 } ] },
            { "id": "g-scale", "key": "G", "scale": "Blues", "register": "mixed", "kind": "scale",
              "notes": [ { "tab": "-2", "duration": 1 }, { "tab": "-4", "duration": 1 } ] }
        ]
    }"#;

    fn load(source: &str) -> CatalogLoad {
        let mut load = CatalogLoad::default();
        load.extend_from_str(Path::new("test.json"), source);
        load
    }

    #[test]
    fn test_loads_buckets_and_scales() {
        let load = load(SAMPLE);
        assert!(load.errors.is_empty(), "{:?}", load.errors);
        assert_eq!(load.catalog.len(), 3);
        assert_eq!(load.catalog.scale_count(), 2);

        let low = Criteria::new(HarpKey::G, "Blues", Register::Low);
        assert_eq!(load.catalog.bucket(&low).len(), 2);
        assert_eq!(
            load.catalog.registers_for(HarpKey::G, "Blues"),
            vec![Register::Low, Register::Middle]
        );
        assert_eq!(load.catalog.scales(HarpKey::G), vec!["Blues".to_string()]);
        assert_eq!(load.catalog.keys(), vec![HarpKey::G]);

        let first = &load.catalog.bucket(&low)[0];
        assert_eq!(first.total_beats(), 2.0);
        assert_eq!(first.tab_line(), "-2 -3' ~");
        assert_eq!(first.time_signature, "4/4");
    }

    #[test]
    fn test_malformed_entries_are_reported_and_excluded() {
        let source = r#"[
            { "id": "ok", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 1 } ] },
            { "id": "zero", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 0 } ] },
            { "id": "negative", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": -1 } ] },
            { "id": "unknown-tab", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "-5_p", "duration": 1 } ] },
            { "id": "no-key", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 1 } ] },
            { "id": "ok", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "5", "duration": 1 } ] }
        ]"#;
        let load = load(source);
        assert_eq!(load.errors.len(), 5);
        assert!(matches!(load.errors[0], CatalogError::Entry { index: 1, .. }));
        assert!(load.errors[4].to_string().contains("duplicate lick id 'ok'"));

        let bucket = load.catalog.bucket(&Criteria::new(HarpKey::C, "Major", Register::Low));
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].id, "ok");
        assert_eq!(bucket[0].notes[0].tab, Some(Tab::parse("4").unwrap()));
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let source = r#"[
            { "id": "huge-note", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 1e20 } ] },
            { "id": "overflowing", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 1e308 }, { "tab": "5", "duration": 1e308 } ] },
            { "id": "long-total", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 200 }, { "tab": "5", "duration": 100 } ] },
            { "id": "at-limit", "key": "C", "scale": "Major", "register": "low",
              "notes": [ { "tab": "4", "duration": 128 }, { "tab": "5", "duration": 128 } ] }
        ]"#;
        let load = load(source);
        assert_eq!(load.errors.len(), 3, "{:?}", load.errors);
        assert!(matches!(load.errors[0], CatalogError::Entry { index: 0, .. }));
        assert!(load.errors[2].to_string().contains("note 1: lick runs past the 256 beat limit"));

        let bucket = load.catalog.bucket(&Criteria::new(HarpKey::C, "Major", Register::Low));
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].id, "at-limit");
        assert_eq!(bucket[0].total_beats(), MAX_LICK_BEATS);
    }

    #[test]
    fn test_unreadable_files_do_not_stop_loading() {
        let load = load_catalog(&[Path::new("/definitely/not/here.json")]);
        assert_eq!(load.errors.len(), 1);
        assert!(matches!(load.errors[0], CatalogError::File { .. }));
        assert!(load.catalog.is_empty());

        let broken = self::load("{ not json");
        assert_eq!(broken.errors.len(), 1);
    }

    #[test]
    fn test_missing_id_falls_back_to_file_position() {
        let load = load(
            r#"[{ "key": "A", "scale": "Major", "register": "high",
                 "notes": [ { "tab": "7", "duration": 2 } ] }]"#,
        );
        let bucket = load.catalog.bucket(&Criteria::new(HarpKey::A, "Major", Register::High));
        assert_eq!(bucket[0].id, "test#0");
    }

    #[test]
    fn test_select_stays_inside_bucket() {
        let load = load(SAMPLE);
        let criteria = Criteria::new(HarpKey::G, "Blues", Register::Low);
        let mut rng = StdRng::seed_from_u64(7);
        let mut last: Option<String> = None;
        for _ in 0..200 {
            let lick = select_lick(&load.catalog, &criteria, last.as_deref(), &mut rng).unwrap();
            assert_eq!(lick.key, HarpKey::G);
            assert_eq!(lick.scale, "Blues");
            assert_eq!(lick.register, Register::Low);
            assert_eq!(lick.kind, LickKind::Lick);
            last = Some(lick.id.clone());
        }
    }

    #[test]
    fn test_repeats_are_reduced_but_possible() {
        let load = load(SAMPLE);
        let criteria = Criteria::new(HarpKey::G, "Blues", Register::Low);
        let mut rng = StdRng::seed_from_u64(42);
        let mut repeats = 0;
        let mut last = select_lick(&load.catalog, &criteria, None, &mut rng).unwrap().id.clone();
        for _ in 0..1000 {
            let lick = select_lick(&load.catalog, &criteria, Some(&last), &mut rng).unwrap();
            if lick.id == last {
                repeats += 1;
            }
            last = lick.id.clone();
        }
        // One retry out of two licks repeats with probability 1/4
        assert!(repeats > 150 && repeats < 350, "repeats = {repeats}");
    }

    #[test]
    fn test_single_lick_bucket_always_returns_it() {
        let load = load(SAMPLE);
        let criteria = Criteria::new(HarpKey::G, "Blues", Register::Middle);
        let mut rng = StdRng::seed_from_u64(1);
        let lick = select_lick(&load.catalog, &criteria, Some("g-mid-1"), &mut rng).unwrap();
        assert_eq!(lick.id, "g-mid-1");
    }

    #[test]
    fn test_empty_bucket_signals_no_licks() {
        let load = load(SAMPLE);
        let before = load.catalog.len();
        let criteria = Criteria::new(HarpKey::D, "Minor", Register::Low);
        let mut rng = StdRng::seed_from_u64(3);
        let err = select_lick(&load.catalog, &criteria, None, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SelectionError::NoLicksAvailable {
                key: HarpKey::D,
                scale: "Minor".to_string(),
                register: Register::Low,
            }
        );
        assert_eq!(load.catalog.len(), before);
    }

    #[test]
    fn test_select_scale_prefers_full_scale() {
        let load = load(SAMPLE);
        assert_eq!(select_scale(&load.catalog, HarpKey::G, "Blues").unwrap().id, "g-scale");
        assert!(matches!(
            select_scale(&load.catalog, HarpKey::C, "Blues"),
            Err(SelectionError::NoScaleAvailable { .. })
        ));
    }

    #[test]
    fn test_infer_registers() {
        let load = load(SAMPLE);
        let part = |tabs: &[&str]| Lick {
            id: "part".to_string(),
            key: HarpKey::G,
            scale: "Blues".to_string(),
            register: Register::Low,
            kind: LickKind::Scale,
            time_signature: "4/4".to_string(),
            notes: tabs.iter().map(|t| NoteEvent::note(Tab::parse(t).unwrap(), 1.0)).collect(),
            tab_text: None,
        };
        let low = part(&["-1", "-2", "-3_p"]);
        let middle = part(&["-4", "5", "6"]);
        let high = part(&["-8", "9", "-9"]);

        let lick = &load.catalog.bucket(&Criteria::new(HarpKey::G, "Blues", Register::Middle))[0];
        assert_eq!(infer_registers(lick, &low, &middle, &high), vec![Register::Middle]);

        let mixed = part(&["-2", "6", "-9"]);
        assert_eq!(
            infer_registers(&mixed, &low, &middle, &high),
            vec![Register::Low, Register::Middle, Register::High]
        );
    }

    #[test]
    fn test_bundled_licks_load_cleanly() {
        let load = load_default_catalog();
        assert!(load.errors.is_empty(), "{:?}", load.errors);
        assert_eq!(load.catalog.keys(), vec![HarpKey::C, HarpKey::G, HarpKey::A]);
        assert!(!load
            .catalog
            .bucket(&Criteria::new(HarpKey::C, "Major", Register::Middle))
            .is_empty());
        assert_eq!(
            select_scale(&load.catalog, HarpKey::C, "Major").unwrap().id,
            "c-major-scale"
        );
        assert_eq!(load.catalog.find("g-blues-low-2").unwrap().tab_line(), "-1 -2'' -2 ~ -2");
        assert!(load.catalog.find("nope").is_none());

        let registers_of = |id: &str| load.catalog.registers_of(load.catalog.find(id).unwrap());
        assert_eq!(
            registers_of("c-major-mixed-1"),
            Some(vec![Register::Low, Register::Middle, Register::High])
        );
        assert_eq!(registers_of("c-major-middle-3"), Some(vec![Register::Middle]));
        // G Blues ships only the full scale, so there is nothing to compare against
        assert_eq!(registers_of("g-blues-low-2"), None);
    }
}
