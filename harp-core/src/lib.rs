// harp-core/src/lib.rs

//! The core logic for the harmonica ear trainer.
//! This crate loads the lick catalog, picks licks, turns them into
//! timed schedules and plays them through the audio output. It is
//! completely headless and contains no GUI code.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod harp;
pub mod samples;
pub mod sequencer;
pub mod session;
pub mod timeline;

pub use catalog::{Catalog, CatalogLoad, Criteria, Lick, NoteEvent, Register};
pub use config::TrainerConfig;
pub use error::{CatalogError, ConfigError, MissingSampleWarning, SelectionError};
pub use harp::{HarpKey, Tab};
pub use sequencer::{PlayMode, PlaybackEvent, PlaybackState, Player};
pub use session::PlaybackSession;
pub use timeline::{Bpm, Timeline};
