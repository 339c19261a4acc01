//! # Harp Ear Trainer GUI
//!
//! Desktop front end for the harmonica ear trainer. The player picks a harp
//! key, scale and register; the trainer plays a lick and (optionally) leaves
//! a metronome-counted gap to play it back by ear.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme, owns the session
//! - **Scheduler Thread**: owned by the core `Player`, drives the audio output
//! - **Communication**: playback events arrive over a crossbeam channel
//! - **Updates**: 60 FPS polling via the subscription system

mod ui;

use harp_core::audio::{AudioEngine, TARGET_SAMPLE_RATE};
use harp_core::catalog::{self, CatalogLoad, catalog_files_in};
use harp_core::samples::SampleSet;
use harp_core::sequencer::Plan;
use harp_core::{
    Catalog, HarpKey, Lick, PlayMode, PlaybackEvent, PlaybackSession, PlaybackState, Player, Register,
    Tab, TrainerConfig,
};
use iced::{Element, Subscription, Theme};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ui::main_display::create_main_view;

/// Main entry point for the ear trainer.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting Harp Ear Trainer...");
    let result = iced::application("Harp Ear Trainer", TrainerApp::update, TrainerApp::view)
        .subscription(TrainerApp::subscription)
        .theme(TrainerApp::theme)
        .run();
    info!("Application finished with result: {:?}", result);
    result
}

#[derive(Debug, Clone)]
pub enum Message {
    // Selection
    KeySelected(HarpKey),
    ScaleSelected(String),
    RegisterSelected(Register),
    BpmChanged(f64),
    CallAndResponseToggled(bool),
    ReselectToggled(bool),

    // Playback
    NewLick,
    Play,
    Stop,
    PlayScale,
    ToggleTabs,

    SaveSettings,

    // Continuous update message
    Tick,
}

/// Everything the view needs, rebuilt from the session after each update.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub keys: Vec<HarpKey>,
    pub key: HarpKey,
    pub scales: Vec<String>,
    pub scale: String,
    pub register: Register,
    pub registers_available: Vec<Register>,
    pub bpm: f64,
    pub call_and_response: bool,
    pub reselect: bool,
    pub playback_state: PlaybackState,

    pub lick_label: Option<String>,
    pub tab_text: String,
    pub tabs_visible: bool,
    /// Tabs of the current lick by note index, `None` for rests
    pub lick_tabs: Vec<Option<Tab>>,
    pub sounding: Option<usize>,
    pub response_beat: Option<usize>,
    pub iteration: usize,
    pub status: Option<String>,
}

struct TrainerApp {
    config: TrainerConfig,
    config_path: PathBuf,
    catalog: Arc<Catalog>,
    session: PlaybackSession,
    player: Player,
    rng: StdRng,

    display_data: AppDisplayData,
}

impl Default for TrainerApp {
    fn default() -> Self {
        let config_path = std::env::var_os(harp_core::config::CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(harp_core::config::DEFAULT_CONFIG_FILE));
        let mut status = None;
        let config = TrainerConfig::load().unwrap_or_else(|e| {
            error!("{}", e);
            status = Some(format!("{e}; using default settings"));
            TrainerConfig::default()
        });

        let load = load_catalog(&config);
        if !load.errors.is_empty() {
            status = Some(format!("{} lick entries could not be loaded, see the log", load.errors.len()));
        }
        let catalog = Arc::new(load.catalog);

        let session = PlaybackSession::new(&config).unwrap_or_default();

        let key = session.key();
        info!("Starting playback thread...");
        let player = Player::spawn(
            AudioEngine::start,
            Arc::new(SampleSet::empty(TARGET_SAMPLE_RATE)),
            key,
        );
        let samples_dir = config.samples_dir.clone();
        player.load_samples(key, move || Arc::new(build_samples(samples_dir.as_deref(), key)));

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut app = Self {
            display_data: AppDisplayData {
                keys: catalog.keys(),
                key,
                scales: Vec::new(),
                scale: session.scale().to_string(),
                register: session.register(),
                registers_available: Vec::new(),
                bpm: session.bpm().value(),
                call_and_response: session.mode() == PlayMode::CallAndResponse,
                reselect: session.reselect_each_cycle(),
                playback_state: PlaybackState::Idle,
                lick_label: None,
                tab_text: String::new(),
                tabs_visible: false,
                lick_tabs: Vec::new(),
                sounding: None,
                response_beat: None,
                iteration: 0,
                status,
            },
            config,
            config_path,
            catalog,
            session,
            player,
            rng,
        };
        app.align_scale();
        app.refresh();
        info!("TrainerApp created");
        app
    }
}

impl TrainerApp {
    fn update(&mut self, message: Message) {
        match message {
            Message::KeySelected(key) => {
                if key != self.session.key() {
                    self.session.set_key(key);
                    // Built on the scheduler thread; playback stops first
                    let samples_dir = self.config.samples_dir.clone();
                    self.player
                        .load_samples(key, move || Arc::new(build_samples(samples_dir.as_deref(), key)));
                    self.align_scale();
                    self.display_data.status = None;
                }
            }
            Message::ScaleSelected(scale) => {
                self.player.stop();
                self.session.set_scale(scale);
                self.display_data.status = None;
            }
            Message::RegisterSelected(register) => {
                self.session.set_register(register);
                self.display_data.status = None;
            }
            Message::BpmChanged(bpm) => {
                if let Err(e) = self.session.set_bpm(bpm.round()) {
                    warn!("{}", e);
                    self.display_data.status = Some(e.to_string());
                }
            }
            Message::CallAndResponseToggled(on) => {
                let mode = if on { PlayMode::CallAndResponse } else { PlayMode::Once };
                self.session.set_mode(mode);
            }
            Message::ReselectToggled(on) => self.session.set_reselect_each_cycle(on),
            Message::NewLick => {
                let selected = self.session.next_lick(&self.catalog, &mut self.rng).map(|_| ());
                match selected {
                    Ok(()) => self.play_current(),
                    Err(e) => {
                        warn!("{}", e);
                        self.display_data.status = Some(e.to_string());
                    }
                }
            }
            Message::Play => {
                let is_lick = self
                    .session
                    .current()
                    .is_some_and(|l| l.kind == catalog::LickKind::Lick);
                if is_lick {
                    self.play_current();
                } else {
                    self.update(Message::NewLick);
                    return;
                }
            }
            Message::Stop => self.player.stop(),
            Message::PlayScale => {
                let selected = self.session.reference_scale(&self.catalog).map(|_| ());
                match selected.map(|_| self.session.timeline()) {
                    Ok(Some(timeline)) => {
                        self.display_data.status = None;
                        self.player.play(Plan::once(timeline));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("{}", e);
                        self.display_data.status = Some(e.to_string());
                    }
                }
            }
            Message::ToggleTabs => self.session.toggle_tabs(),
            Message::SaveSettings => {
                self.sync_config();
                match self.config.save(&self.config_path) {
                    Ok(()) => {
                        info!("Settings saved to {}", self.config_path.display());
                        self.display_data.status =
                            Some(format!("Settings saved to {}", self.config_path.display()));
                    }
                    Err(e) => {
                        error!("{}", e);
                        self.display_data.status = Some(e.to_string());
                    }
                }
            }
            Message::Tick => {
                for event in self.player.poll_events() {
                    self.process_playback_event(event);
                }
                self.display_data.playback_state = self.player.state();
            }
        }
        self.refresh();
    }

    /// Falls back to the first scale the catalog has for the key.
    fn align_scale(&mut self) {
        let scales = self.catalog.scales(self.session.key());
        if !scales.iter().any(|s| s == self.session.scale()) {
            if let Some(first) = scales.first() {
                self.session.set_scale(first.clone());
            }
        }
    }

    fn play_current(&mut self) {
        let plan = self
            .session
            .plan(&self.catalog, StdRng::seed_from_u64(self.rng.r#gen()));
        if let Some(plan) = plan {
            self.display_data.status = None;
            self.player.play(plan);
        }
    }

    /// Applies a single event from the scheduler thread.
    fn process_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Started { lick_id, iteration } => {
                // A reselecting loop may have moved on to another lick
                let moved_on = lick_id.as_deref() != self.session.current().map(|l| l.id.as_str());
                if moved_on {
                    if let Some(lick) = lick_id.as_deref().and_then(|id| self.catalog.find(id)) {
                        self.session.follow(lick.clone());
                    }
                }
                self.display_data.iteration = iteration;
                self.display_data.sounding = None;
                self.display_data.response_beat = None;
            }
            PlaybackEvent::NoteTriggered(index) => self.display_data.sounding = Some(index),
            PlaybackEvent::ResponseStarted { .. } => {
                self.display_data.sounding = None;
                self.display_data.status = Some("Your turn".to_string());
            }
            PlaybackEvent::ResponseBeat(beat) => self.display_data.response_beat = Some(beat),
            PlaybackEvent::Completed | PlaybackEvent::Cancelled => {
                self.display_data.sounding = None;
                self.display_data.response_beat = None;
                if self.display_data.status.as_deref() == Some("Your turn") {
                    self.display_data.status = None;
                }
            }
            PlaybackEvent::MissingSample(warning) => {
                self.display_data.status = Some(warning.to_string());
            }
            PlaybackEvent::Error(message) => self.display_data.status = Some(message),
        }
    }

    fn sync_config(&mut self) {
        self.config.key = self.session.key();
        self.config.scale = self.session.scale().to_string();
        self.config.register = self.session.register();
        self.config.bpm = self.session.bpm().value();
        self.config.mode = self.session.mode();
        self.config.reselect_each_cycle = self.session.reselect_each_cycle();
    }

    /// Copies session state into the display data.
    fn refresh(&mut self) {
        let data = &mut self.display_data;
        let session = &self.session;
        data.key = session.key();
        data.scales = self.catalog.scales(session.key());
        data.scale = session.scale().to_string();
        data.register = session.register();
        data.registers_available = self.catalog.registers_for(session.key(), session.scale());
        data.bpm = session.bpm().value();
        data.call_and_response = session.mode() == PlayMode::CallAndResponse;
        data.reselect = session.reselect_each_cycle();
        data.tab_text = session.tab_text();
        data.tabs_visible = session.tabs_visible();
        match session.current() {
            Some(lick) => {
                data.lick_label = Some(lick_label(&self.catalog, lick));
                data.lick_tabs = lick.notes.iter().map(|n| n.tab).collect();
            }
            None => {
                data.lick_label = None;
                data.lick_tabs.clear();
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Fires every 16ms so playback highlights follow the scheduler closely.
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Id, the registers the lick actually touches (falling back to its catalog
/// register), time signature and length.
fn lick_label(catalog: &Catalog, lick: &Lick) -> String {
    let register = match catalog.registers_of(lick) {
        Some(touched) if !touched.is_empty() => {
            touched.iter().map(Register::to_string).collect::<Vec<_>>().join(" + ")
        }
        _ => lick.register.to_string(),
    };
    format!(
        "{} (register: {}, {} time, {} beats)",
        lick.id,
        register,
        lick.time_signature,
        lick.total_beats()
    )
}

/// Loads the configured lick files (directories are expanded), or the bundled
/// licks when none are configured.
fn load_catalog(config: &TrainerConfig) -> CatalogLoad {
    if config.catalog_paths.is_empty() {
        return catalog::load_default_catalog();
    }
    let mut files = Vec::new();
    for path in &config.catalog_paths {
        if path.is_dir() {
            match catalog_files_in(path) {
                Ok(found) => files.extend(found),
                Err(e) => warn!("Cannot read lick directory {}: {}", path.display(), e),
            }
        } else {
            files.push(path.clone());
        }
    }
    catalog::load_catalog(&files)
}

/// Recorded samples for `key` when available, synthesized tones otherwise.
/// Slow enough that it only ever runs on the scheduler thread.
fn build_samples(samples_dir: Option<&Path>, key: HarpKey) -> SampleSet {
    if let Some(dir) = samples_dir {
        let recorded = SampleSet::load_dir(dir, &[key], TARGET_SAMPLE_RATE);
        if !recorded.is_empty() {
            return recorded;
        }
        warn!("No recorded samples for {} harp, synthesizing", key);
    }
    SampleSet::synthesize(&[key], TARGET_SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lick_label_shows_registers_and_time_signature() {
        let catalog = catalog::load_default_catalog().catalog;
        let label = |id: &str| lick_label(&catalog, catalog.find(id).unwrap());

        assert_eq!(
            label("c-major-middle-3"),
            "c-major-middle-3 (register: middle, 3/4 time, 6 beats)"
        );
        assert_eq!(
            label("c-major-mixed-1"),
            "c-major-mixed-1 (register: low + middle + high, 4/4 time, 4 beats)"
        );
        // No register parts for G Blues: the catalog register is shown
        assert_eq!(label("g-blues-low-2"), "g-blues-low-2 (register: low, 4/4 time, 4 beats)");
    }
}
