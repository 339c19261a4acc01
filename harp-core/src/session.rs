//! # Playback Session
//!
//! The user's current selection and the lick being practised. Owned by the UI;
//! turning it into something playable goes through [`PlaybackSession::plan`].

use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;

use crate::catalog::{Catalog, Criteria, Lick, Register, select_lick, select_scale};
use crate::config::TrainerConfig;
use crate::error::{ConfigError, SelectionError};
use crate::harp::HarpKey;
use crate::sequencer::{Plan, PlayMode, TimelineSource};
use crate::timeline::{Bpm, Timeline, compile_timeline};

/// Shown in place of the tab line until the player asks for the answer.
pub const HIDDEN_TABS: &str = "???";

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    key: HarpKey,
    scale: String,
    register: Register,
    bpm: Bpm,
    mode: PlayMode,
    reselect_each_cycle: bool,
    tabs_visible: bool,
    current: Option<Lick>,
    last_id: Option<String>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        let config = TrainerConfig::default();
        Self {
            key: config.key,
            scale: config.scale,
            register: config.register,
            bpm: Bpm::default(),
            mode: config.mode,
            reselect_each_cycle: config.reselect_each_cycle,
            tabs_visible: false,
            current: None,
            last_id: None,
        }
    }
}

impl PlaybackSession {
    pub fn new(config: &TrainerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            key: config.key,
            scale: config.scale.clone(),
            register: config.register,
            bpm: config.bpm()?,
            mode: config.mode,
            reselect_each_cycle: config.reselect_each_cycle,
            tabs_visible: false,
            current: None,
            last_id: None,
        })
    }

    pub fn key(&self) -> HarpKey {
        self.key
    }

    pub fn scale(&self) -> &str {
        &self.scale
    }

    pub fn register(&self) -> Register {
        self.register
    }

    pub fn bpm(&self) -> Bpm {
        self.bpm
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn reselect_each_cycle(&self) -> bool {
        self.reselect_each_cycle
    }

    pub fn tabs_visible(&self) -> bool {
        self.tabs_visible
    }

    pub fn current(&self) -> Option<&Lick> {
        self.current.as_ref()
    }

    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    pub fn criteria(&self) -> Criteria {
        Criteria::new(self.key, self.scale.clone(), self.register)
    }

    /// Changing the key starts the session over.
    pub fn set_key(&mut self, key: HarpKey) {
        if key != self.key {
            self.key = key;
            self.reset();
        }
    }

    /// Changing the scale starts the session over.
    pub fn set_scale(&mut self, scale: impl Into<String>) {
        let scale = scale.into();
        if scale != self.scale {
            self.scale = scale;
            self.reset();
        }
    }

    pub fn set_register(&mut self, register: Register) {
        self.register = register;
    }

    /// Takes effect the next time a timeline is compiled.
    pub fn set_bpm(&mut self, value: f64) -> Result<(), ConfigError> {
        self.bpm = Bpm::new(value)?;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    pub fn set_reselect_each_cycle(&mut self, reselect: bool) {
        self.reselect_each_cycle = reselect;
    }

    pub fn toggle_tabs(&mut self) {
        self.tabs_visible = !self.tabs_visible;
    }

    /// Selects a new lick, avoiding the last one played where possible.
    /// On an empty bucket the current lick is kept.
    pub fn next_lick<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<&Lick, SelectionError> {
        let lick = select_lick(catalog, &self.criteria(), self.last_id.as_deref(), rng)?.clone();
        debug!("Selected lick {}", lick.id);
        Ok(self.follow(lick))
    }

    /// Makes the reference scale for the current key and scale the current lick.
    pub fn reference_scale(&mut self, catalog: &Catalog) -> Result<&Lick, SelectionError> {
        let scale = select_scale(catalog, self.key, &self.scale)?.clone();
        Ok(self.follow(scale))
    }

    /// Records that `lick` is now the one being played, e.g. after the
    /// sequencer reselected it mid-loop.
    pub fn follow(&mut self, lick: Lick) -> &Lick {
        self.last_id = Some(lick.id.clone());
        self.tabs_visible = false;
        self.current.insert(lick)
    }

    /// The current lick compiled at the session tempo.
    pub fn timeline(&self) -> Option<Timeline> {
        self.current.as_ref().map(|lick| compile_timeline(lick, self.bpm))
    }

    /// A plan for the current lick in the session mode. When reselecting,
    /// every call-and-response cycle draws a new lick from `catalog`.
    pub fn plan(&self, catalog: &Arc<Catalog>, rng: StdRng) -> Option<Plan> {
        let timeline = self.timeline()?;
        let plan = Plan::new(timeline, self.mode);
        let reselect = self.reselect_each_cycle
            && self.mode == PlayMode::CallAndResponse
            && self.current.as_ref().is_some_and(|l| l.kind == crate::catalog::LickKind::Lick);
        if !reselect {
            return Some(plan);
        }
        Some(plan.reselecting(Box::new(Reselect {
            catalog: Arc::clone(catalog),
            criteria: self.criteria(),
            bpm: self.bpm,
            last_id: self.last_id.clone(),
            rng,
        })))
    }

    /// The tab line, or [`HIDDEN_TABS`] until revealed.
    pub fn tab_text(&self) -> String {
        match (&self.current, self.tabs_visible) {
            (Some(lick), true) => lick.tab_line(),
            (Some(_), false) => HIDDEN_TABS.to_string(),
            (None, _) => String::new(),
        }
    }

    fn reset(&mut self) {
        info!("Session reset for {} / {}", self.key, self.scale);
        self.current = None;
        self.last_id = None;
        self.tabs_visible = false;
    }
}

/// Draws a fresh lick for each call-and-response cycle.
pub struct Reselect {
    catalog: Arc<Catalog>,
    criteria: Criteria,
    bpm: Bpm,
    last_id: Option<String>,
    rng: StdRng,
}

impl TimelineSource for Reselect {
    fn next_timeline(&mut self) -> Option<Timeline> {
        let lick = select_lick(&self.catalog, &self.criteria, self.last_id.as_deref(), &mut self.rng).ok()?;
        self.last_id = Some(lick.id.clone());
        Some(compile_timeline(lick, self.bpm))
    }
}
