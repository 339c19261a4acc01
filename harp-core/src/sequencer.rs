//! # Playback Sequencer Module
//!
//! Schedules compiled timelines against the wall clock.
//!
//! ## Architecture
//! - [`Transport`]: a pure state machine. Given "now" it returns the cues that
//!   are due. It never sleeps and never reads the clock itself, which makes the
//!   timing rules directly testable.
//! - [`Player`]: owns one scheduler thread that sleeps until the transport's
//!   next deadline, dispatches cues to a [`SampleSink`] and reports
//!   [`PlaybackEvent`]s over a channel.
//!
//! ## States
//! `Idle -> Playing -> (CallAndResponseWaiting <-> Playing) -> Idle`.
//! Stopping, or starting a new plan, from any non-idle state reports
//! `Cancelled` and goes back to `Idle`.
//!
//! ## Timing
//! Every phase (a lick or a response window) has a fixed start instant. Cue
//! times are that instant plus the precomputed offset. The next phase starts
//! at the previous start plus the previous phase's length, never at the time
//! a cue happened to fire, so loops do not drift.
//!
//! ## Cancellation
//! [`Player::play`] and [`Player::stop`] advance a generation counter before
//! returning. The scheduler checks it before every cue, so once either call
//! returns nothing from the superseded plan reaches the sink.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::{NullSink, SampleSink};
use crate::error::MissingSampleWarning;
use crate::harp::HarpKey;
use crate::samples::SampleSet;
use crate::timeline::{Sound, Timeline, response_for, span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    CallAndResponseWaiting,
}

/// Whether a lick plays once or alternates with a response window until stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    Once,
    CallAndResponse,
}

/// Notifications for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A lick phase began. `iteration` counts call-and-response cycles from 0.
    Started {
        lick_id: Option<String>,
        iteration: usize,
    },
    NoteTriggered(usize),
    ResponseStarted { iteration: usize },
    ResponseBeat(usize),
    Completed,
    Cancelled,
    MissingSample(MissingSampleWarning),
    Error(String),
}

/// Supplies the lick for each new call-and-response iteration.
pub trait TimelineSource: Send {
    /// `None` repeats the previous lick.
    fn next_timeline(&mut self) -> Option<Timeline>;
}

/// Everything needed to start playback.
pub struct Plan {
    pub timeline: Timeline,
    pub mode: PlayMode,
    pub source: Option<Box<dyn TimelineSource>>,
}

impl Plan {
    pub fn once(timeline: Timeline) -> Self {
        Self {
            timeline,
            mode: PlayMode::Once,
            source: None,
        }
    }

    pub fn call_and_response(timeline: Timeline) -> Self {
        Self {
            timeline,
            mode: PlayMode::CallAndResponse,
            source: None,
        }
    }

    pub fn new(timeline: Timeline, mode: PlayMode) -> Self {
        Self {
            timeline,
            mode,
            source: None,
        }
    }

    /// Picks a fresh lick for every iteration instead of repeating this one.
    pub fn reselecting(mut self, source: Box<dyn TimelineSource>) -> Self {
        self.source = Some(source);
        self
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("timeline", &self.timeline.lick_id)
            .field("mode", &self.mode)
            .field("reselecting", &self.source.is_some())
            .finish()
    }
}

/// A unit of work handed from the transport to whoever drives it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Sound {
        index: usize,
        sound: Sound,
        hold: Duration,
    },
    Event(PlaybackEvent),
}

#[derive(Debug)]
struct Phase {
    timeline: Timeline,
    start: Instant,
    next: usize,
    response: bool,
}

impl Phase {
    fn at(&self, offset_ms: f64) -> Instant {
        self.start.checked_add(span(offset_ms)).unwrap_or(self.start)
    }

    fn end(&self) -> Instant {
        self.at(self.timeline.total_ms)
    }
}

/// Clock-free scheduling state for one active plan.
pub struct Transport {
    state: PlaybackState,
    mode: PlayMode,
    source: Option<Box<dyn TimelineSource>>,
    lick: Option<Timeline>,
    phase: Option<Phase>,
    iteration: usize,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            mode: PlayMode::Once,
            source: None,
            lick: None,
            phase: None,
            iteration: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Starts `plan` at `now`, cancelling whatever was active.
    pub fn start(&mut self, plan: Plan, now: Instant) -> Vec<Cue> {
        let mut cues: Vec<Cue> = self.stop().into_iter().collect();

        // A zero-length lick cannot loop
        let mode = if plan.timeline.total_ms > 0.0 {
            plan.mode
        } else {
            PlayMode::Once
        };
        self.mode = mode;
        self.source = plan.source;
        self.iteration = 0;
        cues.push(Cue::Event(PlaybackEvent::Started {
            lick_id: plan.timeline.lick_id.clone(),
            iteration: 0,
        }));
        self.begin_lick(plan.timeline, now);
        cues
    }

    /// Cancels the active plan. Returns the `Cancelled` cue, or `None` when already idle.
    pub fn stop(&mut self) -> Option<Cue> {
        if self.state == PlaybackState::Idle {
            return None;
        }
        self.reset();
        Some(Cue::Event(PlaybackEvent::Cancelled))
    }

    /// When the next cue or phase change is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        let phase = self.phase.as_ref()?;
        Some(match phase.timeline.entries.get(phase.next) {
            Some(entry) => phase.at(entry.start_ms),
            None => phase.end(),
        })
    }

    /// Returns every cue due at or before `now`, in schedule order.
    pub fn poll(&mut self, now: Instant) -> Vec<Cue> {
        let mut cues = Vec::new();
        while let Some(phase) = self.phase.as_mut() {
            while let Some(entry) = phase.timeline.entries.get(phase.next) {
                if phase.at(entry.start_ms) > now {
                    return cues;
                }
                cues.push(Cue::Sound {
                    index: entry.index,
                    sound: entry.sound,
                    hold: entry.hold(),
                });
                phase.next += 1;
            }

            let end = phase.end();
            if end > now {
                return cues;
            }
            let finished_response = phase.response;
            self.advance(finished_response, end, &mut cues);
        }
        cues
    }

    fn advance(&mut self, finished_response: bool, end: Instant, cues: &mut Vec<Cue>) {
        match (self.mode, finished_response) {
            (PlayMode::Once, _) => {
                self.reset();
                cues.push(Cue::Event(PlaybackEvent::Completed));
            }
            (PlayMode::CallAndResponse, false) => {
                let Some(lick) = self.lick.as_ref() else {
                    self.reset();
                    return;
                };
                self.phase = Some(Phase {
                    timeline: response_for(lick),
                    start: end,
                    next: 0,
                    response: true,
                });
                self.state = PlaybackState::CallAndResponseWaiting;
                cues.push(Cue::Event(PlaybackEvent::ResponseStarted {
                    iteration: self.iteration,
                }));
            }
            (PlayMode::CallAndResponse, true) => {
                self.iteration += 1;
                let next = self
                    .source
                    .as_mut()
                    .and_then(|source| source.next_timeline())
                    .filter(|t| t.total_ms > 0.0)
                    .or_else(|| self.lick.take());
                match next {
                    Some(timeline) => {
                        cues.push(Cue::Event(PlaybackEvent::Started {
                            lick_id: timeline.lick_id.clone(),
                            iteration: self.iteration,
                        }));
                        self.begin_lick(timeline, end);
                    }
                    None => {
                        self.reset();
                        cues.push(Cue::Event(PlaybackEvent::Completed));
                    }
                }
            }
        }
    }

    fn begin_lick(&mut self, timeline: Timeline, start: Instant) {
        self.phase = Some(Phase {
            timeline: timeline.clone(),
            start,
            next: 0,
            response: false,
        });
        self.lick = Some(timeline);
        self.state = PlaybackState::Playing;
    }

    fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.phase = None;
        self.lick = None;
        self.source = None;
    }
}

enum Command {
    Play { generation: u64, plan: Plan },
    Stop,
    SetSamples { key: HarpKey, load: SampleLoader },
    Shutdown,
}

type SampleLoader = Box<dyn FnOnce() -> Arc<SampleSet> + Send>;

/// Handle to the scheduler thread. Dropping it shuts the thread down and
/// releases the sink (and with it the audio device).
pub struct Player {
    commands: Sender<Command>,
    events: Receiver<PlaybackEvent>,
    generation: Arc<AtomicU64>,
    state: Arc<Mutex<PlaybackState>>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    /// Spawns the scheduler thread.
    ///
    /// `make_sink` runs on that thread, so the sink (e.g. an
    /// [`AudioEngine`](crate::audio::AudioEngine)) never has to cross threads.
    /// If it fails, playback continues silently and an `Error` event is sent.
    pub fn spawn<F, S>(make_sink: F, samples: Arc<SampleSet>, key: HarpKey) -> Player
    where
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
        S: SampleSink + 'static,
    {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let generation = Arc::new(AtomicU64::new(0));
        let state = Arc::new(Mutex::new(PlaybackState::Idle));

        let worker = {
            let generation = Arc::clone(&generation);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("harp-scheduler".to_string())
                .spawn(move || {
                    let sink: Box<dyn SampleSink> = match make_sink() {
                        Ok(sink) => Box::new(sink),
                        Err(e) => {
                            error!("Audio output unavailable: {:#}", e);
                            let _ = event_tx.send(PlaybackEvent::Error(format!(
                                "Audio output unavailable: {e:#}"
                            )));
                            Box::new(NullSink)
                        }
                    };
                    let mut scheduler = Scheduler {
                        transport: Transport::new(),
                        sink,
                        samples,
                        key,
                        events: event_tx,
                        generation,
                        active_generation: 0,
                        state,
                    };
                    scheduler.run(command_rx);
                })
        };
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Could not spawn the scheduler thread: {}", e);
                None
            }
        };

        Player {
            commands: command_tx,
            events: event_rx,
            generation,
            state,
            worker,
        }
    }

    /// Starts `plan`, cancelling anything already playing. Never blocks.
    pub fn play(&self, plan: Plan) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.commands.send(Command::Play { generation, plan });
    }

    /// Cancels playback. Calling it while idle does nothing.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.commands.send(Command::Stop);
    }

    /// Swaps the samples and key used for resolving notes. Stops playback
    /// first, so an in-flight timeline never sees a different sample set.
    /// `load` runs on the scheduler thread; plans sent afterwards wait for it.
    pub fn load_samples<F>(&self, key: HarpKey, load: F)
    where
        F: FnOnce() -> Arc<SampleSet> + Send + 'static,
    {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.commands.send(Command::SetSamples {
            key,
            load: Box::new(load),
        });
    }

    pub fn events(&self) -> &Receiver<PlaybackEvent> {
        &self.events
    }

    /// Drains every pending event.
    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.events.try_iter().collect()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(PlaybackState::Idle)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Scheduler thread panicked");
            }
        }
    }
}

struct Scheduler {
    transport: Transport,
    sink: Box<dyn SampleSink>,
    samples: Arc<SampleSet>,
    key: HarpKey,
    events: Sender<PlaybackEvent>,
    generation: Arc<AtomicU64>,
    active_generation: u64,
    state: Arc<Mutex<PlaybackState>>,
}

impl Scheduler {
    fn run(&mut self, commands: Receiver<Command>) {
        info!("Scheduler started");
        loop {
            let command = match self.transport.next_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match commands.recv_timeout(wait) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            match command {
                Some(Command::Play { generation, plan }) => {
                    self.cancel();
                    if generation == self.generation.load(Ordering::SeqCst) {
                        self.active_generation = generation;
                        debug!("Starting {:?}", plan);
                        let cues = self.transport.start(plan, Instant::now());
                        self.dispatch(cues);
                    }
                }
                Some(Command::Stop) => self.cancel(),
                Some(Command::SetSamples { key, load }) => {
                    self.cancel();
                    let started = Instant::now();
                    self.key = key;
                    self.samples = load();
                    info!(
                        "Now resolving samples for a {} harp ({} samples, {:?})",
                        key,
                        self.samples.len(),
                        started.elapsed()
                    );
                }
                Some(Command::Shutdown) => {
                    self.cancel();
                    break;
                }
                None => {}
            }

            if self.transport.state() != PlaybackState::Idle {
                let cues = self.transport.poll(Instant::now());
                self.dispatch(cues);
            }
            self.publish_state();
        }
        info!("Scheduler stopped");
    }

    fn cancel(&mut self) {
        if let Some(cue) = self.transport.stop() {
            self.sink.silence();
            self.dispatch(vec![cue]);
        }
        self.publish_state();
    }

    fn dispatch(&mut self, cues: Vec<Cue>) {
        for cue in cues {
            let cancelled = matches!(cue, Cue::Event(PlaybackEvent::Cancelled));
            if !cancelled && self.generation.load(Ordering::SeqCst) != self.active_generation {
                // Superseded while these cues were being dispatched
                if let Some(cancel) = self.transport.stop() {
                    self.sink.silence();
                    self.emit(cancel);
                }
                return;
            }
            self.emit(cue);
        }
    }

    fn emit(&mut self, cue: Cue) {
        match cue {
            Cue::Sound { index, sound, hold } => match sound {
                Sound::Note(tab) => {
                    match self.samples.get(self.key, tab) {
                        Some(sample) => self.sink.trigger(sample, hold),
                        None => {
                            let warning = MissingSampleWarning {
                                key: self.key,
                                tab: tab.file_stem(),
                                index,
                            };
                            warn!("{}", warning);
                            self.send(PlaybackEvent::MissingSample(warning));
                        }
                    }
                    debug!("Note {} ({}) for {:?}", index, tab, hold);
                    self.send(PlaybackEvent::NoteTriggered(index));
                }
                Sound::Rest => {}
                Sound::Click { downbeat } => {
                    self.sink.trigger(self.samples.click(downbeat), hold);
                    self.send(PlaybackEvent::ResponseBeat(index));
                }
            },
            Cue::Event(event) => {
                debug!("Playback event {:?}", event);
                self.send(event);
            }
        }
    }

    fn send(&self, event: PlaybackEvent) {
        // The UI may have gone away; playback itself does not depend on it
        let _ = self.events.send(event);
    }

    fn publish_state(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = self.transport.state();
        }
    }
}
