//! Training session orchestration
//!
//! The session owns the feed region store, the projector arena, the shot
//! log, and the loaded protocol, and runs the per-shot pipeline: pause and
//! simulation gates, arena remapping, hit resolution, command execution,
//! and protocol dispatch.
//!
//! Shared pieces (arena, shot log, flags, sinks) live behind their own
//! locks so the protocol operations facade can reach them from timer
//! threads without taking the session lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rand::Rng;

use crate::Result;
use crate::audio::{AudioLifecycle, NullAudio, SoundPlayer, SpeechEngine};
use crate::config::AppConfig;
use crate::core::events::{EventCallback, EventHandler, SessionEvent};
use crate::core::shot::{LaserColor, NullShotList, Shot, ShotItemId, ShotListSink, ShotLog};
use crate::hits::{CommandOps, HitRegion, HitResolver};
use crate::projector::{Arena, ArenaMapper, CalibrationBox};
use crate::protocols::operations::{CentroidMode, ProtocolOps, TargetHandle};
use crate::protocols::{ProtocolRegistry, ProtocolRuntime, ProtocolState};
use crate::targets::{RegionRecord, RegionStore, TargetSnapshot, load_target_file};

/// Default projector arena canvas size
const ARENA_DIMENSIONS: (u32, u32) = (600, 480);

/// External services the session talks to
pub struct Collaborators {
    pub speech: Arc<dyn SpeechEngine>,
    pub sound: Arc<dyn SoundPlayer>,
    pub shot_list: Arc<dyn ShotListSink>,
}

impl Default for Collaborators {
    fn default() -> Self {
        let audio = Arc::new(NullAudio);
        Self {
            speech: audio.clone(),
            sound: audio,
            shot_list: Arc::new(NullShotList),
        }
    }
}

/// One operator session: targets, shots, protocol, and arena
pub struct Session {
    config: AppConfig,
    feed: Arc<Mutex<RegionStore>>,
    arena: Arc<Mutex<Arena>>,
    shots: Arc<Mutex<ShotLog>>,
    events: Arc<Mutex<EventHandler>>,
    shot_list: Arc<dyn ShotListSink>,
    speech: Arc<dyn SpeechEngine>,
    sound: Arc<dyn SoundPlayer>,
    paused: Arc<AtomicBool>,
    reset_requested: Arc<AtomicBool>,
    mapper: ArenaMapper,
    registry: ProtocolRegistry,
    runtime: ProtocolRuntime,
    resolver: HitResolver,
    ops: Arc<SessionOps>,
    audio: AudioLifecycle,
    /// -1 means the magazine has not been filled yet
    magazine_rounds: i32,
    calibration_warned: bool,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: AppConfig, collaborators: Collaborators) -> Self {
        let feed = Arc::new(Mutex::new(RegionStore::new()));
        let arena = Arc::new(Mutex::new(Arena::new(
            ARENA_DIMENSIONS.0,
            ARENA_DIMENSIONS.1,
        )));
        let shots = Arc::new(Mutex::new(ShotLog::new()));
        let events = Arc::new(Mutex::new(EventHandler::new()));
        let paused = Arc::new(AtomicBool::new(false));
        let reset_requested = Arc::new(AtomicBool::new(false));

        let mut registry = ProtocolRegistry::new();
        registry.register_builtin();

        let ops = Arc::new(SessionOps {
            feed: feed.clone(),
            arena: arena.clone(),
            shots: shots.clone(),
            shot_list: collaborators.shot_list.clone(),
            events: events.clone(),
            speech: collaborators.speech.clone(),
            sound: collaborators.sound.clone(),
            paused: paused.clone(),
            reset_requested: reset_requested.clone(),
            targets_dir: config.targets_dir.clone(),
        });

        Self {
            config,
            feed,
            arena,
            shots,
            events,
            shot_list: collaborators.shot_list,
            speech: collaborators.speech,
            sound: collaborators.sound,
            paused,
            reset_requested,
            mapper: ArenaMapper::new(),
            registry,
            runtime: ProtocolRuntime::new(),
            resolver: HitResolver::new(),
            ops,
            audio: AudioLifecycle::new(),
            magazine_rounds: -1,
            calibration_warned: false,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared handle to the feed region store (owned by the UI thread)
    pub fn feed_store(&self) -> Arc<Mutex<RegionStore>> {
        self.feed.clone()
    }

    /// Shared handle to the projector arena
    pub fn arena(&self) -> Arc<Mutex<Arena>> {
        self.arena.clone()
    }

    /// Subscribe to session events
    pub fn subscribe(&self, callback: EventCallback) {
        self.events.lock().subscribe(callback);
    }

    /// Snapshot of the session shot log
    pub fn shots(&self) -> Vec<Shot> {
        self.shots.lock().shots().to_vec()
    }

    pub fn pause_shot_detection(&self, pause: bool) {
        self.paused.store(pause, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Load a target definition onto the feed; returns its internal name
    pub fn add_target(&mut self, definition: &str, records: &[RegionRecord]) -> String {
        self.feed.lock().add_target(definition, records)
    }

    pub fn delete_target(&mut self, internal_name: &str) -> bool {
        self.feed.lock().delete_target(internal_name)
    }

    pub fn registry_mut(&mut self) -> &mut ProtocolRegistry {
        &mut self.registry
    }

    pub fn protocol_state(&self) -> ProtocolState {
        self.runtime.state()
    }

    /// Load a training protocol by id, destroying any previous one first
    pub fn load_protocol(&mut self, id: &str) -> Result<()> {
        let targets = self.aggregate_targets();
        let ops: Arc<dyn ProtocolOps> = self.ops.clone();
        self.runtime.load(&self.registry, id, ops, &targets)?;
        self.audio.start();
        Ok(())
    }

    /// Destroy the loaded protocol, reverting its shot list columns
    pub fn unload_protocol(&mut self) {
        self.runtime.unload();
        // Harmless when no protocol ever started the engine
        self.audio.stop();
    }

    /// Snapshot every loaded target on the feed and the arena
    pub fn aggregate_targets(&self) -> Vec<TargetSnapshot> {
        let mut targets = self.feed.lock().aggregate_targets();
        targets.extend(self.arena.lock().aggregate_targets());
        targets
    }

    /// Handle one detected shot in feed (camera) coordinates.
    ///
    /// The whole pipeline runs synchronously: simulation gates, arena
    /// remapping, hit resolution with command execution, then protocol
    /// dispatch (`on_hit` before `on_shot`).
    pub fn handle_shot(&mut self, color: LaserColor, pos: (f64, f64)) {
        if self.paused.load(Ordering::SeqCst) {
            return;
        }
        if self.update_virtual_magazine() {
            return;
        }
        if self.roll_malfunction() {
            return;
        }

        let shot = self
            .shots
            .lock()
            .record(pos, color, self.config.marker_radius);
        let item = self.shot_list.add_shot(&shot);
        self.events
            .lock()
            .emit(&SessionEvent::ShotDetected(shot.clone()));

        let mut command_ops = self.command_ops();

        // Shots inside the calibrated bounding box belong to the arena
        if self.mapper.is_locked() {
            let arena = self.arena.lock();
            if let Some((ax, ay)) = self.mapper.to_arena(pos.0, pos.1, arena.dimensions()) {
                let hit = arena.handle_shot(ax, ay, &mut command_ops);
                drop(arena);

                if let Some(hit) = hit {
                    self.emit_hit(&hit, &shot);
                    self.runtime.handle_shot(&shot, item, Some(&hit));
                    self.poll_reset();
                    return;
                }
                // Arena miss: fall through to feed resolution
            }
        }

        let hit = {
            let feed = self.feed.lock();
            self.resolver.resolve(&feed, pos.0, pos.1, &mut command_ops)
        };

        if let Some(hit) = &hit {
            self.emit_hit(hit, &shot);
        }
        self.runtime.handle_shot(&shot, item, hit.as_ref());
        self.poll_reset();
    }

    /// Debug click-to-shoot: inject a shot without the detector
    pub fn inject_shot(&mut self, color: LaserColor, pos: (f64, f64)) {
        if !self.config.debug {
            return;
        }
        self.handle_shot(color, pos);
    }

    /// Clear shots, reset the protocol with fresh target snapshots, refill
    /// the magazine, and reset arena animations
    pub fn reset(&mut self) {
        self.shots.lock().clear();
        self.shot_list.clear();

        let targets = self.aggregate_targets();
        self.runtime.reset(&targets);

        if self.config.use_virtual_magazine {
            self.magazine_rounds = self.config.virtual_magazine as i32;
        }

        self.arena.lock().reset();
    }

    /// Run a requested reset, if a command or protocol asked for one
    pub fn poll_reset(&mut self) {
        if self.reset_requested.swap(false, Ordering::SeqCst) {
            self.reset();
        }
    }

    /// Record a camera disconnect; the detection loop stops after this
    pub fn camera_disconnected(&mut self, missed_frames: u32) {
        self.events
            .lock()
            .emit(&SessionEvent::CameraDisconnected { missed_frames });
    }

    /// Record that interference was flagged this session
    pub fn interference_detected(&mut self, percent_dark: f64) {
        self.events
            .lock()
            .emit(&SessionEvent::InterferenceDetected { percent_dark });
    }

    /// Commit a calibration lock
    pub fn lock_calibration(&mut self, bbox: CalibrationBox) {
        self.mapper.set_lock(bbox);
    }

    pub fn is_calibrated(&self) -> bool {
        self.mapper.is_locked()
    }

    /// Called when calibration mode is turned off. Warns once if a lock was
    /// never achieved; arena shots will not be detected.
    pub fn finish_calibration(&mut self) {
        if self.mapper.is_locked() || self.calibration_warned {
            return;
        }

        log::warn!("Calibration ended without a lock; arena shots will not be detected");
        self.events.lock().emit(&SessionEvent::CalibrationNeverLocked);
        self.calibration_warned = true;
    }

    fn emit_hit(&self, hit: &HitRegion, shot: &Shot) {
        self.events.lock().emit(&SessionEvent::TargetHit {
            target: hit.target.clone(),
            tags: hit.tags.clone(),
            shot: shot.clone(),
        });
    }

    /// Returns true when the shot was swallowed by an empty magazine
    fn update_virtual_magazine(&mut self) -> bool {
        if !self.config.use_virtual_magazine {
            return false;
        }

        if self.magazine_rounds == -1 {
            self.magazine_rounds = self.config.virtual_magazine as i32;
        }

        if self.magazine_rounds == 0 {
            self.speech.say("reload");
            self.magazine_rounds = self.config.virtual_magazine as i32;
            return true;
        }

        self.magazine_rounds -= 1;
        false
    }

    /// Returns true when the shot was swallowed by a simulated malfunction
    fn roll_malfunction(&mut self) -> bool {
        if !self.config.use_malfunctions {
            return false;
        }

        if rand::thread_rng().gen::<f64>() < self.config.malfunction_probability / 100.0 {
            self.speech.say("malfunction");
            return true;
        }

        false
    }

    fn command_ops(&self) -> SessionCommandOps {
        SessionCommandOps {
            reset_requested: self.reset_requested.clone(),
            sound: self.sound.clone(),
            events: self.events.clone(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.runtime.unload();
        self.audio.stop();
    }
}

/// Side effects available to region commands
struct SessionCommandOps {
    reset_requested: Arc<AtomicBool>,
    sound: Arc<dyn SoundPlayer>,
    events: Arc<Mutex<EventHandler>>,
}

impl CommandOps for SessionCommandOps {
    fn reset(&mut self) {
        self.reset_requested.store(true, Ordering::SeqCst);
    }

    fn play_sound(&mut self, path: &str) {
        self.sound.play(std::path::Path::new(path));
    }

    fn animate(&mut self, target: Option<&str>) {
        self.events.lock().emit(&SessionEvent::Animate {
            target: target.map(|s| s.to_string()),
        });
    }
}

/// The real operations facade handed to protocols.
///
/// Methods only ever take the inner locks (arena, shot log), never the
/// session lock, so protocol timer threads cannot deadlock against the
/// detection pipeline.
struct SessionOps {
    feed: Arc<Mutex<RegionStore>>,
    arena: Arc<Mutex<Arena>>,
    shots: Arc<Mutex<ShotLog>>,
    shot_list: Arc<dyn ShotListSink>,
    events: Arc<Mutex<EventHandler>>,
    speech: Arc<dyn SpeechEngine>,
    sound: Arc<dyn SoundPlayer>,
    paused: Arc<AtomicBool>,
    reset_requested: Arc<AtomicBool>,
    targets_dir: PathBuf,
}

impl ProtocolOps for SessionOps {
    fn say(&self, text: &str) {
        self.speech.say(text);
    }

    fn play_sound(&self, path: &str) {
        self.sound.play(std::path::Path::new(path));
    }

    fn show_text_on_feed(&self, text: &str) {
        self.events
            .lock()
            .emit(&SessionEvent::TextOnFeed(text.to_string()));
    }

    fn add_shot_list_columns(&self, names: &[&str], widths: &[u32]) {
        self.shot_list.add_columns(names, widths);
    }

    fn append_shot_item_values(&self, item: ShotItemId, values: &[String]) {
        self.shot_list.append_values(item, values);
    }

    fn revert_shot_list_columns(&self) {
        self.shot_list.revert_columns();
    }

    fn pause_shot_detection(&self, pause: bool) {
        self.paused.store(pause, Ordering::SeqCst);
    }

    fn clear_shots(&self) {
        self.shots.lock().clear();
        self.shot_list.clear();
    }

    fn reset(&self) {
        self.reset_requested.store(true, Ordering::SeqCst);
    }

    fn projector_arena_visible(&self) -> bool {
        self.arena.lock().is_visible()
    }

    fn add_projector_target(&self, name: &str, x: f64, y: f64) -> Option<TargetHandle> {
        let path = self.targets_dir.join(format!("{}.target", name));
        let records = match load_target_file(&path) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Cannot load projector target '{}': {}", name, e);
                return None;
            }
        };

        let internal = self.arena.lock().add_target_at(name, &records, x, y);
        Some(TargetHandle(internal))
    }

    fn delete_projector_target(&self, handle: &TargetHandle) {
        self.arena.lock().delete_target(&handle.0);
    }

    fn projector_arena_dimensions(&self) -> (u32, u32) {
        self.arena.lock().dimensions()
    }

    fn calculate_target_centroid(&self, target: &str, mode: CentroidMode) -> Option<(f64, f64)> {
        let vertices = mode == CentroidMode::Vertices;

        if let Some(centroid) = self.arena.lock().store().target_centroid(target, vertices) {
            return Some(centroid);
        }
        self.feed.lock().target_centroid(target, vertices)
    }
}
