//! Shoot / don't shoot
//!
//! Projects a random mix of hostile and innocent targets onto the arena.
//! Each round the shooter must hit every hostile target and leave the
//! innocents alone; survivors and bad shoots are announced when the round
//! rolls over. Requires the projector arena; without it the protocol loads
//! in a degraded no-op state and says so.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use super::operations::{ProtocolOps, TargetHandle};
use super::runtime::CancellationToken;
use super::{BoxedProtocol, ProtocolFactory, ProtocolInfo, TrainingProtocol};
use crate::core::shot::{Shot, ShotItemId};
use crate::hits::HitRegion;
use crate::targets::TargetSnapshot;

const ROUND_SECS: u64 = 10;
const SHOOT_TARGET: &str = "shoot_dont_shoot/shoot";
const DONT_SHOOT_TARGET: &str = "shoot_dont_shoot/dont_shoot";

pub struct ShootDontShootFactory;

impl ProtocolFactory for ShootDontShootFactory {
    fn id(&self) -> &'static str {
        "shoot-dont-shoot"
    }

    fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            name: "Shoot Don't Shoot".to_string(),
            version: "1.0".to_string(),
            creator: "dryfire".to_string(),
            description: "Hit the hostile targets on the arena before the \
                          round ends, without shooting the innocents"
                .to_string(),
        }
    }

    fn create(&self, ops: Arc<dyn ProtocolOps>, _targets: &[TargetSnapshot]) -> BoxedProtocol {
        Box::new(ShootDontShoot::new(ops))
    }
}

#[derive(Default)]
struct RoundTargets {
    shoot: Vec<TargetHandle>,
    dont_shoot: Vec<TargetHandle>,
    missed: u32,
    bad_hits: u32,
}

pub struct ShootDontShoot {
    ops: Arc<dyn ProtocolOps>,
    token: CancellationToken,
    state: Arc<Mutex<RoundTargets>>,
    worker: Option<JoinHandle<()>>,
    /// False when the arena was unavailable at load; every callback no-ops
    active: bool,
}

impl ShootDontShoot {
    fn new(ops: Arc<dyn ProtocolOps>) -> Self {
        let token = CancellationToken::new();
        let state = Arc::new(Mutex::new(RoundTargets::default()));

        if !ops.projector_arena_visible() {
            ops.say(
                "Shoot don't shoot requires the projector arena. \
                 Open the arena and load the protocol again.",
            );
            return Self {
                ops,
                token,
                state,
                worker: None,
                active: false,
            };
        }

        Self::place_targets(&ops, &mut state.lock());

        let worker = Some(Self::spawn_round_timer(
            ops.clone(),
            token.clone(),
            state.clone(),
        ));

        Self {
            ops,
            token,
            state,
            worker,
            active: true,
        }
    }

    fn spawn_round_timer(
        ops: Arc<dyn ProtocolOps>,
        token: CancellationToken,
        state: Arc<Mutex<RoundTargets>>,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            loop {
                if token.wait_for(Duration::from_secs(ROUND_SECS)) {
                    break;
                }

                let mut round = state.lock();
                let survivors = round.shoot.len() as u32;
                round.missed += survivors;

                Self::clear_targets(&ops, &mut round);
                Self::place_targets(&ops, &mut round);
                drop(round);

                if survivors > 0 {
                    ops.say(&format!("{} hostile targets missed", survivors));
                }
            }

            log::debug!("Shoot don't shoot round timer exited");
        })
    }

    /// Place a fresh random layout of hostile and innocent targets
    fn place_targets(ops: &Arc<dyn ProtocolOps>, round: &mut RoundTargets) {
        let (width, height) = ops.projector_arena_dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let mut rng = rand::thread_rng();
        let hostiles = rng.gen_range(1..=3);
        let innocents = rng.gen_range(0..=2);

        for _ in 0..hostiles {
            let x = rng.gen_range(0.0..width as f64 * 0.8);
            let y = rng.gen_range(0.0..height as f64 * 0.8);
            if let Some(handle) = ops.add_projector_target(SHOOT_TARGET, x, y) {
                round.shoot.push(handle);
            }
        }

        for _ in 0..innocents {
            let x = rng.gen_range(0.0..width as f64 * 0.8);
            let y = rng.gen_range(0.0..height as f64 * 0.8);
            if let Some(handle) = ops.add_projector_target(DONT_SHOOT_TARGET, x, y) {
                round.dont_shoot.push(handle);
            }
        }
    }

    fn clear_targets(ops: &Arc<dyn ProtocolOps>, round: &mut RoundTargets) {
        for handle in round.shoot.drain(..) {
            ops.delete_projector_target(&handle);
        }
        for handle in round.dont_shoot.drain(..) {
            ops.delete_projector_target(&handle);
        }
    }
}

impl TrainingProtocol for ShootDontShoot {
    fn on_shot(&mut self, _shot: &Shot, _item: ShotItemId, _is_hit: bool) {}

    fn on_hit(&mut self, hit: &HitRegion, _shot: &Shot, _item: ShotItemId) {
        if !self.active {
            return;
        }

        let mut round = self.state.lock();

        match hit.tags.get("subtype") {
            Some("shoot") => {
                if let Some(pos) = round.shoot.iter().position(|h| h.0 == hit.target) {
                    let handle = round.shoot.remove(pos);
                    drop(round);
                    self.ops.delete_projector_target(&handle);
                }
            }
            Some("dont_shoot") => {
                round.bad_hits += 1;
                drop(round);
                self.ops.say("bad shoot");
            }
            _ => {}
        }
    }

    fn reset(&mut self, _targets: &[TargetSnapshot]) {
        if !self.active {
            return;
        }

        let mut round = self.state.lock();
        Self::clear_targets(&self.ops, &mut round);
        round.missed = 0;
        round.bad_hits = 0;
        Self::place_targets(&self.ops, &mut round);
    }

    fn destroy(&mut self) {
        self.token.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        if self.active {
            let mut round = self.state.lock();
            let missed = round.missed + round.shoot.len() as u32;
            let bad_hits = round.bad_hits;
            Self::clear_targets(&self.ops, &mut round);
            drop(round);

            self.ops.say(&format!(
                "Drill over. {} hostile targets missed, {} innocents shot",
                missed, bad_hits
            ));
            self.active = false;
        }
    }
}

impl Drop for ShootDontShoot {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LaserColor;
    use crate::protocols::test_support::RecordingOps;
    use crate::targets::TagMap;

    fn hit(target: &str, subtype: &str) -> HitRegion {
        let mut tags = TagMap::new();
        tags.insert("subtype", subtype);
        tags.set_internal_name(target);
        HitRegion {
            region: crate::targets::RegionId(0),
            target: target.to_string(),
            tags,
        }
    }

    fn shot() -> Shot {
        Shot {
            pos: (0.0, 0.0),
            color: LaserColor::Green,
            timestamp_secs: 0.0,
            marker_radius: 2,
        }
    }

    #[test]
    fn test_degrades_without_arena() {
        let ops = Arc::new(RecordingOps::default());
        let mut protocol = ShootDontShoot::new(ops.clone());

        assert!(!protocol.active);
        assert!(ops.spoken()[0].contains("projector arena"));

        // Callbacks are harmless no-ops in the degraded state
        protocol.on_hit(&hit("target0", "shoot"), &shot(), ShotItemId(0));
        protocol.reset(&[]);
        protocol.destroy();
    }

    #[test]
    fn test_places_targets_on_load() {
        let ops = Arc::new(RecordingOps::with_arena((600, 480)));
        let mut protocol = ShootDontShoot::new(ops.clone());

        assert!(protocol.active);
        assert!(!ops.arena_targets.lock().is_empty());

        protocol.destroy();
        assert!(ops.arena_targets.lock().is_empty());
    }

    #[test]
    fn test_hostile_hit_removes_target() {
        let ops = Arc::new(RecordingOps::with_arena((600, 480)));
        let mut protocol = ShootDontShoot::new(ops.clone());

        let handle = protocol.state.lock().shoot[0].clone();
        protocol.on_hit(&hit(&handle.0, "shoot"), &shot(), ShotItemId(0));

        assert!(!protocol.state.lock().shoot.iter().any(|h| *h == handle));
        assert!(!ops.arena_targets.lock().contains(&handle.0));

        protocol.destroy();
    }

    #[test]
    fn test_innocent_hit_is_penalized() {
        let ops = Arc::new(RecordingOps::with_arena((600, 480)));
        let mut protocol = ShootDontShoot::new(ops.clone());

        protocol.on_hit(&hit("target9", "dont_shoot"), &shot(), ShotItemId(0));
        assert_eq!(protocol.state.lock().bad_hits, 1);
        assert!(ops.spoken().iter().any(|s| s == "bad shoot"));

        protocol.destroy();
    }

    #[test]
    fn test_destroy_announces_score_and_joins_timer() {
        let ops = Arc::new(RecordingOps::with_arena((600, 480)));
        let mut protocol = ShootDontShoot::new(ops.clone());

        let start = std::time::Instant::now();
        protocol.destroy();
        assert!(start.elapsed() < Duration::from_secs(2));

        assert!(ops.spoken().iter().any(|s| s.starts_with("Drill over")));

        // Destroy is idempotent
        protocol.destroy();
    }
}
