//! Timed holster drill
//!
//! A round timer waits a random delay, then issues the "shoot" command over
//! TTS. The shooter draws and fires; the time from command to first shot is
//! recorded as an extra shot list column. Rounds repeat until the protocol
//! is reset or destroyed.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;

use super::operations::ProtocolOps;
use super::runtime::CancellationToken;
use super::{BoxedProtocol, ProtocolFactory, ProtocolInfo, TrainingProtocol};
use crate::core::shot::{Shot, ShotItemId};
use crate::hits::HitRegion;
use crate::targets::TargetSnapshot;

const MIN_DELAY_SECS: u64 = 4;
const MAX_DELAY_SECS: u64 = 8;

pub struct TimedHolsterFactory;

impl ProtocolFactory for TimedHolsterFactory {
    fn id(&self) -> &'static str {
        "timed-holster-drill"
    }

    fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            name: "Timed Holster Drill".to_string(),
            version: "1.1".to_string(),
            creator: "dryfire".to_string(),
            description: "Draw and fire when the shoot command is given; \
                          your draw time is recorded for each shot"
                .to_string(),
        }
    }

    fn create(&self, ops: Arc<dyn ProtocolOps>, _targets: &[TargetSnapshot]) -> BoxedProtocol {
        Box::new(TimedHolsterDrill::new(ops))
    }
}

struct RoundState {
    /// Bumped on every reset; a round armed before the reset cannot score
    generation: u64,
    /// When the current shoot command was given, tagged with its generation
    pull_at: Option<(u64, Instant)>,
}

pub struct TimedHolsterDrill {
    ops: Arc<dyn ProtocolOps>,
    token: CancellationToken,
    round: Arc<Mutex<RoundState>>,
    worker: Option<JoinHandle<()>>,
}

impl TimedHolsterDrill {
    fn new(ops: Arc<dyn ProtocolOps>) -> Self {
        ops.add_shot_list_columns(&["Draw Time"], &[60]);
        ops.say("Timed holster drill loaded. Holster and wait for the shoot command.");

        let token = CancellationToken::new();
        let round = Arc::new(Mutex::new(RoundState {
            generation: 0,
            pull_at: None,
        }));

        let worker = Some(Self::spawn_round_timer(
            ops.clone(),
            token.clone(),
            round.clone(),
        ));

        Self {
            ops,
            token,
            round,
            worker,
        }
    }

    fn spawn_round_timer(
        ops: Arc<dyn ProtocolOps>,
        token: CancellationToken,
        round: Arc<Mutex<RoundState>>,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            loop {
                let delay = rand::thread_rng().gen_range(MIN_DELAY_SECS..=MAX_DELAY_SECS);
                if token.wait_for(Duration::from_secs(delay)) {
                    break;
                }

                {
                    let mut state = round.lock();
                    let generation = state.generation;
                    state.pull_at = Some((generation, Instant::now()));
                }

                ops.say("shoot");
            }

            log::debug!("Timed holster round timer exited");
        })
    }
}

impl TrainingProtocol for TimedHolsterDrill {
    fn on_shot(&mut self, _shot: &Shot, item: ShotItemId, _is_hit: bool) {
        let pull = {
            let mut state = self.round.lock();
            match state.pull_at.take() {
                // A round armed before a reset does not score
                Some((generation, at)) if generation == state.generation => Some(at),
                _ => None,
            }
        };

        if let Some(at) = pull {
            let draw_secs = at.elapsed().as_secs_f64();
            self.ops
                .append_shot_item_values(item, &[format!("{:.2}", draw_secs)]);
        }
    }

    fn on_hit(&mut self, _hit: &HitRegion, _shot: &Shot, _item: ShotItemId) {}

    fn reset(&mut self, _targets: &[TargetSnapshot]) {
        let mut state = self.round.lock();
        state.generation += 1;
        state.pull_at = None;
    }

    fn destroy(&mut self) {
        self.token.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for TimedHolsterDrill {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LaserColor;
    use crate::protocols::test_support::RecordingOps;

    fn shot() -> Shot {
        Shot {
            pos: (10.0, 10.0),
            color: LaserColor::Red,
            timestamp_secs: 0.0,
            marker_radius: 2,
        }
    }

    #[test]
    fn test_registers_draw_time_column_on_load() {
        let ops = Arc::new(RecordingOps::default());
        let drill = TimedHolsterDrill::new(ops.clone());

        assert_eq!(ops.columns.lock().clone(), vec!["Draw Time".to_string()]);
        assert!(!ops.spoken().is_empty());
        drop(drill);
    }

    #[test]
    fn test_destroy_interrupts_round_timer_promptly() {
        let ops = Arc::new(RecordingOps::default());
        let mut drill = TimedHolsterDrill::new(ops.clone());

        // The round timer is mid-wait (4s minimum delay); destroy must not
        // block behind it
        let start = Instant::now();
        drill.destroy();
        assert!(start.elapsed() < Duration::from_secs(2));

        // No callback fires after destroy returns
        let spoken_after_destroy = ops.spoken().len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ops.spoken().len(), spoken_after_destroy);
    }

    #[test]
    fn test_shot_without_pull_command_records_no_draw_time() {
        let ops = Arc::new(RecordingOps::default());
        let mut drill = TimedHolsterDrill::new(ops.clone());

        drill.on_shot(&shot(), ShotItemId(0), false);
        assert!(ops.appended.lock().is_empty());

        drill.destroy();
    }

    #[test]
    fn test_shot_after_pull_records_draw_time_once() {
        let ops = Arc::new(RecordingOps::default());
        let mut drill = TimedHolsterDrill::new(ops.clone());

        drill.round.lock().pull_at = Some((0, Instant::now()));

        drill.on_shot(&shot(), ShotItemId(3), true);
        drill.on_shot(&shot(), ShotItemId(4), true);

        let appended = ops.appended.lock().clone();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].0, 3);

        drill.destroy();
    }

    #[test]
    fn test_reset_discards_in_flight_round() {
        let ops = Arc::new(RecordingOps::default());
        let mut drill = TimedHolsterDrill::new(ops.clone());

        // Arm a round, then reset before the shot arrives
        drill.round.lock().pull_at = Some((0, Instant::now()));
        drill.reset(&[]);

        drill.on_shot(&shot(), ShotItemId(0), true);
        assert!(ops.appended.lock().is_empty());

        drill.destroy();
    }
}
