//! # Episode orchestrator
//!
//! The [`RaceMgr`] flies the course repeatedly, tuning the segment parameters between attempts.
//! Each episode:
//!
//! 1. Starts the race and reads the course's gates, retrying while poses are invalid.
//! 2. Arms the vehicle and takes off, which blocks until the takeoff height is reached.
//! 3. Starts the perception loop and runs the control loop, stepping the gate tracker once per
//!    tick, until the tracker reports the episode finished.
//! 4. Reads the lap record from the referee and hands it to the optimiser, which produces the
//!    parameters for the next episode.
//! 5. Resets the simulation session.
//!
//! Scene changes in the simulator aren't acknowledged, so fixed settle delays follow them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod lap;
pub mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::{
    course::{Course, CourseError, SegmentParams},
    flight_cmd::{CommandHandle, FlightAction, FlightCommander},
    gate_tracker::{
        FinishCause, GateTracker, GateTrackerError, InputData, TelemetrySnapshot,
    },
    hyper_opt::{
        HistoryRecord, HyperOptError, LapRecord, OptimiserStep, RunLog, RunLogEntry,
        SegmentOptimiser,
    },
    interface::{BackendError, RaceBackend},
    mailbox::MailboxReceiver,
    perception::{DetectionSnapshot, PerceptionError, PerceptionService},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::Session,
    time::sleep_s,
};

pub use lap::{acquire_gates, pull_lap_record, survey_course};
pub use params::Params;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Episode orchestrator, generic over the simulator backend.
pub struct RaceMgr<B: RaceBackend> {
    params: Params,

    backend: B,

    perception: PerceptionService,

    tracker: GateTracker,

    optimiser: SegmentOptimiser,

    commander: FlightCommander,

    /// Most recently issued flight command
    last_cmd: Option<CommandHandle>,

    session: Session,

    run_log: RunLog,

    arch_history: Archiver,

    /// Level has been loaded
    is_setup: bool,
}

/// Outcome of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeSummary {
    pub cause: FinishCause,

    /// Number of control ticks flown
    pub ticks: u64,

    pub lap: LapRecord,

    pub step: OptimiserStep,
}

/// Snapshot of the best parameters, saved in the session at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct BestParams {
    pub best_race_time_s: f64,
    pub best_lap: Vec<f64>,
    pub params: Vec<SegmentParams>,
    pub iterations: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RaceMgrError {
    #[error("Simulator error: {0}")]
    Backend(#[from] BackendError),

    #[error("Gate poses still invalid after {0} attempts")]
    GatePoseInvalid(u32),

    #[error("Invalid course: {0}")]
    Course(#[from] CourseError),

    #[error("The optimiser tunes {optimiser} segments but the course has {course}")]
    SegmentCount { optimiser: usize, course: usize },

    #[error("Gate tracker error: {0}")]
    GateTracker(#[from] GateTrackerError),

    #[error("Optimiser error: {0}")]
    HyperOpt(#[from] HyperOptError),

    #[error("Perception error: {0}")]
    Perception(#[from] PerceptionError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Cannot run an episode before setup")]
    NotSetUp,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<B: RaceBackend> RaceMgr<B> {
    /// Create the orchestrator, opening the run log and history archive in the session.
    pub fn new(
        params: Params,
        backend: B,
        perception: PerceptionService,
        tracker: GateTracker,
        optimiser: SegmentOptimiser,
        session: &Session
    ) -> Result<Self, RaceMgrError> {
        let run_log = RunLog::in_session(session)?;
        let arch_history = Archiver::from_path(session, "hyper_opt/history.csv")?;

        Ok(Self {
            params,
            backend,
            perception,
            tracker,
            optimiser,
            commander: FlightCommander::new(),
            last_cmd: None,
            session: session.clone(),
            run_log,
            arch_history,
            is_setup: false,
        })
    }

    /// Load the level.
    pub fn setup(&mut self) -> Result<(), RaceMgrError> {
        info!("Loading level {}", self.params.level_name);

        self.backend.load_level(&self.params.level_name)?;
        sleep_s(self.params.load_settle_s);

        self.is_setup = true;

        Ok(())
    }

    /// Fly one episode and update the optimiser with its lap record.
    pub fn run_episode(&mut self) -> Result<EpisodeSummary, RaceMgrError> {
        if !self.is_setup {
            return Err(RaceMgrError::NotSetUp);
        }

        let iteration = self.optimiser.iteration();
        info!("==== Episode {} ====", iteration);

        // ---- SETUP ----

        self.backend.start_race(self.params.race_tier)?;

        let gates = acquire_gates(
            &mut self.backend,
            self.params.gate_pose_attempts,
            self.params.gate_pose_retry_s
        )?;
        let course = Course::new(gates, self.params.finish_gate_idx)?;

        if course.num_segments() != self.optimiser.num_segments() {
            return Err(RaceMgrError::SegmentCount {
                optimiser: self.optimiser.num_segments(),
                course: course.num_segments(),
            });
        }
        let finish_gate_number = course.finish_idx() + 1;

        self.tracker.begin_episode(course, self.optimiser.current().to_vec())?;
        self.tracker.set_best_race_time(self.optimiser.best_race_time_s());

        // ---- TAKEOFF ----

        self.backend.enable_control()?;
        self.backend.arm()?;
        self.backend.takeoff(self.params.takeoff_height_m)?;
        self.tracker.takeoff_complete()?;

        // ---- CONTROL LOOP ----

        let mut detections = self.perception
            .start(Duration::from_secs_f64(self.params.perception_period_s))?;

        let ticks = self.control_loop(&mut detections, finish_gate_number);

        self.perception.stop();

        let cause = self.tracker.finish_cause().unwrap_or(FinishCause::Aborted);
        info!("Episode {} ended after {} ticks: {}", iteration, ticks, cause);

        // ---- LAP RECORD ----

        sleep_s(self.params.stop_settle_s);

        let lap = pull_lap_record(
            &mut self.backend,
            self.optimiser.num_segments(),
            self.optimiser.params().sentinel_s
        )?;
        info!("Lap record: {:?}", lap.times_s);

        let flown = self.optimiser.current().to_vec();
        let prev_best_s = self.optimiser.best_race_time_s();
        let step = self.optimiser.update(&lap)?;
        self.record(&lap, &step, &flown, cause)?;

        // Snapshot each new best
        if self.optimiser.best_race_time_s() < prev_best_s {
            self.session.save_with_timestamp("hyper_opt/best_params.json", self.best_params());
        }

        // ---- RESET ----

        self.reset_session()?;

        Ok(EpisodeSummary {
            cause,
            ticks,
            lap,
            step,
        })
    }

    /// Run episodes until `max_iterations` have been flown, or forever if `None`.
    ///
    /// The best parameters are saved in the session when the run ends, including when it ends
    /// with an error.
    pub fn run(&mut self, max_iterations: Option<u64>) -> Result<(), RaceMgrError> {
        if !self.is_setup {
            self.setup()?;
        }

        let mut result = Ok(());

        while max_iterations.map(|m| self.optimiser.iteration() < m).unwrap_or(true) {
            if let Err(e) = self.run_episode() {
                error!("Episode {} failed: {}", self.optimiser.iteration(), e);
                result = Err(e);
                break;
            }
        }

        let best = self.best_params();
        info!(
            "Run ended after {} episodes, best race time {:.2} s",
            best.iterations, best.best_race_time_s
        );
        self.session.save("hyper_opt/best_params.json", best);

        result
    }

    pub fn best_params(&self) -> BestParams {
        BestParams {
            best_race_time_s: self.optimiser.best_race_time_s(),
            best_lap: self.optimiser.best_lap().to_vec(),
            params: self.optimiser.best_params().to_vec(),
            iterations: self.optimiser.iteration(),
        }
    }

    pub fn optimiser(&self) -> &SegmentOptimiser {
        &self.optimiser
    }

    pub fn tracker(&self) -> &GateTracker {
        &self.tracker
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Step the tracker until it is finished, returning the number of ticks flown.
    ///
    /// An episode that exceeds its tick budget, or whose backend fails too many ticks in a row,
    /// is aborted with a stop command.
    fn control_loop(
        &mut self,
        detections: &mut MailboxReceiver<DetectionSnapshot>,
        finish_gate_number: usize
    ) -> u64 {
        let period_s = self.params.control_period_s;
        let mut ticks = 0;
        let mut link_errors = 0;

        loop {
            let cycle_start = Instant::now();

            if ticks >= self.params.max_episode_ticks {
                warn!("Episode exceeded {} ticks, aborting", self.params.max_episode_ticks);
                self.abort();
                break;
            }
            ticks += 1;

            match self.control_tick(detections, finish_gate_number) {
                Ok(true) => break,
                Ok(false) => link_errors = 0,
                Err(RaceMgrError::Backend(e)) => {
                    link_errors += 1;
                    warn!("Control tick {} failed: {}", ticks, e);

                    if link_errors >= self.params.max_link_errors {
                        error!("{} consecutive control ticks failed, aborting", link_errors);
                        self.abort();
                        break;
                    }
                }
                Err(e) => {
                    error!("Control tick {} failed: {}", ticks, e);
                    self.abort();
                    break;
                }
            }

            sleep_s(period_s - cycle_start.elapsed().as_secs_f64());
        }

        ticks
    }

    /// One control tick, returns true once the tracker has finished.
    fn control_tick(
        &mut self,
        detections: &mut MailboxReceiver<DetectionSnapshot>,
        finish_gate_number: usize
    ) -> Result<bool, RaceMgrError> {
        // ---- DATA INPUT ----

        let drone = self.backend.kinematics()?;

        let telemetry = TelemetrySnapshot {
            finish_gate_passed: self.backend.gate_passed(finish_gate_number)?,
            gate_missed: self.backend.gate_missed()?,
            collision: self.backend.collision()?,
            race_time_s: self.backend.race_time_s()?,
        };

        let max_age = Duration::from_secs_f64(self.params.detection_max_age_s);
        let detection = detections.latest().and_then(|s| s.fresh(max_age));

        // ---- TRACKER ----

        let input = InputData {
            time_s: telemetry.race_time_s,
            drone,
            detection,
            telemetry,
        };

        let (actions, report) = self.tracker.proc(&input)?;

        if let Err(e) = self.tracker.write() {
            warn!("Could not archive the tracker report: {}", e);
        }

        debug!(
            "t {:.2} s, {}, gate {}, {:.2} m, {:.2} m/s",
            report.time_s, report.state, report.next_gate_idx, report.dist_to_gate_m,
            report.speed_ms
        );

        // ---- FLIGHT COMMANDS ----

        for action in actions.iter() {
            let handle = self.commander.issue(&mut self.backend, action)?;

            if let Some(prev) = self.last_cmd.replace(handle) {
                if prev.is_spline() {
                    debug!("Trajectory {} superseded", prev.generation());
                }
            }
        }

        Ok(self.tracker.is_finished())
    }

    /// Stop the episode and command the vehicle to stop.
    fn abort(&mut self) {
        self.tracker.make_safe();

        let stop = FlightAction::stop(self.tracker.params().stop_duration_s);
        match self.commander.issue(&mut self.backend, &stop) {
            Ok(h) => self.last_cmd = Some(h),
            Err(e) => error!("Could not stop the vehicle: {}", e),
        }
    }

    /// Write the episode to the run log and the history archive.
    fn record(
        &mut self,
        lap: &LapRecord,
        step: &OptimiserStep,
        flown: &[SegmentParams],
        cause: FinishCause
    ) -> Result<(), RaceMgrError> {
        let best_s = self.optimiser.best_race_time_s();

        self.run_log.append(&RunLogEntry {
            iteration: step.iteration,
            best_s,
            cause: cause.to_string(),
            lap,
            best_lap: self.optimiser.best_lap(),
            params: flown,
        })?;

        self.arch_history.serialise(HistoryRecord::new(lap, step, best_s, cause.to_string()))?;

        info!(
            "Episode {}: breakpoint {}, mutating from {}{}, best race time {:.2} s",
            step.iteration,
            step.breakpoint,
            step.start_idx,
            if step.explored { " (explored)" } else { "" },
            best_s
        );

        Ok(())
    }

    /// Put the simulation back to the start of the race.
    fn reset_session(&mut self) -> Result<(), RaceMgrError> {
        debug!("Resetting the simulation session");

        self.backend.pause()?;
        self.backend.reset()?;
        self.backend.unpause()?;
        sleep_s(self.params.reset_settle_s);
        self.backend.reset_race()?;

        self.last_cmd = None;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use crate::{
        gate_tracker,
        hyper_opt::{self, BoundedNoiseMutator},
        interface::{FlightCtrl, GateDetector, SimSession, Telemetry},
        kin_sim::{self, KinSim},
        perception::{self, select_detection},
        vis_servo,
    };

    fn ready_kin_sim(params: kin_sim::Params) -> KinSim {
        let mut sim = KinSim::new(params);
        sim.load_level("kin_sim_test").unwrap();
        sim.start_race(1).unwrap();
        sim.enable_control().unwrap();
        sim.arm().unwrap();
        sim.takeoff(2.0).unwrap();
        sim
    }

    fn session(name: &str) -> Session {
        Session::new_in(name, std::env::temp_dir().join("racer_test_sessions")).unwrap()
    }

    /// Fly the tracker against the kinematic simulation, one simulation step per tick.
    #[test]
    fn test_tracker_flies_kin_sim_course() {
        let mut sim = ready_kin_sim(kin_sim::Params::default());
        let mut detector = sim.detector();

        let course = Course::new(sim.gate_poses().unwrap(), None).unwrap();
        let finish_gate_number = course.finish_idx() + 1;
        let segment_params = vec![SegmentParams { v_ms: 10.0, a_mss: 5.0, d_m: 1.0 }; 3];

        let mut tracker = GateTracker::new(
            gate_tracker::Params::default(),
            vis_servo::Params::default()
        );
        tracker.begin_episode(course, segment_params).unwrap();
        tracker.takeoff_complete().unwrap();

        let commander = FlightCommander::new();
        let perception_params = perception::Params::default();
        let mut next_gate_idx = 0;
        let mut num_advances = 0;

        for _ in 0..1000 {
            let drone = sim.kinematics().unwrap();
            let frame = detector.detect().unwrap();

            let telemetry = TelemetrySnapshot {
                finish_gate_passed: sim.gate_passed(finish_gate_number).unwrap(),
                gate_missed: sim.gate_missed().unwrap(),
                collision: sim.collision().unwrap(),
                race_time_s: sim.race_time_s().unwrap(),
            };

            let (actions, report) = tracker.proc(&InputData {
                time_s: telemetry.race_time_s,
                drone,
                detection: select_detection(&frame.boxes, &perception_params),
                telemetry,
            }).unwrap();

            assert!(tracker.next_gate_idx() >= next_gate_idx);
            assert!(tracker.next_gate_idx() <= next_gate_idx + 1);
            next_gate_idx = tracker.next_gate_idx();
            if report.gate_advanced {
                num_advances += 1;
            }

            for a in actions.iter() {
                commander.issue(&mut sim, a).unwrap();
            }

            if tracker.is_finished() {
                break;
            }
        }

        assert!(tracker.is_finished());
        assert_eq!(tracker.finish_cause(), Some(FinishCause::Finished));
        assert_eq!(num_advances, 3);
        assert!(!sim.gate_missed().unwrap());

        let lap = pull_lap_record(&mut sim, 3, 1000.0).unwrap();
        assert!(lap.times_s.iter().all(|t| *t < 1000.0));
        assert!(lap.times_s.windows(2).all(|w| w[0] < w[1]));
    }

    fn race_mgr(sim_params: kin_sim::Params, name: &str) -> RaceMgr<KinSim> {
        let params = Params {
            level_name: "kin_sim_test".into(),
            control_period_s: 0.002,
            perception_period_s: 0.001,
            detection_max_age_s: 1.0,
            load_settle_s: 0.0,
            reset_settle_s: 0.0,
            stop_settle_s: 0.0,
            gate_pose_retry_s: 0.0,
            max_episode_ticks: 2000,
            ..Default::default()
        };

        let sim = KinSim::new(sim_params);
        let perception = PerceptionService::new(
            Box::new(sim.detector()),
            params.perception.clone()
        );

        let tracker = GateTracker::new(
            gate_tracker::Params::default(),
            vis_servo::Params::default()
        );

        let hyper_params = hyper_opt::Params::default();
        let optimiser = SegmentOptimiser::new(
            hyper_params.clone(),
            hyper_params.initial_vector(3),
            Box::new(BoundedNoiseMutator::new(hyper_params.mutation, 1)),
            ChaCha8Rng::seed_from_u64(2)
        ).unwrap();

        RaceMgr::new(params, sim, perception, tracker, optimiser, &session(name)).unwrap()
    }

    #[test]
    fn test_episodes_update_optimiser() {
        let mut mgr = race_mgr(kin_sim::Params::default(), "race_mgr_episodes");

        assert!(matches!(mgr.run_episode(), Err(RaceMgrError::NotSetUp)));

        mgr.run(Some(2)).unwrap();

        assert_eq!(mgr.optimiser().iteration(), 2);
        assert!(mgr.tracker().is_finished());

        let run_log = std::fs::read_to_string(mgr.run_log.path()).unwrap();
        assert_eq!(run_log.lines().count(), 10);
        assert!(run_log.starts_with("iteration: 0, "));
    }

    #[test]
    fn test_episode_summary() {
        let mut mgr = race_mgr(kin_sim::Params::default(), "race_mgr_summary");
        mgr.setup().unwrap();

        let summary = mgr.run_episode().unwrap();

        assert!(summary.ticks > 0);
        assert_eq!(summary.lap.len(), 3);
        assert_eq!(summary.step.iteration, 0);
        assert_eq!(summary.step.next_params.len(), 3);

        // The session was reset for the next episode
        assert_eq!(mgr.backend_mut().race_time_s().unwrap(), 0.0);
    }

    #[test]
    fn test_gate_pose_retries() {
        let mut sim = KinSim::new(kin_sim::Params {
            invalid_pose_reads: 2,
            ..Default::default()
        });
        sim.load_level("kin_sim_test").unwrap();

        let gates = acquire_gates(&mut sim, 3, 0.0).unwrap();
        assert_eq!(gates.len(), 3);
        assert!(gates.iter().all(|g| g.is_valid()));

        sim.load_level("kin_sim_test").unwrap();
        assert!(matches!(
            acquire_gates(&mut sim, 2, 0.0),
            Err(RaceMgrError::GatePoseInvalid(2))
        ));
    }

    #[test]
    fn test_segment_count_mismatch() {
        let mut mgr = race_mgr(
            kin_sim::Params {
                gates: vec![
                    kin_sim::GateParams { position_m: [10.0, 0.0, -2.0], yaw_deg: 0.0 },
                    kin_sim::GateParams { position_m: [20.0, 0.0, -2.0], yaw_deg: 0.0 },
                ],
                ..Default::default()
            },
            "race_mgr_mismatch"
        );
        mgr.setup().unwrap();

        assert!(matches!(
            mgr.run_episode(),
            Err(RaceMgrError::SegmentCount { optimiser: 3, course: 2 })
        ));
    }

    #[test]
    fn test_detector_shares_simulation() {
        let sim = ready_kin_sim(kin_sim::Params::default());
        let mut det = sim.detector();
        let frame = det.detect().unwrap();
        assert!(!frame.boxes.is_empty());
    }
}
