//! Gate tracker state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::{
    course::{Course, SegmentParams},
    flight_cmd::FlightAction,
    vis_servo::{self, VisServo},
};
use comms_if::eqpt::flight::SplineCmd;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::lerp,
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The gate tracker.
pub struct GateTracker {
    params: Params,

    vis_servo: VisServo,

    course: Option<Course>,

    /// Parameters under test for this episode, one per segment
    segment_params: Vec<SegmentParams>,

    state: TrackerState,

    next_gate_idx: usize,

    /// Number of ticks processed since takeoff
    ticks_en_route: u64,

    /// Best complete race time so far, used by the slower than best termination
    best_race_time_s: f64,

    finish_cause: Option<FinishCause>,

    report: StatusReport,
    arch_report: Option<Archiver>,
}

/// Parameter files for the tracker and its visual servo.
#[derive(Debug, Copy, Clone)]
pub struct InitData {
    pub params_path: &'static str,
    pub vis_servo_params_path: &'static str,
}

/// Status report for one tracker tick.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    pub state: &'static str,

    pub next_gate_idx: usize,

    /// Distance to the target gate at the start of the tick
    pub dist_to_gate_m: f64,

    pub speed_ms: f64,

    /// The target gate advanced this tick
    pub gate_advanced: bool,

    /// The finish gate was passed this tick
    pub segment_complete: bool,

    pub detection: bool,

    /// The visual servo rejected this tick's input
    pub servo_skipped: bool,

    /// Number of flight commands issued this tick
    pub num_cmds: usize,

    pub finish_cause: Option<FinishCause>,

    pub depth_m: f64,
    pub lat_y: f64,
    pub lat_z: f64,
    pub yaw_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GateTracker {
    fn default() -> Self {
        Self::new(Params::default(), vis_servo::Params::default())
    }
}

impl State for GateTracker {
    const NAME: &'static str = "gate_tracker";

    type InitData = InitData;
    type InitError = GateTrackerError;

    type InputData = InputData;
    type OutputData = Vec<FlightAction>;
    type StatusReport = StatusReport;
    type ProcError = GateTrackerError;

    /// Initialise the tracker from its parameter files and open its archive.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data.params_path)
            .map_err(GateTrackerError::ParamLoadError)?;
        let vis_servo_params: vis_servo::Params = params::load(init_data.vis_servo_params_path)
            .map_err(GateTrackerError::ParamLoadError)?;

        *self = Self::new(params, vis_servo_params);

        self.arch_report = Some(
            Archiver::from_path(session, format!("{}/status_report.csv", Self::NAME))
                .map_err(GateTrackerError::ArchiveError)?
        );

        Ok(())
    }

    /// Process one control tick.
    fn proc(&mut self, input: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport {
            time_s: input.time_s,
            speed_ms: input.drone.speed_ms(),
            detection: input.detection.is_some(),
            ..Default::default()
        };

        let actions = match self.state {
            TrackerState::Idle =>
                return Err(GateTrackerError::InvalidTransition("process a tick", "idle")),
            TrackerState::AwaitingTakeoff =>
                return Err(GateTrackerError::InvalidTransition(
                    "process a tick",
                    "awaiting takeoff"
                )),
            TrackerState::EnRoute(mode) => self.mode_en_route(mode, input),
            TrackerState::Finishing => self.mode_finishing(input),
            TrackerState::Finished => vec![],
        };

        self.report.state = self.state.name();
        self.report.next_gate_idx = self.next_gate_idx;
        self.report.num_cmds = actions.len();
        self.report.finish_cause = self.finish_cause;

        Ok((actions, self.report))
    }

    /// Stop the episode. The caller is responsible for commanding the vehicle to stop.
    fn make_safe(&mut self) {
        if self.state != TrackerState::Finished {
            warn!("GateTracker made safe while {}", self.state.name());
        }

        self.state = TrackerState::Finished;
        self.finish_cause.get_or_insert(FinishCause::Aborted);
    }
}

impl Archived for GateTracker {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.arch_report {
            Some(ref mut a) => a.serialise(self.report),
            None => Ok(()),
        }
    }
}

impl GateTracker {
    /// Create a new tracker without an archive.
    pub fn new(params: Params, vis_servo_params: vis_servo::Params) -> Self {
        Self {
            params,
            vis_servo: VisServo::new(vis_servo_params),
            course: None,
            segment_params: vec![],
            state: TrackerState::Idle,
            next_gate_idx: 0,
            ticks_en_route: 0,
            best_race_time_s: std::f64::INFINITY,
            finish_cause: None,
            report: StatusReport::default(),
            arch_report: None,
        }
    }

    /// Load the course and the segment parameters to fly it with.
    ///
    /// The tracker waits for takeoff afterwards. Any previous episode is discarded.
    pub fn begin_episode(
        &mut self,
        course: Course,
        segment_params: Vec<SegmentParams>
    ) -> Result<(), GateTrackerError> {
        if segment_params.len() != course.num_segments() {
            return Err(GateTrackerError::SegmentParamsLength {
                expected: course.num_segments(),
                found: segment_params.len(),
            });
        }

        self.course = Some(course);
        self.segment_params = segment_params;
        self.state = TrackerState::AwaitingTakeoff;
        self.next_gate_idx = 0;
        self.ticks_en_route = 0;
        self.finish_cause = None;

        Ok(())
    }

    /// Signal that takeoff has completed, the tracker starts flying towards the first gate.
    pub fn takeoff_complete(&mut self) -> Result<(), GateTrackerError> {
        match self.state {
            TrackerState::AwaitingTakeoff => {
                self.state = TrackerState::EnRoute(None);
                info!("Takeoff complete, heading for gate 0");
                Ok(())
            }
            s => Err(GateTrackerError::InvalidTransition("complete takeoff", s.name())),
        }
    }

    /// Set the best complete race time so far.
    pub fn set_best_race_time(&mut self, best_race_time_s: f64) {
        self.best_race_time_s = best_race_time_s;
    }

    /// Index of the gate currently targeted.
    pub fn next_gate_idx(&self) -> usize {
        self.next_gate_idx
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// The approach mode, `None` when not en route.
    pub fn mode(&self) -> Option<ApproachMode> {
        match self.state {
            TrackerState::EnRoute(m) => m,
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == TrackerState::Finished
    }

    pub fn finish_cause(&self) -> Option<FinishCause> {
        self.finish_cause
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The single finish predicate: the referee has latched the finish gate as passed, or the
    /// tracker has itself advanced past it.
    pub fn check_finish(&self, telemetry_finish_passed: bool) -> bool {
        let finish_idx = match self.course {
            Some(ref c) => c.finish_idx(),
            None => return false,
        };

        telemetry_finish_passed || self.next_gate_idx > finish_idx
    }

    fn mode_en_route(
        &mut self,
        mode: Option<ApproachMode>,
        input: &InputData
    ) -> Vec<FlightAction> {
        let (gate_pos, finish_idx) = match self.course {
            Some(ref c) => match c.gate(self.next_gate_idx) {
                Some(g) => (g.position_m, c.finish_idx()),
                None => return self.enter_finishing(FinishCause::Finished),
            },
            None => return self.enter_finishing(FinishCause::Aborted),
        };

        // ---- GATE PROGRESS ----

        let dist_m = (gate_pos - input.drone.position_m).norm();
        self.report.dist_to_gate_m = dist_m;

        let mut advanced = false;
        if dist_m < self.segment_params[self.next_gate_idx].d_m {
            info!("Gate {} passed ({:.2} m)", self.next_gate_idx, dist_m);

            if self.next_gate_idx == finish_idx {
                info!("Finish gate passed, segment complete");
                self.report.segment_complete = true;
            }

            self.next_gate_idx += 1;
            advanced = true;
            self.report.gate_advanced = true;
        }

        // ---- TERMINATION ----

        if self.check_finish(input.telemetry.finish_gate_passed) {
            return self.enter_finishing(FinishCause::Finished);
        }

        if let Some(cause) = self.check_early_termination(input) {
            return self.enter_finishing(cause);
        }

        self.ticks_en_route += 1;

        // ---- CONTROL ----

        let new_mode = match input.detection {
            Some(_) => ApproachMode::VisualServo,
            None => ApproachMode::BlendApproach,
        };
        let entering = mode != Some(new_mode);

        if entering {
            debug!("Approach mode {:?} -> {:?}", mode, new_mode);
        }

        self.state = TrackerState::EnRoute(Some(new_mode));

        match (new_mode, input.detection) {
            (ApproachMode::VisualServo, Some(det)) => {
                if entering || advanced {
                    self.vis_servo.reset(input.drone.speed_ms());
                }

                match self.vis_servo.step(&det, &input.drone, input.time_s) {
                    Ok(cmd) => {
                        let e = self.vis_servo.errors();
                        self.report.depth_m = e.depth_m;
                        self.report.lat_y = e.lat_y;
                        self.report.lat_z = e.lat_z;
                        self.report.yaw_deg = e.yaw_deg;

                        vec![FlightAction::Velocity(cmd)]
                    }
                    Err(e) => {
                        warn!("VisServo skipped tick, holding previous command: {}", e);
                        self.report.servo_skipped = true;
                        vec![]
                    }
                }
            }
            _ => match entering || advanced {
                true => vec![FlightAction::Spline(self.blend_cmd(input))],
                false => vec![],
            },
        }
    }

    fn mode_finishing(&mut self, input: &InputData) -> Vec<FlightAction> {
        if input.drone.speed_ms() < self.params.settle_speed_ms {
            info!("Vehicle settled, episode finished ({:?})", self.finish_cause);
            self.state = TrackerState::Finished;
        }

        vec![]
    }

    fn enter_finishing(&mut self, cause: FinishCause) -> Vec<FlightAction> {
        match cause {
            FinishCause::Finished => info!("Race finished"),
            c => info!("Early termination: {}", c),
        }

        self.state = TrackerState::Finishing;
        self.finish_cause = Some(cause);

        vec![FlightAction::stop(self.params.stop_duration_s)]
    }

    fn check_early_termination(&self, input: &InputData) -> Option<FinishCause> {
        let p = &self.params;
        let t = &input.telemetry;

        if p.terminate_on_gate_missed && t.gate_missed {
            Some(FinishCause::GateMissed)
        }
        else if p.terminate_on_collision && t.collision {
            Some(FinishCause::Collision)
        }
        else if p.terminate_on_slower_than_best && t.race_time_s > self.best_race_time_s {
            Some(FinishCause::SlowerThanBest)
        }
        else if p.terminate_on_stuck
            && self.ticks_en_route > p.stuck_grace_ticks
            && input.drone.speed_ms() < p.stuck_speed_ms
        {
            Some(FinishCause::Stuck)
        }
        else {
            None
        }
    }

    /// Trajectory towards a point between the vehicle and the target gate.
    ///
    /// Only called while en route, so the target gate is within the course.
    fn blend_cmd(&self, input: &InputData) -> SplineCmd {
        let seg = self.segment_params[self.next_gate_idx];

        let gate_pos = self.course
            .as_ref()
            .and_then(|c| c.gate(self.next_gate_idx))
            .map(|g| g.position_m)
            .unwrap_or(input.drone.position_m);

        let p = input.drone.position_m;
        let eta = self.params.blend_eta;
        let target = [
            lerp(p.x, gate_pos.x, eta),
            lerp(p.y, gate_pos.y, eta),
            lerp(p.z, gate_pos.z, eta),
        ];

        SplineCmd {
            waypoints_m: vec![target],
            vel_max_ms: seg.v_ms,
            acc_max_mss: seg.a_mss,
            add_position_constraint: self.params.spline_add_position_constraint,
            add_velocity_constraint: self.params.spline_add_velocity_constraint,
            add_acceleration_constraint: self.params.spline_add_acceleration_constraint,
            replan_from_lookahead: self.params.spline_replan_from_lookahead,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use crate::{course::Gate, drone::DroneState, perception::Detection};

    const SEG: SegmentParams = SegmentParams {
        v_ms: 8.0,
        a_mss: 4.0,
        d_m: 1.0,
    };

    /// Three gates 10 m apart along the x axis
    fn course() -> Course {
        let gates = (0..3)
            .map(|i| Gate {
                index: i,
                position_m: Vector3::new(10.0 * (i + 1) as f64, 0.0, -2.0),
                orientation: UnitQuaternion::identity(),
            })
            .collect();

        Course::new(gates, None).unwrap()
    }

    fn segments() -> Vec<SegmentParams> {
        vec![
            SEG,
            SegmentParams { v_ms: 9.0, ..SEG },
            SegmentParams { v_ms: 10.0, ..SEG },
        ]
    }

    /// A tracker with only the finish causes under test enabled
    fn tracker() -> GateTracker {
        let params = Params {
            terminate_on_stuck: false,
            terminate_on_slower_than_best: false,
            terminate_on_gate_missed: false,
            terminate_on_collision: false,
            ..Default::default()
        };

        let mut t = GateTracker::new(params, vis_servo::Params::default());
        t.begin_episode(course(), segments()).unwrap();
        t.takeoff_complete().unwrap();
        t
    }

    fn input(time_s: f64, x: f64, speed_ms: f64, detection: Option<Detection>) -> InputData {
        InputData {
            time_s,
            drone: DroneState {
                position_m: Vector3::new(x, 0.0, -2.0),
                velocity_ms: Vector3::new(speed_ms, 0.0, 0.0),
                attitude: UnitQuaternion::identity(),
            },
            detection,
            telemetry: TelemetrySnapshot::default(),
        }
    }

    fn det() -> Detection {
        Detection {
            mx: 0.55,
            my: 0.5,
            w: 0.3,
            h: 0.3,
            score: 0.99,
        }
    }

    fn num_splines(actions: &[FlightAction]) -> usize {
        actions.iter().filter(|a| a.is_spline()).count()
    }

    #[test]
    fn test_episode_lifecycle_errors() {
        let mut t = GateTracker::default();
        assert!(t.proc(&input(0.0, 0.0, 0.0, None)).is_err());
        assert!(t.takeoff_complete().is_err());

        assert!(matches!(
            t.begin_episode(course(), vec![SEG]),
            Err(GateTrackerError::SegmentParamsLength { expected: 3, found: 1 })
        ));

        t.begin_episode(course(), segments()).unwrap();
        assert_eq!(t.state(), TrackerState::AwaitingTakeoff);
        assert!(t.proc(&input(0.0, 0.0, 0.0, None)).is_err());

        t.takeoff_complete().unwrap();
        assert_eq!(t.state(), TrackerState::EnRoute(None));
        assert_eq!(t.mode(), None);
    }

    #[test]
    fn test_single_command_on_gate_advance() {
        let mut t = tracker();

        // Entering blend approach issues the first trajectory
        let (a, _) = t.proc(&input(0.0, 8.9, 2.0, None)).unwrap();
        assert_eq!(num_splines(&a), 1);
        assert_eq!(t.mode(), Some(ApproachMode::BlendApproach));

        // Still outside the threshold, the trajectory is left to run
        let (a, r) = t.proc(&input(0.1, 8.95, 2.0, None)).unwrap();
        assert!(a.is_empty());
        assert_eq!(r.next_gate_idx, 0);

        // Crossing the threshold advances the gate and issues exactly one new trajectory
        let (a, r) = t.proc(&input(0.2, 9.05, 2.0, None)).unwrap();
        assert_eq!(t.next_gate_idx(), 1);
        assert!(r.gate_advanced);
        assert_eq!(a.len(), 1);

        match &a[0] {
            FlightAction::Spline(cmd) => {
                // Half way to gate 1 with segment 1's limits
                assert_eq!(cmd.waypoints_m.len(), 1);
                let wp = cmd.waypoints_m[0];
                assert!((wp[0] - 14.525).abs() < 1e-9);
                assert!(wp[1].abs() < 1e-9);
                assert!((wp[2] + 2.0).abs() < 1e-9);
                assert_eq!(cmd.vel_max_ms, 9.0);
                assert_eq!(cmd.acc_max_mss, 4.0);
                assert!(cmd.add_position_constraint);
            }
            other => panic!("Expected a trajectory command, got {:?}", other),
        }

        let (a, _) = t.proc(&input(0.3, 9.5, 2.0, None)).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_progress_monotone_and_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..20 {
            let mut t = tracker();
            let mut prev_idx = t.next_gate_idx();

            for i in 0..200 {
                let x = rng.gen_range(0.0..35.0);
                let det = match rng.gen_bool(0.5) {
                    true => Some(det()),
                    false => None,
                };

                let (_, r) = t.proc(&input(0.1 * i as f64, x, 1.0, det)).unwrap();

                assert!(r.next_gate_idx >= prev_idx);
                assert!(r.next_gate_idx - prev_idx <= 1);
                assert!(r.next_gate_idx <= 3);
                prev_idx = r.next_gate_idx;
            }
        }
    }

    #[test]
    fn test_overlapping_thresholds_advance_one_per_tick() {
        let mut t = tracker();

        // Gate 1 is 10 m on, a threshold covering both gates must still take two ticks
        let wide = SegmentParams { d_m: 25.0, ..SEG };
        t.begin_episode(course(), vec![wide; 3]).unwrap();
        t.takeoff_complete().unwrap();

        t.proc(&input(0.0, 15.0, 2.0, None)).unwrap();
        assert_eq!(t.next_gate_idx(), 1);
        t.proc(&input(0.1, 15.0, 2.0, None)).unwrap();
        assert_eq!(t.next_gate_idx(), 2);
    }

    #[test]
    fn test_visual_servo_mode() {
        let mut t = tracker();

        let (a, r) = t.proc(&input(0.0, 5.0, 2.0, Some(det()))).unwrap();
        assert_eq!(t.mode(), Some(ApproachMode::VisualServo));
        assert!(matches!(a.as_slice(), [FlightAction::Velocity(_)]));
        assert!(r.depth_m > 0.0);

        // A command every tick while the gate is seen
        let (a, _) = t.proc(&input(0.1, 5.5, 2.0, Some(det()))).unwrap();
        assert_eq!(a.len(), 1);

        // Losing the gate switches to the blend approach once
        let (a, _) = t.proc(&input(0.2, 6.0, 2.0, None)).unwrap();
        assert_eq!(num_splines(&a), 1);
        let (a, _) = t.proc(&input(0.3, 6.5, 2.0, None)).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_advance_resets_visual_servo() {
        let mut t = tracker();

        t.proc(&input(0.0, 5.0, 2.0, Some(det()))).unwrap();
        t.proc(&input(0.1, 7.0, 2.0, Some(det()))).unwrap();

        // Advancing gives the same command as a freshly reset controller
        let crossing = input(0.2, 9.5, 3.0, Some(Detection { mx: 0.6, ..det() }));
        let (a, r) = t.proc(&crossing).unwrap();
        assert!(r.gate_advanced);

        let mut fresh = VisServo::new(vis_servo::Params::default());
        fresh.reset(3.0);
        let expected = fresh.step(&crossing.detection.unwrap(), &crossing.drone, 0.2).unwrap();

        assert_eq!(a, vec![FlightAction::Velocity(expected)]);
    }

    #[test]
    fn test_degenerate_detection_holds_command() {
        let mut t = tracker();

        t.proc(&input(0.0, 5.0, 2.0, Some(det()))).unwrap();
        let (a, r) = t.proc(&input(0.1, 5.2, 2.0, Some(Detection { w: 0.0, ..det() }))).unwrap();

        assert!(a.is_empty());
        assert!(r.servo_skipped);
        assert_eq!(t.mode(), Some(ApproachMode::VisualServo));
    }

    #[test]
    fn test_finish_by_local_advance() {
        let mut t = tracker();

        t.proc(&input(0.0, 9.5, 5.0, None)).unwrap();
        t.proc(&input(0.1, 19.5, 5.0, None)).unwrap();
        let (a, r) = t.proc(&input(0.2, 29.5, 5.0, None)).unwrap();

        assert!(r.segment_complete);
        assert_eq!(t.state(), TrackerState::Finishing);
        assert_eq!(t.finish_cause(), Some(FinishCause::Finished));
        assert_eq!(a, vec![FlightAction::stop(1.0)]);

        // The stop is latched, no more commands while slowing down
        let (a, _) = t.proc(&input(0.3, 30.0, 2.0, Some(det()))).unwrap();
        assert!(a.is_empty());
        assert!(!t.is_finished());

        let (a, r) = t.proc(&input(0.4, 30.1, 0.2, Some(det()))).unwrap();
        assert!(a.is_empty());
        assert!(t.is_finished());
        assert_eq!(r.state, "Finished");

        let (a, _) = t.proc(&input(0.5, 30.1, 0.0, None)).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_finish_by_telemetry_latch() {
        let mut t = tracker();

        t.proc(&input(0.0, 9.5, 5.0, None)).unwrap();
        assert_eq!(t.next_gate_idx(), 1);

        let mut i = input(0.1, 15.0, 5.0, None);
        i.telemetry.finish_gate_passed = true;

        let (a, _) = t.proc(&i).unwrap();
        assert_eq!(a, vec![FlightAction::stop(1.0)]);
        assert_eq!(t.finish_cause(), Some(FinishCause::Finished));
        assert!(t.check_finish(true));
    }

    #[test]
    fn test_early_termination() {
        let params = Params {
            stuck_grace_ticks: 2,
            ..Default::default()
        };

        // Stuck, only after the grace period
        let mut t = GateTracker::new(params.clone(), vis_servo::Params::default());
        t.begin_episode(course(), segments()).unwrap();
        t.takeoff_complete().unwrap();

        for i in 0..3 {
            t.proc(&input(0.1 * i as f64, 0.0, 0.0, None)).unwrap();
            assert!(matches!(t.state(), TrackerState::EnRoute(_)));
        }
        let (a, _) = t.proc(&input(0.3, 0.0, 0.0, None)).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(t.finish_cause(), Some(FinishCause::Stuck));

        // Missed gate
        let mut t = GateTracker::new(params.clone(), vis_servo::Params::default());
        t.begin_episode(course(), segments()).unwrap();
        t.takeoff_complete().unwrap();
        let mut i = input(0.0, 0.0, 3.0, None);
        i.telemetry.gate_missed = true;
        t.proc(&i).unwrap();
        assert_eq!(t.finish_cause(), Some(FinishCause::GateMissed));

        // Slower than the best race
        let mut t = GateTracker::new(params, vis_servo::Params::default());
        t.begin_episode(course(), segments()).unwrap();
        t.set_best_race_time(20.0);
        t.takeoff_complete().unwrap();
        let mut i = input(0.0, 0.0, 3.0, None);
        i.telemetry.race_time_s = 19.0;
        t.proc(&i).unwrap();
        assert!(t.finish_cause().is_none());
        i.telemetry.race_time_s = 20.5;
        t.proc(&i).unwrap();
        assert_eq!(t.finish_cause(), Some(FinishCause::SlowerThanBest));
    }

    #[test]
    fn test_make_safe() {
        let mut t = tracker();
        t.proc(&input(0.0, 0.0, 2.0, None)).unwrap();
        t.make_safe();

        assert!(t.is_finished());
        assert_eq!(t.finish_cause(), Some(FinishCause::Aborted));
    }
}
