//! Simulated vehicle, course and referee

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;
use log::{info, warn};
use nalgebra::{UnitQuaternion, Vector3};

use comms_if::eqpt::{flight::YawMode, perception::GateBox};

use super::params::{Clock, Params};
use crate::{course::Gate, drone::DroneState};
use util::convert::Convert;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Longest step taken when following the wall clock
const MAX_SUBSTEP_S: f64 = 0.01;

/// Corners closer to the camera plane than this are not projected
const MIN_PROJECTION_DEPTH_M: f64 = 0.1;

/// Horizontal speed above which the nose follows the direction of travel on a trajectory
const MIN_HEADING_SPEED_MS: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Complete state of the simulation.
pub(super) struct Sim {
    pub params: Params,

    /// Gates of the loaded level, empty until a level is loaded
    pub gates: Vec<Gate>,

    pub level: Option<String>,

    /// Number of pose queries made since the level was loaded
    pub pose_reads: u32,

    pub control_enabled: bool,
    pub armed: bool,
    pub paused: bool,

    pub position_m: Vector3<f64>,
    pub velocity_ms: Vector3<f64>,
    pub yaw_rad: f64,

    pub command: Command,

    pub race: Referee,

    /// Simulated time since the simulation was created
    pub time_s: f64,

    /// Wall clock time the simulation was last advanced to
    last_sync: Option<Instant>,
}

/// Race scoring state.
#[derive(Debug, Clone, Default)]
pub(super) struct Referee {
    pub started: bool,
    pub start_time_s: f64,

    /// Index of the next gate to be crossed
    pub next_gate: usize,

    /// Race time at which each gate was passed
    pub passed_at_s: Vec<Option<f64>>,

    pub gate_missed: bool,
    pub collision: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Command currently being executed by the simulated flight controller.
#[derive(Debug, Clone)]
pub(super) enum Command {
    Hover,

    Spline {
        waypoints_m: Vec<Vector3<f64>>,
        wp_idx: usize,
        vel_max_ms: f64,
        acc_max_mss: f64,
    },

    Velocity {
        vel_ms: Vector3<f64>,
        until_s: f64,
        yaw_mode: YawMode,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Sim {
    pub fn new(params: Params) -> Self {
        let mut sim = Self {
            gates: vec![],
            level: None,
            pose_reads: 0,
            control_enabled: false,
            armed: false,
            paused: false,
            position_m: Vector3::zeros(),
            velocity_ms: Vector3::zeros(),
            yaw_rad: 0.0,
            command: Command::Hover,
            race: Referee::default(),
            time_s: 0.0,
            last_sync: None,
            params,
        };
        sim.reset_vehicle();

        sim
    }

    /// Build the course's gates and place the vehicle at the start.
    pub fn load_level(&mut self, name: &str) {
        self.gates = self.params.gates
            .iter()
            .enumerate()
            .map(|(index, g)| Gate {
                index,
                position_m: g.position_m.convert(),
                orientation: yaw_quat(g.yaw_deg.to_radians()),
            })
            .collect();

        self.level = Some(name.to_string());
        self.pose_reads = 0;
        self.race = Referee::default();
        self.reset_vehicle();

        info!("KinSim level {} loaded with {} gates", name, self.gates.len());
    }

    pub fn reset_vehicle(&mut self) {
        self.position_m = self.params.start_position_m.convert();
        self.velocity_ms = Vector3::zeros();
        self.yaw_rad = self.params.start_yaw_deg.to_radians();
        self.command = Command::Hover;
    }

    pub fn start_race(&mut self) {
        self.race = Referee {
            started: true,
            start_time_s: self.time_s,
            passed_at_s: vec![None; self.gates.len()],
            ..Default::default()
        };
    }

    pub fn race_time_s(&self) -> f64 {
        match self.race.started {
            true => self.time_s - self.race.start_time_s,
            false => 0.0,
        }
    }

    pub fn drone_state(&self) -> DroneState {
        DroneState {
            position_m: self.position_m,
            velocity_ms: self.velocity_ms,
            attitude: yaw_quat(self.yaw_rad),
        }
    }

    /// Advance the simulation for one kinematics query.
    pub fn tick(&mut self) {
        match self.params.clock {
            Clock::Stepped { step_s } => self.step(step_s),
            Clock::RealTime { .. } => self.sync(),
        }
    }

    /// Bring a wall clock simulation up to date, does nothing on a stepped clock.
    pub fn sync(&mut self) {
        let time_scale = match self.params.clock {
            Clock::RealTime { time_scale } => time_scale,
            Clock::Stepped { .. } => return,
        };

        let now = Instant::now();
        let last = self.last_sync.replace(now).unwrap_or(now);
        let mut remaining_s = (now - last).as_secs_f64() * time_scale;

        while remaining_s > 0.0 {
            let dt = remaining_s.min(MAX_SUBSTEP_S);
            self.step(dt);
            remaining_s -= dt;
        }
    }

    /// Integrate the vehicle over `dt` seconds and score any gate crossed.
    pub fn step(&mut self, dt: f64) {
        if self.paused || dt <= 0.0 {
            return;
        }

        if self.armed {
            self.integrate(dt);
        }

        self.time_s += dt;
    }

    /// Boxes of the next gate and the one after it, as seen from the vehicle's camera.
    pub fn detect(&self) -> Vec<GateBox> {
        let next = self.race.next_gate;

        self.gates
            .iter()
            .skip(next)
            .take(2)
            .filter_map(|g| self.project_gate(g))
            .collect()
    }

    fn integrate(&mut self, dt: f64) {
        let tau = self.params.vel_time_constant_s.max(dt);
        let tol = self.params.waypoint_tolerance_m;
        let time_s = self.time_s;

        match self.command {
            Command::Hover => {
                self.velocity_ms += -self.velocity_ms * (dt / tau);
            }
            Command::Spline { ref waypoints_m, ref mut wp_idx, vel_max_ms, acc_max_mss } => {
                // Move on to the next waypoint once this one is reached, the last one is held
                while *wp_idx + 1 < waypoints_m.len()
                    && (waypoints_m[*wp_idx] - self.position_m).norm() < tol
                {
                    *wp_idx += 1;
                }

                let to_wp = waypoints_m[*wp_idx] - self.position_m;
                let dist_m = to_wp.norm();

                // Fly at the speed limit, slowing down to stop on the last waypoint
                let desired = match dist_m > 1e-6 {
                    true => to_wp / dist_m * vel_max_ms.min((2.0 * acc_max_mss * dist_m).sqrt()),
                    false => Vector3::zeros(),
                };

                let mut dv = desired - self.velocity_ms;
                let max_dv = acc_max_mss * dt;
                if dv.norm() > max_dv {
                    dv = dv.normalize() * max_dv;
                }
                self.velocity_ms += dv;

                let v = self.velocity_ms;
                if v.x.hypot(v.y) > MIN_HEADING_SPEED_MS {
                    self.yaw_rad = v.y.atan2(v.x);
                }
            }
            Command::Velocity { vel_ms, until_s, yaw_mode } => {
                let active = time_s < until_s;
                let desired = match active {
                    true => vel_ms,
                    false => Vector3::zeros(),
                };
                self.velocity_ms += (desired - self.velocity_ms) * (dt / tau);

                match yaw_mode {
                    YawMode::RateDegs(r) if active => self.yaw_rad += r.to_radians() * dt,
                    YawMode::AngleDeg(a) => self.yaw_rad = a.to_radians(),
                    _ => (),
                }
            }
        }

        let prev_m = self.position_m;
        self.position_m += self.velocity_ms * dt;

        // Ground contact
        if self.position_m.z > 0.0 {
            self.position_m.z = 0.0;
            self.velocity_ms.z = self.velocity_ms.z.min(0.0);

            if self.race.started && !self.race.collision {
                warn!("KinSim collision with the ground");
                self.race.collision = true;
            }
        }

        self.score_crossing(prev_m, dt);
    }

    /// Check whether the vehicle crossed the next gate's plane during the last step.
    fn score_crossing(&mut self, prev_m: Vector3<f64>, dt: f64) {
        if !self.race.started {
            return;
        }

        let gate = match self.gates.get(self.race.next_gate) {
            Some(g) => g,
            None => return,
        };

        let normal = gate.orientation * Vector3::x();
        let s0 = normal.dot(&(prev_m - gate.position_m));
        let s1 = normal.dot(&(self.position_m - gate.position_m));

        if !(s0 < 0.0 && s1 >= 0.0) {
            return;
        }

        let frac = s0 / (s0 - s1);
        let crossing_m = prev_m + (self.position_m - prev_m) * frac;
        let offset_m = (crossing_m - gate.position_m).norm();
        let time_s = self.race_time_s() + frac * dt;

        if offset_m <= self.params.gate_radius_m {
            info!("KinSim gate {} passed at {:.2} s", gate.index, time_s);
            self.race.passed_at_s[gate.index] = Some(time_s);
        }
        else {
            warn!("KinSim gate {} missed by {:.2} m", gate.index, offset_m);
            self.race.gate_missed = true;
        }

        self.race.next_gate += 1;
    }

    /// Pin-hole projection of the gate's outline into the camera image.
    ///
    /// The camera looks along the body x axis, image x is body y and image y is body z.
    fn project_gate(&self, gate: &Gate) -> Option<GateBox> {
        let p = &self.params;

        if (gate.position_m - self.position_m).norm() > p.detection_range_m {
            return None;
        }

        let world_to_body = yaw_quat(self.yaw_rad).inverse();
        let half = p.gate_size_m / 2.0;
        let sx = 0.5 / (p.hfov_deg.to_radians() / 2.0).tan();
        let sy = 0.5 / (p.vfov_deg.to_radians() / 2.0).tan();

        let mut x_min = std::f64::INFINITY;
        let mut x_max = std::f64::NEG_INFINITY;
        let mut y_min = std::f64::INFINITY;
        let mut y_max = std::f64::NEG_INFINITY;

        for (cy, cz) in &[(-half, -half), (half, -half), (half, half), (-half, half)] {
            let corner_m = gate.position_m + gate.orientation * Vector3::new(0.0, *cy, *cz);
            let b = world_to_body * (corner_m - self.position_m);

            if b.x < MIN_PROJECTION_DEPTH_M {
                return None;
            }

            let u = 0.5 + sx * b.y / b.x;
            let v = 0.5 + sy * b.z / b.x;

            x_min = x_min.min(u);
            x_max = x_max.max(u);
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }

        if x_max < 0.0 || x_min > 1.0 || y_max < 0.0 || y_min > 1.0 {
            return None;
        }

        Some(GateBox {
            y_min: y_min.max(0.0),
            x_min: x_min.max(0.0),
            y_max: y_max.min(1.0),
            x_max: x_max.min(1.0),
            score: 1.0,
        })
    }
}

pub(super) fn yaw_quat(yaw_rad: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad)
}
