//! Race executable parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};

// Internal
use crate::perception;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the episode orchestrator, loaded from `race_exec.toml`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {

    /// Level loaded at setup
    pub level_name: String,

    /// Race tier passed to the simulator when starting a race
    pub race_tier: u8,

    /// Name of the raced vehicle in the simulator
    pub vehicle_name: String,

    pub takeoff_height_m: f64,

    /// Index of the finish gate, the last gate of the course if not set
    #[serde(default)]
    pub finish_gate_idx: Option<usize>,

    /// Period of the telemetry and control loop
    pub control_period_s: f64,

    /// Period of the perception loop
    pub perception_period_s: f64,

    /// Detections older than this are ignored by the control loop
    pub detection_max_age_s: f64,

    /// Wait after loading a level
    pub load_settle_s: f64,

    /// Wait before starting a race and after resetting the session
    pub reset_settle_s: f64,

    /// Wait after the vehicle has stopped at the end of an episode, before reading the scores
    pub stop_settle_s: f64,

    /// Number of attempts at reading valid gate poses before the run is aborted
    pub gate_pose_attempts: u32,

    /// Wait between two gate pose attempts
    pub gate_pose_retry_s: f64,

    /// An episode is aborted after this many control ticks
    pub max_episode_ticks: u64,

    /// An episode is aborted after this many consecutive failed control ticks
    pub max_link_errors: u32,

    /// Selection policy applied to the detector's boxes
    pub perception: perception::Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            level_name: String::from("Soccer_Field_Easy"),
            race_tier: 1,
            vehicle_name: String::from("drone_1"),
            takeoff_height_m: 2.0,
            finish_gate_idx: None,
            control_period_s: 0.1,
            perception_period_s: 0.03,
            detection_max_age_s: 0.2,
            load_settle_s: 4.0,
            reset_settle_s: 0.5,
            stop_settle_s: 0.5,
            gate_pose_attempts: 10,
            gate_pose_retry_s: 0.5,
            max_episode_ticks: 3000,
            max_link_errors: 5,
            perception: perception::Params::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_finish_gate_optional() {
        let toml_str = r#"
            level_name = "Soccer_Field_Medium"
            race_tier = 1
            vehicle_name = "drone_1"
            takeoff_height_m = 1.5
            control_period_s = 0.1
            perception_period_s = 0.03
            detection_max_age_s = 0.2
            load_settle_s = 4.0
            reset_settle_s = 0.5
            stop_settle_s = 0.5
            gate_pose_attempts = 10
            gate_pose_retry_s = 0.5
            max_episode_ticks = 3000
            max_link_errors = 5

            [perception]
            min_confidence = 0.97
            min_area = 0.01
            max_area = 0.98
        "#;

        let p: Params = util::params::from_str(toml_str).unwrap();
        assert_eq!(p.finish_gate_idx, None);

        let p: Params = util::params::from_str(
            &toml_str.replace("race_tier = 1", "race_tier = 1\nfinish_gate_idx = 11")
        ).unwrap();
        assert_eq!(p.finish_gate_idx, Some(11));
    }
}
