//! # Race Equipment Communications Module
//!
//! Session control and race telemetry provided by the simulator. Gate scoring on the simulator
//! side is 1-based: the segment ending at gate index `g` is scored as gate `g + 1`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Ground truth pose of a gate object in the level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatePose {
    /// Object name of the gate in the level, e.g. `Gate04_23`
    pub name: String,

    pub position_m: [f64; 3],

    /// `[w, x, y, z]`
    pub orientation_q: [f64; 4],
}

/// Score the simulator awarded a single segment.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentScore {
    /// Elapsed race time at which the segment was completed
    pub time_s: f64,

    /// Penalty added by the referee for the segment
    pub penalty_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Requests sent to the race side of the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RaceRequest {
    LoadLevel { name: String },

    StartRace { tier: u8 },

    ResetRace,

    Pause,

    Unpause,

    /// Reset the whole simulation, including vehicle state
    Reset,

    /// Names of all gate objects in the level, in no particular order
    ListGates,

    GetGatePose { name: String },

    /// Score of the segment ending at the given 1-based gate number
    GetSegmentScore { gate: usize },

    /// Has the given 1-based gate been passed
    GetGatePassed { gate: usize },

    GetGateMissed,

    GetCollision,

    GetRaceTime,
}

/// Responses from the race side of the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RaceResponse {
    Ok,

    GateNames(Vec<String>),

    GatePose(GatePose),

    /// `None` if the segment hasn't been scored
    SegmentScore(Option<SegmentScore>),

    Flag(bool),

    RaceTime(f64),

    Error(String),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the course order of a gate from its object name.
///
/// Gate objects are named `Gate<NN>_<suffix>`, where `NN` is the order of the gate along the
/// course. Returns `None` for objects not following the convention.
pub fn gate_order(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("Gate")?;
    let digits = rest.split('_').next()?;

    digits.parse().ok()
}

/// Sort gate names into course order, dropping names that don't follow the gate convention.
pub fn sort_gate_names(names: &[String]) -> Vec<String> {
    let mut ordered: Vec<(u32, &String)> = names
        .iter()
        .filter_map(|n| gate_order(n).map(|o| (o, n)))
        .collect();

    ordered.sort_by_key(|(o, _)| *o);

    ordered.into_iter().map(|(_, n)| n.clone()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gate_order() {
        assert_eq!(gate_order("Gate04_23"), Some(4));
        assert_eq!(gate_order("Gate10_7"), Some(10));
        assert_eq!(gate_order("Gate3"), Some(3));
        assert_eq!(gate_order("Drone_1"), None);
        assert_eq!(gate_order("GateXX_1"), None);
    }

    #[test]
    fn test_sort_gate_names() {
        let names: Vec<String> = vec!["Gate10_2", "Gate02_9", "StartBlock", "Gate01_11"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(
            sort_gate_names(&names),
            vec!["Gate01_11".to_string(), "Gate02_9".into(), "Gate10_2".into()]
        );
    }

    #[test]
    fn test_request_json() {
        let s = serde_json::to_string(&RaceRequest::GetSegmentScore { gate: 2 }).unwrap();
        assert_eq!(s, r#"{"GetSegmentScore":{"gate":2}}"#);

        let r: RaceResponse = serde_json::from_str(r#"{"SegmentScore":null}"#).unwrap();
        assert_eq!(r, RaceResponse::SegmentScore(None));
    }
}
