//! Course acquisition and lap records

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use super::{Params, RaceMgrError};
use crate::{
    course::{Course, Gate},
    hyper_opt::LapRecord,
    interface::{BackendResult, SimSession, Telemetry},
};
use util::{maths::round_dp, time::sleep_s};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read the ground truth gates of the loaded level.
///
/// Gates which are still spawning report invalid poses, so the whole course is read again up to
/// `attempts` times with `retry_s` between attempts. Exhausting the attempts is fatal.
pub fn acquire_gates<S: SimSession + ?Sized>(
    session: &mut S,
    attempts: u32,
    retry_s: f64
) -> Result<Vec<Gate>, RaceMgrError> {
    for attempt in 1..=attempts {
        let gates = session.gate_poses()?;
        let num_invalid = gates.iter().filter(|g| !g.is_valid()).count();

        if num_invalid == 0 {
            info!("Acquired {} gate poses (attempt {})", gates.len(), attempt);
            return Ok(gates);
        }

        warn!(
            "{} of {} gate poses invalid on attempt {}/{}",
            num_invalid, gates.len(), attempt, attempts
        );

        if attempt < attempts {
            sleep_s(retry_s);
        }
    }

    Err(RaceMgrError::GatePoseInvalid(attempts))
}

/// Load the level and read its course, used to size the optimiser before the first episode.
pub fn survey_course<S: SimSession + ?Sized>(
    session: &mut S,
    params: &Params
) -> Result<Course, RaceMgrError> {
    session.load_level(&params.level_name)?;
    sleep_s(params.load_settle_s);

    let gates = acquire_gates(session, params.gate_pose_attempts, params.gate_pose_retry_s)?;

    Ok(Course::new(gates, params.finish_gate_idx)?)
}

/// Build the lap record of the episode just flown from the referee's segment scores.
///
/// Each segment's time is its score time plus penalty, rounded to 0.01 s. Segments which weren't
/// scored hold the sentinel time.
pub fn pull_lap_record<T: Telemetry + ?Sized>(
    telemetry: &mut T,
    num_segments: usize,
    sentinel_s: f64
) -> BackendResult<LapRecord> {
    let mut times_s = Vec::with_capacity(num_segments);

    // The referee numbers gates from 1
    for gate_number in 1..=num_segments {
        let time_s = match telemetry.segment_score(gate_number)? {
            Some(s) => round_dp(s.time_s + s.penalty_s, 2),
            None => sentinel_s,
        };

        times_s.push(time_s);
    }

    Ok(LapRecord::new(times_s))
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::race::SegmentScore;

    /// Referee which scored a fixed set of gates.
    struct Scores(Vec<Option<SegmentScore>>);

    impl Telemetry for Scores {
        fn segment_score(&mut self, gate_number: usize) -> BackendResult<Option<SegmentScore>> {
            Ok(self.0[gate_number - 1])
        }

        fn gate_passed(&mut self, gate_number: usize) -> BackendResult<bool> {
            Ok(self.0[gate_number - 1].is_some())
        }

        fn gate_missed(&mut self) -> BackendResult<bool> {
            Ok(false)
        }

        fn collision(&mut self) -> BackendResult<bool> {
            Ok(false)
        }

        fn race_time_s(&mut self) -> BackendResult<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_pull_lap_record() {
        let mut scores = Scores(vec![
            Some(SegmentScore { time_s: 3.1234, penalty_s: 0.0 }),
            Some(SegmentScore { time_s: 6.0, penalty_s: 1.006 }),
            None,
            Some(SegmentScore { time_s: 9.0, penalty_s: 0.0 }),
        ]);

        let lap = pull_lap_record(&mut scores, 3, 1000.0).unwrap();

        assert_eq!(lap.times_s, vec![3.12, 7.01, 1000.0]);
        assert_eq!(lap.race_time_s(1000.0), None);
    }
}
