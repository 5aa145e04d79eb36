//! Optimiser records
//!
//! The run log is an append-only text file with one record per episode, intended to be read by a
//! human. The history record is the same information as a row of the session's CSV archive.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::Serialize;

use super::*;
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Append-only episode log.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

/// One episode of the run log.
#[derive(Debug, Clone)]
pub struct RunLogEntry<'a> {
    pub iteration: u64,

    /// Best complete race time after the episode
    pub best_s: f64,

    /// Why the episode ended
    pub cause: String,

    pub lap: &'a LapRecord,

    pub best_lap: &'a [f64],

    /// Parameters the episode was flown with
    pub params: &'a [SegmentParams],
}

/// One row of the optimiser history archive.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub iteration: u64,
    pub race_time_s: f64,
    pub best_race_time_s: f64,
    pub num_accepted: usize,
    pub breakpoint: usize,
    pub start_idx: usize,
    pub explored: bool,
    pub cause: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RunLog {
    /// Open the run log at the given path, creating it if needed. Existing records are kept.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HyperOptError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(HyperOptError::RunLogError)?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            file,
        })
    }

    /// Open `run_log.txt` in the root of the session.
    pub fn in_session(session: &Session) -> Result<Self, HyperOptError> {
        Self::open(session.session_root.join("run_log.txt"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk.
    pub fn append(&mut self, entry: &RunLogEntry) -> Result<(), HyperOptError> {
        write_entry(&mut self.file, entry).map_err(HyperOptError::RunLogError)
    }
}

fn write_entry<W: Write>(w: &mut W, entry: &RunLogEntry) -> std::io::Result<()> {
    let v: Vec<f64> = entry.params.iter().map(|p| p.v_ms).collect();
    let a: Vec<f64> = entry.params.iter().map(|p| p.a_mss).collect();
    let d: Vec<f64> = entry.params.iter().map(|p| p.d_m).collect();

    writeln!(
        w,
        "iteration: {}, best: {}, cause: {}",
        entry.iteration, entry.best_s, entry.cause
    )?;
    writeln!(w, "time: {:?}, best_lap: {:?}", entry.lap.times_s, entry.best_lap)?;
    writeln!(w, "v: {:?}", v)?;
    writeln!(w, "a: {:?}", a)?;
    writeln!(w, "d: {:?}", d)?;

    w.flush()
}

impl HistoryRecord {
    /// Build the record for an episode from its lap and the optimiser step it produced.
    pub fn new(
        lap: &LapRecord,
        step: &OptimiserStep,
        best_race_time_s: f64,
        cause: String
    ) -> Self {
        Self {
            iteration: step.iteration,
            race_time_s: lap.times_s.last().copied().unwrap_or(std::f64::NAN),
            best_race_time_s,
            num_accepted: step.decisions
                .iter()
                .filter(|d| **d == SegmentDecision::Accepted)
                .count(),
            breakpoint: step.breakpoint,
            start_idx: step.start_idx,
            explored: step.explored,
            cause,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_run_log_appends() {
        let path = std::env::temp_dir().join(format!(
            "racer_run_log_test_{}.txt",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();

        let lap = LapRecord::new(vec![5.0, 1000.0]);
        let params = vec![
            SegmentParams { v_ms: 10.0, a_mss: 5.0, d_m: 1.0 },
            SegmentParams { v_ms: 12.5, a_mss: 6.0, d_m: 1.5 },
        ];
        let entry = RunLogEntry {
            iteration: 3,
            best_s: 1000.0,
            cause: "gate missed".into(),
            lap: &lap,
            best_lap: &[4.5, 1000.0],
            params: &params,
        };

        RunLog::open(&path).unwrap().append(&entry).unwrap();

        // Reopening keeps the existing records
        let mut log = RunLog::open(&path).unwrap();
        log.append(&RunLogEntry { iteration: 4, ..entry.clone() }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "iteration: 3, best: 1000, cause: gate missed");
        assert_eq!(lines[1], "time: [5.0, 1000.0], best_lap: [4.5, 1000.0]");
        assert_eq!(lines[2], "v: [10.0, 12.5]");
        assert_eq!(lines[3], "a: [5.0, 6.0]");
        assert_eq!(lines[4], "d: [1.0, 1.5]");
        assert!(lines[5].starts_with("iteration: 4"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_history_record() {
        let lap = LapRecord::new(vec![5.0, 6.0]);
        let step = OptimiserStep {
            iteration: 2,
            decisions: vec![SegmentDecision::Accepted, SegmentDecision::HardRegressed],
            breakpoint: 1,
            start_idx: 0,
            explored: true,
            next_params: vec![],
        };

        let r = HistoryRecord::new(&lap, &step, 5.5, "finished".into());
        assert_eq!(r.race_time_s, 6.0);
        assert_eq!(r.num_accepted, 1);
        assert!(r.explored);
    }
}
