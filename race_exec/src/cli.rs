//! # Command line interface
//!
//! Arguments shared by the racer executables. Anything given on the command line overrides the
//! value in `race_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use structopt::StructOpt;
use util::logger::LevelFilter;

use crate::episode;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(about = "Self-tuning gate racer")]
pub struct Cli {
    /// Level to race
    #[structopt(long)]
    pub level: Option<String>,

    /// Race tier
    #[structopt(long)]
    pub tier: Option<u8>,

    /// Number of episodes to fly, the racer runs until stopped if not given
    #[structopt(short = "n", long)]
    pub iterations: Option<u64>,

    /// Minimum log level, `info` or more verbose
    #[structopt(long, default_value = "info")]
    pub log_level: LevelFilter,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Cli {
    /// Apply the command line overrides to the orchestrator parameters.
    pub fn apply(&self, params: &mut episode::Params) {
        if let Some(ref level) = self.level {
            params.level_name = level.clone();
        }
        if let Some(tier) = self.tier {
            params.race_tier = tier;
        }
    }
}
