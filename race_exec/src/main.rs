//! Main racer executable entry point.
//!
//! # Architecture
//!
//! The racer flies the simulator's course over and over, tuning the motion parameters of each
//! segment between attempts:
//!
//!     - Initialise the session, logging and parameters
//!     - Connect to the simulator bridge:
//!         - Control link, used for the session, flight commands and telemetry
//!         - Perception link, owned by the perception loop
//!     - Survey the course to size the optimiser
//!     - Run episodes until the iteration limit is reached
//!
//! # Modules
//!
//! Cyclic modules stepped by the orchestrator (e.g. `gate_tracker`) provide a public struct
//! implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use log::{error, info};
use structopt::StructOpt;

// Internal
use comms_if::net::NetParams;
use race_lib::{
    cli::Cli,
    episode::{self, survey_course, RaceMgr},
    gate_tracker::{GateTracker, InitData},
    hyper_opt::{self, SegmentOptimiser},
    perception::PerceptionService,
    sim_client::{SimClient, SimDetector},
};
use util::{
    host,
    logger::logger_init,
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cli = Cli::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "race_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(cli.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Gate Racer Executable\n");
    info!("Running on: {}", host::get_host_summary());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut race_params: episode::Params = util::params::load("race_exec.toml")
        .wrap_err("Could not load race_exec params")?;
    cli.apply(&mut race_params);

    let hyper_params: hyper_opt::Params = util::params::load("hyper_opt.toml")
        .wrap_err("Could not load hyper_opt params")?;

    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut tracker = GateTracker::default();
    tracker.init(
        InitData {
            params_path: "gate_tracker.toml",
            vis_servo_params_path: "vis_servo.toml",
        },
        &session
    ).wrap_err("Failed to initialise GateTracker")?;
    info!("GateTracker init complete");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut sim_client = {
        let c = SimClient::connect(&zmq_ctx, &net_params, &race_params.vehicle_name)
            .wrap_err("Failed to initialise SimClient")?;
        info!("SimClient initialised");
        c
    };

    let perception = {
        let d = SimDetector::connect(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise SimDetector")?;
        info!("SimDetector initialised");
        PerceptionService::new(Box::new(d), race_params.perception.clone())
    };

    info!("Network initialisation complete\n");

    // ---- COURSE ----

    let course = survey_course(&mut sim_client, &race_params)
        .wrap_err("Failed to survey the course")?;
    info!(
        "Course {} has {} gates, finish gate {}",
        race_params.level_name,
        course.gates().len(),
        course.finish_idx()
    );

    let optimiser = SegmentOptimiser::from_params(hyper_params, course.num_segments())
        .wrap_err("Failed to initialise the optimiser")?;

    // ---- RUN ----

    let mut race_mgr = RaceMgr::new(
        race_params,
        sim_client,
        perception,
        tracker,
        optimiser,
        &session
    ).wrap_err("Failed to initialise RaceMgr")?;

    let result = race_mgr.run(cli.iterations);

    if let Err(ref e) = result {
        error!("Run aborted: {}", e);
    }

    drop(race_mgr);
    session.exit();

    result.wrap_err("The run was aborted")
}
