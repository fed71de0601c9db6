//! Main robot-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand acquisition from the script
//!         - Control cycle (see `robot_lib::data_store`):
//!             - Enable line handling
//!             - Sensing
//!             - Telecommand processing
//!             - Automation processing
//!             - Module processing
//!             - Demand output
//!         - Simulated plant step
//!
//! # Modules
//!
//! All modules (e.g. `arm_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::tc::Tc;
use robot_lib::{
    data_store::DataStore,
    params::RobotParams,
    sim::{self, SimPlant},
};
use util::{
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Robot mechanism automation executable, running against the simulated plant.
#[derive(Debug, StructOpt)]
#[structopt(name = "robot_exec")]
struct Opt {
    /// Path to the telecommand script to run
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Sleep between cycles so the loop runs in real time
    #[structopt(long)]
    realtime: bool,

    /// Stop after this many cycles, even if the script has not ended
    #[structopt(long)]
    max_cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("robot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Deep Space Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params = RobotParams::load().wrap_err("Could not load the robot parameters")?;
    let sim_params: sim::Params =
        util::params::load("sim.toml").wrap_err("Could not load the sim parameters")?;

    info!("Parameters loaded");

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", opt.script);

    let mut si = ScriptInterpreter::new(&opt.script).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        si.get_duration(),
        si.get_num_tcs()
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let cycle_period_s = params.exec.cycle_period_s;
    let mut plant = SimPlant::new(sim_params, params.exec.dio);
    let mut ds = DataStore::new(params).wrap_err("Failed to initialise the modules")?;

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- TELECOMMAND ACQUISITION ----

        let loop_time_s = util::time::cycles_to_seconds(ds.num_cycles, cycle_period_s);
        let mut tcs = Vec::new();

        match si.get_pending_tcs(loop_time_s) {
            PendingTcs::None => (),
            PendingTcs::Some(tc_vec) => {
                for tc in tc_vec {
                    // The enable line belongs to the plant, everything else goes to the robot
                    match tc {
                        Tc::Enable => plant.set_enabled(true),
                        Tc::Disable => plant.set_enabled(false),
                        tc => tcs.push(tc),
                    }
                }
            }
            // Exit if end of script reached
            PendingTcs::EndOfScript => {
                info!("End of TC script reached, stopping");
                break;
            }
        }

        // ---- CONTROL CYCLE ----

        {
            let mut hw = plant.hardware();
            ds.run_cycle(&mut hw, &tcs);
        }

        plant.step(cycle_period_s);

        // ---- TELEMETRY ----

        if ds.is_1_hz_cycle {
            match serde_json::to_string(&ds.tm()) {
                Ok(tm) => debug!("TM: {}", tm),
                Err(e) => warn!("Could not serialise telemetry: {}", e),
            }
        }

        // ---- CYCLE MANAGEMENT ----

        if let Some(max_cycles) = opt.max_cycles {
            if ds.num_cycles >= max_cycles {
                info!("Reached {} cycles, stopping", max_cycles);
                break;
            }
        }

        if opt.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                ),
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("Final TM: {}", serde_json::to_string(&ds.tm())?);
    info!("End of execution");

    Ok(())
}
