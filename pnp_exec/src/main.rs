//! Main pick and place executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single task and then exits:
//!
//!     - Initialise the session and logging
//!     - Load the parameters and the task input file
//!     - Load the arm calibration named by the input file
//!     - Connect to the arm (and simulator) and build the backend
//!     - Sequence every object onto the destination stack
//!     - Remove any simulated objects, then report and archive the outcome

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use comms_if::net::{zmq, NetParams};
use pnp_lib::{
    arm_client::ArmClient,
    arm_ctrl::ArmCtrl,
    backend::{DryRunBackend, PhysicalBackend, RobotBackend, SimBackend},
    input::TaskInput,
    params::{BackendKind, PnpExecParams},
    sim_client::SimClient,
    sim_lifecycle::SimObjectLifecycle,
    task_seq::{LogObserver, PhaseObserver, TaskSequencer},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(
    name = "pnp_exec",
    about = "Pick objects from the poses in the input file and stack them on its destination"
)]
struct Opt {
    /// Parameter file, relative to $PNP_SW_ROOT/params
    #[structopt(long, default_value = "pnp_exec.toml")]
    params: String,

    /// Solve and log every motion without connecting to the arm
    #[structopt(long)]
    dry_run: bool,

    /// Task input file
    #[structopt(parse(from_os_str))]
    input: PathBuf,
}

/// Waits for the operator before simulated objects are removed, so the finished stack can be
/// inspected.
struct PauseBeforeCleanup;

impl PhaseObserver for PauseBeforeCleanup {
    fn on_before_cleanup(&mut self) {
        info!("Task complete, press Enter to remove the simulated objects");

        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            warn!("Could not read from stdin, continuing: {}", e);
        }
    }
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
    let session = Session::new("pnp_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Pick and Place Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params: PnpExecParams =
        util::params::load(&opt.params).wrap_err("Could not load the exec params")?;

    info!("Exec parameters loaded");
    debug!("{:#?}", params);

    // ---- LOAD TASK ----

    let task = TaskInput::load(&opt.input)
        .wrap_err_with(|| format!("Could not load the task input file {:?}", opt.input))?;
    task.check_object_count(params.expected_objects)
        .wrap_err("Task input file refused")?;

    info!(
        "Task loaded: {} object(s), destination ({:.2}, {:.2}, {:.2}, {:.2})",
        task.num_objects(),
        task.destination.x_mm,
        task.destination.y_mm,
        task.destination.z_mm,
        task.destination.phi_deg
    );

    let arm_ctrl = ArmCtrl::load(&task.calibration_path).wrap_err_with(|| {
        format!(
            "Could not load the calibration {:?} named by the input file",
            task.calibration_id
        )
    })?;

    info!("Calibration {} loaded", task.calibration_id);

    let objects = task.describe(&params.sim.names, &params.sim.colors);

    // ---- INITIALISE SEQUENCER ----

    let mut sequencer = TaskSequencer::new(params.sequencer_config())
        .wrap_err("Invalid sequencer configuration")?;

    if params.creates_objects() {
        sequencer = sequencer.with_lifecycle(SimObjectLifecycle::new(params.sim.kill_mode));
    }

    sequencer.add_observer(Box::new(LogObserver));
    if params.creates_objects() && params.sim.pause_before_cleanup {
        sequencer.add_observer(Box::new(PauseBeforeCleanup));
    }

    // ---- INITIALISE BACKEND ----

    let zmq_ctx = zmq::Context::new();

    let mut backend: Box<dyn RobotBackend> = if opt.dry_run {
        info!("Dry run, no demands will be sent");
        Box::new(DryRunBackend::new(
            Some(arm_ctrl),
            params.backend == BackendKind::Sim,
        ))
    } else {
        let net_params: NetParams =
            util::params::load("net.toml").wrap_err("Could not load net params")?;

        info!("Initialising network");

        let arm_client = ArmClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the ArmClient")?;
        info!("ArmClient initialised");

        match params.backend {
            BackendKind::Physical => Box::new(PhysicalBackend::new(arm_ctrl, arm_client)),
            BackendKind::Sim => {
                let sim_client = SimClient::new(&zmq_ctx, &net_params)
                    .wrap_err("Failed to initialise the SimClient")?;
                info!("SimClient initialised");

                Box::new(SimBackend::new(arm_ctrl, arm_client, sim_client))
            }
        }
    };

    info!("Using the {} backend\n", backend.name());

    // ---- RUN ----

    let report = sequencer.run(backend.as_mut(), &objects, &task.destination);

    report.log_summary();
    session.save("run_report.json", report.clone());

    // Drop the backend (and its sockets) before the session exits
    drop(backend);
    drop(sequencer);
    session.exit();

    if report.is_success() {
        Ok(())
    } else {
        Err(eyre!(
            "{} of {} objects failed, {} object(s) orphaned",
            report.objects.len() - report.num_completed(),
            report.objects.len(),
            report.orphaned().len()
        ))
    }
}
