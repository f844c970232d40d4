//! # Rover Drive Executable
//!
//! This executable is responsible for driving the rover's motion hardware:
//! - The motor controller bus carrying the steer servo and drive motor
//!   controllers
//! - The RC receiver link providing manual override of the vehicle's motion
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Open the motor controller bus and build the chassis over it
//!     - Open the RC receiver link and initialise RC override control
//!     - Run the override loop on its own thread until cancellation
//!
//! Cancellation is cooperative: ctrl-c sets a flag which the loop checks
//! once per bounded read. Other motion sources (operator tooling, future
//! autonomy) drive the same chassis through its mutex.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{info, warn};
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// Internal
use drive_lib::{
    chassis::BusChassis,
    params::DriveExecParams,
    rc_ctrl::{RcCtrl, RcReader},
};
use mctrl_if::{BusParams, DmfeController};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Rover Drive Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let exec_params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load drive_exec params")?;

    info!("Parameters loaded");

    // ---- MOTOR CONTROLLER BUS ----

    let bus_params: BusParams =
        util::params::load("mctrl.toml").wrap_err("Could not load bus params")?;

    let bus = serialport::new(&bus_params.connect.port, bus_params.connect.baud)
        .timeout(Duration::from_secs_f64(bus_params.connect.timeout_s))
        .open()
        .wrap_err_with(|| format!("Failed to open the bus port {:?}", bus_params.connect.port))?;

    let controller = DmfeController::new(bus, bus_params.controller);

    let chassis = BusChassis::new(
        controller,
        util::params::load("chassis.toml").wrap_err("Could not load chassis params")?,
    )
    .wrap_err("Failed to build the chassis")?;

    let chassis = Arc::new(Mutex::new(chassis));

    info!("Chassis initialised on {:?}", bus_params.connect.port);

    // ---- RC OVERRIDE CONTROL ----

    let rc_port = serialport::new(&exec_params.rc_port, exec_params.rc_baud)
        .timeout(Duration::from_secs_f64(exec_params.rc_timeout_s))
        .open()
        .wrap_err_with(|| format!("Failed to open the receiver port {:?}", exec_params.rc_port))?;

    let mut rc_ctrl = RcCtrl::default();
    rc_ctrl
        .init("rc_ctrl.toml")
        .wrap_err("Failed to initialise RcCtrl")?;

    info!("RcCtrl init complete");

    // ---- CANCELLATION ----

    let cancel = Arc::new(AtomicBool::new(false));

    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        handler_cancel.store(true, Ordering::Relaxed);
    })
    .wrap_err("Failed to install the cancellation handler")?;

    // ---- RC OVERRIDE LOOP ----

    info!("Initialisation complete, starting the RC override loop\n");

    let reader = RcReader::new(rc_ctrl, chassis.clone(), cancel.clone());

    let handle = thread::Builder::new()
        .name("rc_ctrl".into())
        .spawn(move || reader.run(BufReader::new(rc_port)))
        .wrap_err("Failed to spawn the RC override loop thread")?;

    // The loop owns the receiver until cancellation or a terminal error; no
    // automatic restart is performed.
    match handle.join() {
        Ok(Ok(())) => info!("RC override loop exited cleanly"),
        Ok(Err(e)) => {
            warn!("RC override loop terminated: {}", e);
            return Err(e).wrap_err("RC override loop terminated");
        }
        Err(_) => return Err(eyre!("The RC override loop thread panicked")),
    }

    info!("Drive executable shutdown complete");

    Ok(())
}
