//! # Mechanisms Control Executable
//!
//! This executable is responsible for driving the arm on behalf of the arm executable. Demands
//! are validated, actuated on a simulated arm, and answered with a task id or a rejection.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Mechanisms server abstraction.
mod mech_server;

/// Parameters for the mechanisms executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use comms_if::eqpt::arm::ArmDemsResponse;
use log::{info, trace, warn};
use std::time::{Duration, Instant};

// Internal
use arm_lib::dispatch::{Actuator, SimActuator};
use mech_server::{DemsPoll, MechServer};
use params::MechExecParams;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mech_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Mechanisms Control Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: MechExecParams =
        util::params::load("mech_exec.toml").wrap_err("Could not load mech_exec params")?;

    info!("Parameters loaded");

    // ---- SERVER INITIALISATION ----

    let ctx = comms_if::net::zmq::Context::new();
    let mut server = MechServer::new(&ctx, &params).wrap_err("Failed to initialise server")?;

    info!("Server initialised on {}", params.demands_endpoint);

    let mut arm = SimActuator::new(params.home_pos_m);
    let safe_mode_timeout = Duration::from_millis(params.safe_mode_timeout_ms);

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop in safe mode");

    let mut safe_mode = true;
    let mut last_dems = Instant::now();
    let mut client_connected = false;

    loop {
        if server.is_connected() != client_connected {
            client_connected = !client_connected;
            if client_connected {
                info!("Arm executable connected");
            } else {
                warn!("Arm executable disconnected");
            }
        }

        // Get demands from client
        let response = match server.get_demands() {
            Ok(DemsPoll::Demands(dems)) => {
                trace!("Recieved demands {:?}", dems);

                let response = match arm.send_demands(&dems) {
                    Ok(r) => r,
                    Err(e) => ArmDemsResponse::EqptInvalid(e.to_string()),
                };

                if response.is_ok() {
                    last_dems = Instant::now();
                    if safe_mode {
                        info!("Recieved valid demand, exiting safe mode");
                        safe_mode = false;
                    }
                    info!("Actuating: {}", response.message());
                } else {
                    warn!("Rejected {:?}: {}", dems, response.message());
                }

                response
            }
            Ok(DemsPoll::Invalid(reason)) => {
                warn!("Invalid demands: {}", reason);
                ArmDemsResponse::DemsInvalid(reason)
            }
            Ok(DemsPoll::Nothing) => {
                if !safe_mode && last_dems.elapsed() > safe_mode_timeout {
                    warn!(
                        "No demands for {:.1} s, entering safe mode, holding the arm at {:?} m",
                        safe_mode_timeout.as_secs_f64(),
                        arm.position_m()
                    );
                    safe_mode = true;
                }
                continue;
            }
            Err(e) => return Err(e).wrap_err("Could not recieve demands"),
        };

        // Send response to client
        if let Err(e) = server.send_dems_response(&response) {
            warn!("Couldn't send response to client ({}), entering safe mode", e);
            safe_mode = true;
        }
    }
}
