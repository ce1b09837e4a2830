//! Main arm executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the arm control core and the actuator backend
//!     - Main loop:
//!         - Acquire requests from the command source (remote command sources or a script)
//!         - Handle each request: plan one step, dispatch it, respond
//!
//! Perception runs on its own thread and only updates the detection snapshot used to resolve
//! named object targets.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use arm_lib::{
    arm_ctrl::ArmCtrl,
    cmd_processor::ArmExec,
    cmd_server::{CmdServer, CmdServerError},
    dispatch::{Actuator, ActuatorBackend, Dispatcher, MechClient, SimActuator},
    params::ArmExecParams,
    perception::{PerceptionClient, PerceptionStore},
};
use comms_if::net::NetParams;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingRequests, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which a script is polled for pending requests.
const SCRIPT_POLL_PERIOD_S: f64 = 0.05;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "arm_exec", about = "Arm motion control executable")]
struct Opt {
    /// Run the requests in this script instead of serving remote command sources
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the requests incoming to the exec.
enum CmdSource {
    Remote(CmdServer),
    Script(ScriptInterpreter),
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
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;
    let exec_params: ArmExecParams =
        util::params::load("arm_exec.toml").wrap_err("Could not load exec params")?;
    exec_params
        .validate()
        .wrap_err("Invalid exec params")?;

    info!("Exec parameters loaded");
    debug!("{:#?}", exec_params);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut arm_ctrl = ArmCtrl::default();
    arm_ctrl
        .init("arm_ctrl.toml", &session)
        .wrap_err("Failed to initialise ArmCtrl")?;
    info!("ArmCtrl init complete, arm assumed at {:?} m", arm_ctrl.pose());

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let actuator: Box<dyn Actuator> = match exec_params.backend {
        ActuatorBackend::Sim => {
            info!("Using the simulated actuator");
            Box::new(SimActuator::new(arm_ctrl.params().home_pos_m_rb))
        }
        ActuatorBackend::Real => {
            let c = MechClient::new(
                &zmq_ctx,
                &net_params.mech_dems_endpoint,
                exec_params.actuator_timeout_ms,
            )
            .wrap_err("Failed to initialise MechClient")?;
            info!("MechClient initialised");
            Box::new(c)
        }
    };

    // The client must outlive the main loop since dropping it stops the subscriber
    let (perception_store, _perception_client) = if exec_params.use_perception {
        let store = PerceptionStore::default();
        let c = PerceptionClient::new(&zmq_ctx, &net_params.perception_endpoint, store.clone())
            .wrap_err("Failed to initialise PerceptionClient")?;
        info!("PerceptionClient initialised");
        (Some(store), Some(c))
    } else {
        (None, None)
    };

    let mut cmd_source = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script {:?} lasts {:.02} s and contains {} requests\n",
                si.script_path(),
                si.get_duration(),
                si.get_num_requests()
            );

            CmdSource::Script(si)
        }
        None => {
            let s = CmdServer::new(&zmq_ctx, &net_params.cmd_endpoint)
                .wrap_err("Failed to initialise the CmdServer")?;
            info!(
                "No script provided, serving command sources on {}\n",
                net_params.cmd_endpoint
            );
            CmdSource::Remote(s)
        }
    };

    let exec = ArmExec::new(
        arm_ctrl,
        Dispatcher::new(actuator, exec_params.speed_pct),
        perception_store,
    );

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut source_connected = false;

    loop {
        match cmd_source {
            CmdSource::Remote(ref server) => {
                if server.is_connected() != source_connected {
                    source_connected = server.is_connected();
                    match source_connected {
                        true => info!("Command source connected"),
                        false => warn!("Command source disconnected"),
                    }
                }

                match server.recieve_request() {
                    Ok(Some(req)) => {
                        let response = exec.handle(&req);
                        info!("{}", response);

                        if let Err(e) = server.send_response(&response) {
                            warn!("Could not respond to request: {}", e)
                        }
                    }
                    Ok(None) => (),
                    Err(CmdServerError::RequestParseError(e)) => {
                        warn!("Could not parse recieved request: {}", e)
                    }
                    Err(CmdServerError::NonUtf8Request) => {
                        warn!("Recieved a request which was not valid UTF-8")
                    }
                    Err(e) => {
                        return Err(e)
                            .wrap_err("An error occured while receiving requests from the client")
                    }
                }
            }

            CmdSource::Script(ref mut si) => {
                match si.get_pending(session::get_elapsed_seconds()) {
                    PendingRequests::None => (),
                    PendingRequests::Some(reqs) => {
                        for req in reqs.iter() {
                            info!("{}", exec.handle(req));
                        }
                    }
                    // Exit if end of script reached
                    PendingRequests::EndOfScript => {
                        info!("End of request script reached, stopping");
                        break;
                    }
                }

                thread::sleep(Duration::from_secs_f64(SCRIPT_POLL_PERIOD_S));
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}
