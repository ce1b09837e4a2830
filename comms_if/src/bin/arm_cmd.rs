//! Command line command source for the arm executable.
//!
//! Sends a single request to `arm_exec` and prints the response, for example:
//!
//! ```text
//! arm_cmd goto 2.0 -1.5 25.0 --unit cm
//! arm_cmd object cup --command grab
//! arm_cmd gesture wave
//! ```

use comms_if::{
    cmd::{ArmCmd, ArmResponse, ResponseStatus},
    net::{zmq, MonitoredSocket, SocketOptions},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "arm_cmd", about = "Send a command to the arm executable")]
struct Opt {
    /// Command endpoint of the arm executable
    #[structopt(long, default_value = "tcp://localhost:5100")]
    endpoint: String,

    /// How long to wait for the response, in milliseconds
    #[structopt(long, default_value = "5000")]
    timeout_ms: i32,

    /// Keep re-sending the request until the arm arrives or aborts
    #[structopt(long)]
    follow: bool,

    #[structopt(subcommand)]
    cmd: ArmCmd,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    // Create the context for zmq
    let ctx = zmq::Context::new();

    // Set the socket options
    let socket_options = SocketOptions {
        connect_timeout: opt.timeout_ms,
        linger: 1,
        recv_timeout: opt.timeout_ms,
        send_timeout: opt.timeout_ms,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    // Create the socket
    let socket = match MonitoredSocket::new(&ctx, zmq::REQ, socket_options, &opt.endpoint) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not connect to the arm executable at {}", opt.endpoint);
            return Err(e.into());
        }
    };

    let request = opt.cmd.into_request();
    let request_str = serde_json::to_string(&request)?;

    loop {
        socket.send(&request_str, 0)?;

        let response: ArmResponse = match socket.recv_string(0) {
            Ok(Ok(s)) => serde_json::from_str(&s)?,
            Ok(Err(_)) => return Err("the arm executable sent a non UTF-8 response".into()),
            Err(e) => {
                println!("No response from the arm executable: {}", e);
                return Err(e.into());
            }
        };

        println!("{}", response);

        if !opt.follow
            || !response.ok
            || response.is_terminal()
            || response.status == ResponseStatus::Gesture
        {
            break;
        }
    }

    Ok(())
}
