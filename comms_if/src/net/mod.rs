//! # Network Module
//!
//! This module provides networking abstractions over ZMQ, the networking library chosen for the
//! software.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::Ordering,
        atomic::{AtomicBool, AtomicUsize},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the monitor socket, bounds how long the monitor thread takes to notice a
/// shutdown request.
const MONITOR_POLL_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of monitors that are registered. Used to provide unique IDs for each mointor endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoints used by the arm executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Endpoint the arm executable serves command requests on
    pub cmd_endpoint: String,

    /// Endpoint of the arm actuator server's demands socket
    pub mech_dems_endpoint: String,

    /// Endpoint the perception source publishes detections on
    pub perception_endpoint: String,
}

/// A zmq socket which is monitored providing additional information.
///
/// A background thread is run in order to monitor activity on the socket and update visible
/// information to the user. Currently this is only whether or not the socket is actually connected.
pub struct MonitoredSocket {
    socket: Socket,

    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,

    connected: Arc<AtomicBool>,
}

/// Options applied to a [`MonitoredSocket`] when it is created.
///
/// Times are in milliseconds and follow the zmq conventions, `-1` waits forever and `0` returns
/// immediately.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Bind to the endpoint instead of connecting. True for the command and demands servers.
    pub bind: bool,

    /// Wait in [`MonitoredSocket::new`] until the peer is connected or `connect_timeout` passes.
    pub block_on_first_connect: bool,

    /// REQ only, match replies to requests so a late reply to a timed out demand is dropped.
    pub req_correlate: bool,

    /// REQ only, allow a new request after a timed out one.
    pub req_relaxed: bool,

    pub linger: i32,

    pub connect_timeout: i32,

    /// Time after which a recv returns `EAGAIN`.
    pub recv_timeout: i32,

    /// Time after which a send returns `EAGAIN`.
    pub send_timeout: i32,

    /// ZMTP heartbeat period, lets the monitor notice a dead actuator server.
    pub heartbeat_ivl: i32,

    pub heartbeat_timeout: i32,

    pub heartbeat_ttl: i32,

    /// `ZMQ_SUBSCRIBE`: Topic prefix a SUB socket subscribes to. Ignored for other socket types.
    pub subscribe: Option<Vec<u8>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket: {0:?}")]
    CouldNotConnect(Option<zmq::Error>),

    #[error("Could not read event from monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a socket of `socket_type` on `endpoint`, for example `"tcp://localhost:5110"`,
    /// and start the thread that tracks its connection state.
    ///
    /// Fails with [`MonitoredSocketError::CouldNotConnect`] if `block_on_first_connect` is set and
    /// no peer connects within `connect_timeout`.
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str,
    ) -> Result<Self, MonitoredSocketError> {
        // Create atomics
        let shutdown = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));

        // Create socket
        let socket = ctx
            .socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // Create monitor endpoint
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );

        // Enable, create, and connect monitor. The monitor polls with a timeout so that it can
        // notice a shutdown request.
        socket
            .monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx
            .socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor
            .set_rcvtimeo(MONITOR_POLL_TIMEOUT_MS)
            .map_err(|e| MonitoredSocketError::SocketOptionError("set_rcvtimeo".into(), e))?;
        monitor
            .connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        // Set the options on the socket
        socket_options.set(&socket)?;

        // Connect or bind the socket to it's endpoint
        match socket_options.bind {
            false => socket.connect(endpoint),
            true => socket.bind(endpoint),
        }
        .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        // If the block on first connect flag is set wait for the monitor to signal connection, or
        // for the connect timeout to expire
        if socket_options.block_on_first_connect {
            let deadline = match socket_options.connect_timeout {
                t if t > 0 => Some(Instant::now() + Duration::from_millis(t as u64)),
                _ => None,
            };

            loop {
                match read_event(&monitor) {
                    Ok(SocketEvent::CONNECTED) => break,
                    Ok(SocketEvent::CONNECT_DELAYED) | Ok(SocketEvent::CONNECT_RETRIED) => (),
                    Ok(_) => return Err(MonitoredSocketError::CouldNotConnect(None)),
                    Err(zmq::Error::EAGAIN) => (),
                    Err(e) => return Err(MonitoredSocketError::EventReadError(e)),
                }

                if let Some(d) = deadline {
                    if Instant::now() > d {
                        return Err(MonitoredSocketError::CouldNotConnect(None));
                    }
                }
            }

            // Set the connected bool to true here since it must have happend
            connected.store(true, Ordering::Relaxed);
        }

        // Create clones for use by the monitor thread
        let shutdown_clone = shutdown.clone();
        let connected_clone = connected.clone();

        // Spawn the monitor thread
        let join_handle = thread::spawn(move || {
            monitor_socket(monitor, monitor_endpoint, shutdown_clone, connected_clone)
        });

        Ok(Self {
            socket,
            join_handle: Some(join_handle),
            shutdown,
            connected,
        })
    }

    /// Return if the socket is connected or not.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl std::ops::DerefMut for MonitoredSocket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        // Set all the socket options, we use a macro here to make the error handling nice and
        // easy
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_heartbeat_ivl, self.heartbeat_ivl),
            (set_heartbeat_timeout, self.heartbeat_timeout),
            (set_heartbeat_ttl, self.heartbeat_ttl),
            (set_linger, self.linger),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        match socket.get_socket_type() {
            // If the socket is a req type set the req-specific options
            Ok(SocketType::REQ) => {
                set_sockopts!(
                    socket,
                    (set_req_correlate, self.req_correlate),
                    (set_req_relaxed, self.req_relaxed)
                );
            }
            Ok(SocketType::SUB) => {
                let topic: &[u8] = match self.subscribe {
                    Some(ref t) => t,
                    None => b"",
                };
                set_sockopts!(socket, (set_subscribe, topic));
            }
            _ => (),
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // zmq's own defaults, except for the blocking connect
        Self {
            bind: false,
            block_on_first_connect: true,
            connect_timeout: 0,
            heartbeat_ivl: 0,
            heartbeat_timeout: 0,
            heartbeat_ttl: 0,
            linger: 30_000,
            recv_timeout: -1,
            req_correlate: false,
            req_relaxed: false,
            send_timeout: 0,
            subscribe: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket.
///
/// Returns `EAGAIN` if no event arrives within the monitor's receive timeout.
fn read_event(socket: &Socket) -> Result<SocketEvent, zmq::Error> {
    let msg = socket.recv_msg(0)?;

    // Monitor messages come in two frames: event id + value, then the address
    if msg.len() < 2 || !socket.get_rcvmore()? {
        return Err(zmq::Error::EPROTO);
    }
    let event = u16::from_ne_bytes([msg[0], msg[1]]);

    // the address, we'll ignore it
    let _ = socket.recv_msg(0)?;

    Ok(SocketEvent::from_raw(event))
}

fn monitor_socket(
    monitor: Socket,
    monitor_endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
) {
    // So long as the shutdown isn't requested
    while !shutdown.load(Ordering::Relaxed) {
        // Read the next event from the monitor
        let event = match read_event(&monitor) {
            Ok(e) => e,
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                warn!("Error reading event from monitor {}: {}", monitor_endpoint, e);
                connected.store(false, Ordering::Relaxed);
                break;
            }
        };

        // Raise any flags required by the event
        match event {
            SocketEvent::CONNECTED | SocketEvent::ACCEPTED => {
                connected.store(true, Ordering::Relaxed)
            }
            SocketEvent::DISCONNECTED => connected.store(false, Ordering::Relaxed),
            _ => (),
        }
    }
}
