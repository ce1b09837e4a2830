//! # Mechanisms Server Module
//!
//! This module abstracts over the networking side of the mechanisms executable. The server accepts
//! connections from the client in the arm executable, allowing demands to be recieved from the
//! client and responses to be sent back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::arm::{ArmDems, ArmDemsResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

use crate::params::MechExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the mechanisms executable.
pub struct MechServer {
    /// REP socket which accepts demands from the client
    dems_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of polling the server for demands.
#[derive(Debug)]
pub enum DemsPoll {
    /// Nothing arrived within the receive timeout
    Nothing,

    /// Valid demands which must be responded to
    Demands(ArmDems),

    /// A message which could not be understood. It must still be responded to.
    Invalid(String),
}

/// Errors which can occur in the [`MechServer`]
#[derive(thiserror::Error, Debug)]
pub enum MechServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not recieve data from the client: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send data to the client: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechServer {
    /// Create a new instance of the mechanisms server.
    ///
    /// This function will not wait for a connection from the client before returning.
    pub fn new(ctx: &zmq::Context, params: &MechExecParams) -> Result<Self, MechServerError> {
        // Create the socket options
        let dems_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: 200,
            send_timeout: 10,
            linger: 1,
            ..Default::default()
        };

        // Create the socket
        let dems_socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            dems_socket_options,
            &params.demands_endpoint,
        )?;

        Ok(Self { dems_socket })
    }

    /// Check if the client is connected
    pub fn is_connected(&self) -> bool {
        self.dems_socket.connected()
    }

    /// Retrieve a set of demands from the client.
    ///
    /// Unless [`DemsPoll::Nothing`] is returned the user MUST call [`send_dems_response`] at the
    /// earliest opportunity in order to notify the client.
    pub fn get_demands(&mut self) -> Result<DemsPoll, MechServerError> {
        // Read from the socket
        let msg = match self.dems_socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Ok(DemsPoll::Invalid("demands were not valid UTF-8".into())),
            Err(zmq::Error::EAGAIN) => return Ok(DemsPoll::Nothing),
            Err(e) => return Err(MechServerError::RecvError(e)),
        };

        match serde_json::from_str(&msg) {
            Ok(d) => Ok(DemsPoll::Demands(d)),
            Err(e) => Ok(DemsPoll::Invalid(format!(
                "could not deserialize demands: {}",
                e
            ))),
        }
    }

    /// Send a response to the client based on the recieved demands.
    pub fn send_dems_response(&mut self, response: &ArmDemsResponse) -> Result<(), MechServerError> {
        // Serialize response
        let resp_str =
            serde_json::to_string(response).map_err(MechServerError::SerializationError)?;

        // Send response
        self.dems_socket
            .send(&resp_str, 0)
            .map_err(MechServerError::SendError)
    }
}
