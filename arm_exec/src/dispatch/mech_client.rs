//! # Mechanisms Client
//!
//! This module provides networking abstractions to connect to the mechanisms server.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::arm::{ArmDems, ArmDemsResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

use super::{Actuator, ActuatorError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct MechClient {
    dems_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MechClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not send demands to the server: {0}")]
    SendError(zmq::Error),

    #[error("The server did not respond within {0} ms")]
    Timeout(i32),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("The server sent a message which was not valid UTF-8")]
    NonUtf8Response,

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechClient {
    /// Create a new instance of the mechanisms client.
    ///
    /// This function will not block until the server connects. `timeout_ms` bounds both sending
    /// demands and waiting for the response.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        timeout_ms: i32,
    ) -> Result<Self, MechClientError> {
        // Create the socket options
        let dems_socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: timeout_ms,
            send_timeout: timeout_ms,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        // Create the socket
        let dems_socket = MonitoredSocket::new(ctx, zmq::REQ, dems_socket_options, endpoint)
            .map_err(MechClientError::SocketError)?;

        Ok(Self { dems_socket })
    }

    fn timeout_ms(&self) -> i32 {
        self.dems_socket.get_rcvtimeo().unwrap_or(-1)
    }
}

impl Actuator for MechClient {
    /// Send demands to the server.
    ///
    /// If the server acknowledges the demands within the configured timeout then its response
    /// is returned, otherwise an error is returned. A request which timed out is abandoned, the
    /// socket is relaxed so the next request can be sent straight away.
    fn send_demands(&mut self, demands: &ArmDems) -> Result<ArmDemsResponse, ActuatorError> {
        // If not connected return now
        if !self.dems_socket.connected() {
            return Err(MechClientError::NotConnected.into());
        }

        // Serialize the demands
        let dems_str =
            serde_json::to_string(demands).map_err(MechClientError::SerializationError)?;

        // Send the demands to the server
        self.dems_socket.send(&dems_str, 0).map_err(|e| match e {
            zmq::Error::EAGAIN => MechClientError::Timeout(self.timeout_ms()),
            e => MechClientError::SendError(e),
        })?;

        // Recieve response back from the server
        let msg = match self.dems_socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(MechClientError::NonUtf8Response.into()),
            Err(zmq::Error::EAGAIN) => {
                return Err(MechClientError::Timeout(self.timeout_ms()).into())
            }
            Err(e) => return Err(MechClientError::RecvError(e).into()),
        };

        serde_json::from_str(&msg)
            .map_err(|e| MechClientError::DeserializeError(e).into())
    }
}
