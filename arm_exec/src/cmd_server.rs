//! # Command Server
//!
//! Receives [`ArmRequest`]s from command sources (the agent loop, `arm_cmd`) and sends the
//! [`ArmResponse`] back. Command sources connect to this server, one request is served at a time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    cmd::{ArmRequest, ArmResponse, ResponseStatus},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How long a call to `recieve_request` waits for a request.
const RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command server
pub struct CmdServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the response to the client: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the client: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the recieved request: {0}")]
    RequestParseError(serde_json::Error),

    #[error("The client sent a message which was not valid UTF-8")]
    NonUtf8Request,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdServer {
    /// Create a new instance of the command server bound to `endpoint`.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, CmdServerError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            recv_timeout: RECV_TIMEOUT_MS,
            send_timeout: 1000,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, endpoint)
            .map_err(CmdServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Check if a command source is connected
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Recieve a single request.
    ///
    /// Returns `Ok(None)` if no request arrived within the receive timeout.
    ///
    /// After recieving a valid request the server must send a response using `.send_response()`
    /// before attempting to recieve another. If the request could not be parsed the failure
    /// response is sent automatically by this function.
    pub fn recieve_request(&self) -> Result<Option<ArmRequest>, CmdServerError> {
        // Attempt to read a string from the socket
        let req_str = match self.socket.recv_string(0) {
            // Valid message
            Ok(Ok(s)) => s,
            // Non UTF-8 message
            Ok(Err(_)) => {
                self.send_response(&ArmResponse::without_pose(
                    false,
                    ResponseStatus::Failed,
                    "Request was not valid UTF-8".into(),
                ))?;

                return Err(CmdServerError::NonUtf8Request);
            }
            // No message in timeout
            Err(zmq::Error::EAGAIN) => return Ok(None),
            // Recieve error, no response is sent if we could not recieve
            Err(e) => return Err(CmdServerError::RecvError(e)),
        };

        match serde_json::from_str(&req_str) {
            Ok(r) => Ok(Some(r)),
            Err(e) => {
                self.send_response(&ArmResponse::without_pose(
                    false,
                    ResponseStatus::Failed,
                    format!("Could not parse the request: {}", e),
                ))?;

                Err(CmdServerError::RequestParseError(e))
            }
        }
    }

    /// Send the given response back to the command source.
    pub fn send_response(&self, response: &ArmResponse) -> Result<(), CmdServerError> {
        // Serialise the response
        let response_str =
            serde_json::to_string(response).map_err(CmdServerError::SerializationError)?;

        // Send the response
        self.socket
            .send(&response_str, 0)
            .map_err(CmdServerError::SendError)
    }
}
