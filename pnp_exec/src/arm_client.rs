//! # Arm Client
//!
//! This module provides networking abstractions to connect to the arm server. The server only
//! replies once a demand has been carried out, so every call blocks until the motion completes or
//! the dispatch timeout elapses.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use comms_if::{
    eqpt::{ArmDems, ArmRequest, ArmResponse, GripperDems},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ArmClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ArmClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not send the request to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("The server did not respond within the dispatch timeout")]
    Timeout,

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmClient {
    /// Create a new instance of the arm client.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, ArmClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            params.req_socket_options(),
            &params.arm_endpoint,
        )
        .map_err(ArmClientError::SocketError)?;

        Ok(Self { socket })
    }

    /// Send joint demands to the server and wait for the motion to complete.
    pub fn send_demands(&mut self, demands: &ArmDems) -> Result<ArmResponse, ArmClientError> {
        self.request(&ArmRequest::Move(demands.clone()))
    }

    /// Send gripper demands to the server and wait for the gripper to finish moving.
    pub fn send_gripper(&mut self, demands: &GripperDems) -> Result<ArmResponse, ArmClientError> {
        self.request(&ArmRequest::Gripper(*demands))
    }

    fn request(&mut self, request: &ArmRequest) -> Result<ArmResponse, ArmClientError> {
        // If not connected return now
        if !self.socket.connected() {
            return Err(ArmClientError::NotConnected);
        }

        let req_str =
            serde_json::to_string(request).map_err(ArmClientError::SerializationError)?;

        trace!("ArmClient sending {}", req_str);

        self.socket.send(&req_str, 0).map_err(|e| match e {
            zmq::Error::EAGAIN => ArmClientError::Timeout,
            e => ArmClientError::SendError(e),
        })?;

        // Recieve response back from the server
        match self.socket.recv_msg(0) {
            Ok(m) => serde_json::from_str(m.as_str().unwrap_or(""))
                .map_err(ArmClientError::DeserializeError),
            Err(zmq::Error::EAGAIN) => Err(ArmClientError::Timeout),
            Err(e) => Err(ArmClientError::RecvError(e)),
        }
    }
}
