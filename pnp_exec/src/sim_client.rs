//! # Simulation Client
//!
//! Creates and removes objects in the simulator through its object service. Unlike the arm client
//! this is only used when running against the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use comms_if::{
    eqpt::{ObjectPose, SimObjectRequest, SimObjectResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
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

impl SimClient {
    /// Create a new instance of the SimClient.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SimClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            params.req_socket_options(),
            &params.sim_endpoint,
        )
        .map_err(SimClientError::SocketError)?;

        Ok(Self { socket })
    }

    /// Ask the simulator to create an object.
    pub fn spawn(
        &mut self,
        name: &str,
        color: &str,
        pose: ObjectPose,
    ) -> Result<SimObjectResponse, SimClientError> {
        self.request(&SimObjectRequest::Spawn {
            name: name.into(),
            color: color.into(),
            pose,
        })
    }

    /// Ask the simulator to remove an object.
    pub fn kill(&mut self, name: &str) -> Result<SimObjectResponse, SimClientError> {
        self.request(&SimObjectRequest::Kill { name: name.into() })
    }

    fn request(&mut self, request: &SimObjectRequest) -> Result<SimObjectResponse, SimClientError> {
        if !self.socket.connected() {
            return Err(SimClientError::NotConnected);
        }

        let req_str =
            serde_json::to_string(request).map_err(SimClientError::SerializationError)?;

        trace!("SimClient sending {}", req_str);

        self.socket.send(&req_str, 0).map_err(|e| match e {
            zmq::Error::EAGAIN => SimClientError::Timeout,
            e => SimClientError::SendError(e),
        })?;

        match self.socket.recv_msg(0) {
            Ok(m) => serde_json::from_str(m.as_str().unwrap_or(""))
                .map_err(SimClientError::DeserializeError),
            Err(zmq::Error::EAGAIN) => Err(SimClientError::Timeout),
            Err(e) => Err(SimClientError::RecvError(e)),
        }
    }
}
