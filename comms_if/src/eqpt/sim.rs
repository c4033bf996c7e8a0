//! # Simulator Object Commands
//!
//! Requests to create and remove objects (bricks) in the simulator. These only exist when running
//! against the simulator; the physical arm has no equivalent.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose at which to spawn an object.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ObjectPose {
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_mm: f64,

    /// Rotation about the vertical axis.
    pub phi_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A request to the simulator's object service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SimObjectRequest {
    /// Create a new object with the given unique name.
    Spawn {
        name: String,
        color: String,
        pose: ObjectPose,
    },

    /// Remove the object with the given name.
    Kill { name: String },
}

/// Response from the simulator's object service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SimObjectResponse {
    Spawned,
    Killed,

    /// No object with the requested name exists in the simulation.
    UnknownObject,

    /// The simulator couldn't carry out the request.
    Failed(String),
}
