//! # Equipment Interface
//!
//! This module defines the interface structures which will be sent to equipment servers/clients.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod arm;
pub mod sim;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use arm::{ArmDems, ArmRequest, ArmResponse, GripperDems, JointId};
pub use sim::{ObjectPose, SimObjectRequest, SimObjectResponse};
