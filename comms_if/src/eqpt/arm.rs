//! # Arm Equipment Commands
//!
//! Requests sent by the arm client to the arm server (either the physical arm's servo controller
//! or the simulator bridge). The server only replies once the requested motion has finished, so a
//! reply doubles as a completion acknowledgement.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// All positional joints of the arm, from the base outwards. The gripper is actuated separately.
const ARM_IDS: [JointId; 5] = [
    JointId::Base,
    JointId::Shoulder,
    JointId::Elbow,
    JointId::Wrist,
    JointId::WristRot,
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Joint position demands for the arm.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ArmDems {
    /// The demanded position of each joint in radians.
    pub pos_rad: HashMap<JointId, f64>,
}

/// Gripper demands.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GripperDems {
    /// The demanded position of the gripper servo in radians.
    pub pos_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all actuators on the arm
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum JointId {
    Base,
    Shoulder,
    Elbow,
    Wrist,
    WristRot,
    Gripper,
}

/// A request to the arm server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ArmRequest {
    /// Move the positional joints to the given demands.
    Move(ArmDems),

    /// Move the gripper to the given demand.
    Gripper(GripperDems),
}

/// Response from the arm server based on the request sent by the client.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmResponse {
    /// Demands were valid and have been executed
    DemsOk,

    /// Demands were invalid and have been rejected
    DemsInvalid,

    /// Equipment is invalid so demands cannot be actuated
    EqptInvalid,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl JointId {
    /// The positional joints of the arm, ordered from the base outwards.
    pub fn arm_ids() -> &'static [JointId; 5] {
        &ARM_IDS
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = ArmRequest::Gripper(GripperDems { pos_rad: 0.25 });
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"Gripper":{"pos_rad":0.25}}"#);

        let rsp: ArmResponse = serde_json::from_str(r#""DemsInvalid""#).unwrap();
        assert_eq!(rsp, ArmResponse::DemsInvalid);
    }

    #[test]
    fn test_arm_ids_exclude_gripper() {
        assert_eq!(JointId::arm_ids().len(), 5);
        assert!(!JointId::arm_ids().contains(&JointId::Gripper));
    }
}
