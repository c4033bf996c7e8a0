//! Arm control module
//!
//! Converts gripper frames into joint demands for a 5 axis arm (base, shoulder, elbow, wrist
//! pitch, wrist rotation) plus a gripper.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod inverse_kinematics;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of positional joints on the arm, the gripper not included.
pub const NUM_ARM_JOINTS: usize = 5;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArmCtrlError {
    #[error(
        "The wrist target is {distance_mm:.2} mm from the shoulder, outside the reachable range \
        [{min_mm:.2}, {max_mm:.2}] mm"
    )]
    OutOfReach {
        distance_mm: f64,
        min_mm: f64,
        max_mm: f64,
    },

    #[error("The approach axis is not in the plane of the arm (out of plane by {0:.4})")]
    ApproachOutOfPlane(f64),

    #[error("{joint:?} demand of {pos_rad:.4} rad is outside its limits [{min_rad:.4}, {max_rad:.4}]")]
    JointLimit {
        joint: comms_if::eqpt::JointId,
        pos_rad: f64,
        min_rad: f64,
        max_rad: f64,
    },

    #[error("The target frame contains non-finite values")]
    NonFiniteTarget,
}
