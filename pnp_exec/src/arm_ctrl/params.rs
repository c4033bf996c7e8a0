//! Calibration parameters for ArmCtrl
//!
//! Calibration is robot specific, the file to use is named by the task input file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::NUM_ARM_JOINTS;
use serde::{Serialize, Deserialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Calibration data of the arm.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Calibration {
    // ---- GEOMETRY ----
    /// Height of the shoulder joint above the base frame origin.
    ///
    /// Units: millimetres
    pub base_height_mm: f64,

    /// Length of the upper arm (shoulder to elbow).
    ///
    /// Units: millimetres
    pub humerus_length_mm: f64,

    /// Length of the forearm (elbow to wrist).
    ///
    /// Units: millimetres
    pub ulna_length_mm: f64,

    /// Distance from the wrist pitch axis to the gripper's grasp point.
    ///
    /// Units: millimetres
    pub effector_length_mm: f64,

    // ---- JOINTS ----
    /// Offset added to each calculated joint angle to get the actuator demand, in the order
    /// base, shoulder, elbow, wrist, wrist rotation.
    ///
    /// Units: radians
    pub zero_offset_rad: [f64; NUM_ARM_JOINTS],

    /// Minimum actuator demand of each joint
    ///
    /// Units: radians
    pub min_pos_rad: [f64; NUM_ARM_JOINTS],

    /// Maximum actuator demand of each joint
    ///
    /// Units: radians
    pub max_pos_rad: [f64; NUM_ARM_JOINTS],

    // ---- GRIPPER ----
    /// Gripper demand when fully open.
    ///
    /// Units: radians
    pub gripper_open_rad: f64,

    /// Gripper demand when closed on an object.
    ///
    /// Units: radians
    pub gripper_closed_rad: f64,
}
