//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// Internal
use super::{ArmCtrlError, Calibration, NUM_ARM_JOINTS};
use crate::pose::Frame;
use comms_if::eqpt::{ArmDems, GripperDems, JointId};
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state
#[derive(Debug, Clone)]
pub struct ArmCtrl {
    pub(crate) params: Calibration,
}

/// Joint angles in the arm's kinematic convention, before the calibration zero offsets are
/// applied.
///
/// Order is base, shoulder, elbow, wrist, wrist rotation (see [`JointId::arm_ids`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointAngles {
    pub pos_rad: [f64; NUM_ARM_JOINTS],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// State of the gripper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GripperState {
    Open,
    Closed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmCtrl {
    pub fn new(params: Calibration) -> Self {
        Self { params }
    }

    /// Load the calibration file at the given path.
    pub fn load<P: AsRef<Path>>(calibration_path: P) -> Result<Self, params::LoadError> {
        Ok(Self::new(params::load_from_path(calibration_path)?))
    }

    pub fn calibration(&self) -> &Calibration {
        &self.params
    }

    /// Calculate the joint demands which place the gripper at the target frame.
    pub fn solve(&self, target: &Frame) -> Result<ArmDems, ArmCtrlError> {
        let angles = self.calc_inverse_kinematics(target)?;

        trace!("{:?} frame solved to {:?}", target.kind, angles.pos_rad);

        self.demands(&angles)
    }

    /// Convert joint angles into actuator demands.
    ///
    /// The zero offsets are applied and the result is checked against the joint limits. Unlike
    /// driving, a clamped joint would put the gripper somewhere other than where the task needs
    /// it, so a demand outside the limits is an error.
    pub fn demands(&self, angles: &JointAngles) -> Result<ArmDems, ArmCtrlError> {
        let mut pos_rad = HashMap::new();

        for (i, joint) in JointId::arm_ids().iter().enumerate() {
            let dem_rad = angles.pos_rad[i] + self.params.zero_offset_rad[i];

            if dem_rad < self.params.min_pos_rad[i] || dem_rad > self.params.max_pos_rad[i] {
                return Err(ArmCtrlError::JointLimit {
                    joint: *joint,
                    pos_rad: dem_rad,
                    min_rad: self.params.min_pos_rad[i],
                    max_rad: self.params.max_pos_rad[i],
                });
            }

            pos_rad.insert(*joint, dem_rad);
        }

        Ok(ArmDems { pos_rad })
    }

    /// Demands for the gripper to reach the given state.
    pub fn gripper_dems(&self, state: GripperState) -> GripperDems {
        GripperDems {
            pos_rad: match state {
                GripperState::Open => self.params.gripper_open_rad,
                GripperState::Closed => self.params.gripper_closed_rad,
            },
        }
    }

    /// Position of the gripper's grasp point for the given joint angles.
    pub fn calc_forward_kinematics(&self, angles: &JointAngles) -> Vector3<f64> {
        let [base, shoulder, elbow, wrist, _] = angles.pos_rad;
        let forearm_pitch = shoulder - elbow;
        let tool_pitch = forearm_pitch + wrist;

        // Distance from the base axis and height of the wrist
        let wrist_r = self.params.humerus_length_mm * shoulder.cos()
            + self.params.ulna_length_mm * forearm_pitch.cos();
        let wrist_z = self.params.base_height_mm
            + self.params.humerus_length_mm * shoulder.sin()
            + self.params.ulna_length_mm * forearm_pitch.sin();

        let tool_r = wrist_r + self.params.effector_length_mm * tool_pitch.cos();
        let tool_z = wrist_z + self.params.effector_length_mm * tool_pitch.sin();

        Vector3::new(tool_r * base.cos(), tool_r * base.sin(), tool_z)
    }
}
