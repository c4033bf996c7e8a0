//! Physical arm backend

use super::{ActuationFailure, MotionFailure, RemoteArm, RobotBackend};
use crate::arm_client::ArmClient;
use crate::arm_ctrl::{ArmCtrl, GripperState};
use crate::pose::Frame;

/// Drives the physical arm through the arm server.
///
/// Objects are placed on the table by an operator, so no object creation is offered.
pub struct PhysicalBackend {
    arm: RemoteArm,
}

impl PhysicalBackend {
    pub fn new(arm_ctrl: ArmCtrl, client: ArmClient) -> Self {
        Self {
            arm: RemoteArm::new(arm_ctrl, client),
        }
    }
}

impl RobotBackend for PhysicalBackend {
    fn name(&self) -> &'static str {
        "physical"
    }

    fn execute_motion(&mut self, target: &Frame) -> Result<(), MotionFailure> {
        self.arm.execute_motion(target)
    }

    fn actuate_gripper(&mut self, state: GripperState) -> Result<(), ActuationFailure> {
        self.arm.actuate_gripper(state)
    }
}
