//! Simulated arm backend

use log::debug;

use super::*;
use crate::sim_client::SimClient;
use comms_if::eqpt::{ObjectPose, SimObjectResponse};

/// Drives the simulated arm, whose bridge listens on the arm endpoint like the physical arm, and
/// manages objects through the simulator's object service.
pub struct SimBackend {
    arm: RemoteArm,
    sim_client: SimClient,
}

impl SimBackend {
    pub fn new(arm_ctrl: ArmCtrl, arm_client: ArmClient, sim_client: SimClient) -> Self {
        Self {
            arm: RemoteArm::new(arm_ctrl, arm_client),
            sim_client,
        }
    }
}

impl RobotBackend for SimBackend {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn execute_motion(&mut self, target: &Frame) -> Result<(), MotionFailure> {
        self.arm.execute_motion(target)
    }

    fn actuate_gripper(&mut self, state: GripperState) -> Result<(), ActuationFailure> {
        self.arm.actuate_gripper(state)
    }

    fn sim_objects(&mut self) -> Option<&mut dyn SimObjects> {
        Some(self)
    }
}

impl SimObjects for SimBackend {
    fn spawn_object(&mut self, spec: &SimObjectSpec) -> Result<ObjectHandle, SpawnFailure> {
        debug!("Requesting spawn of {} ({})", spec.name, spec.color);

        match self
            .sim_client
            .spawn(&spec.name, &spec.color, ObjectPose::from(&spec.pose))
            .map_err(SpawnFailure::Client)?
        {
            SimObjectResponse::Spawned => Ok(ObjectHandle::from(spec)),
            SimObjectResponse::Failed(reason) => Err(SpawnFailure::Rejected(reason)),
            r => Err(SpawnFailure::Rejected(format!("unexpected response {:?}", r))),
        }
    }

    fn kill_object(&mut self, handle: &ObjectHandle) -> Result<(), KillFailure> {
        debug!("Requesting kill of {}", handle.name);

        match self
            .sim_client
            .kill(&handle.name)
            .map_err(KillFailure::Client)?
        {
            SimObjectResponse::Killed => Ok(()),
            SimObjectResponse::UnknownObject => Err(KillFailure::UnknownObject(handle.name.clone())),
            SimObjectResponse::Failed(reason) => Err(KillFailure::Rejected(reason)),
            r => Err(KillFailure::Rejected(format!("unexpected response {:?}", r))),
        }
    }
}
