//! # Robot backends
//!
//! The task sequencer drives the arm through the [`RobotBackend`] trait, so the same sequence can
//! run against the physical arm, the simulator, or nothing at all (dry run). Only the simulator
//! can create and remove objects, which it offers through [`SimObjects`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dry_run;
mod physical;
mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::Serialize;

use crate::arm_client::{ArmClient, ArmClientError};
use crate::arm_ctrl::{ArmCtrl, ArmCtrlError, GripperState};
use crate::pose::{Frame, Pose};
use crate::sim_client::SimClientError;
use comms_if::eqpt::ArmResponse;

pub use dry_run::DryRunBackend;
pub use physical::PhysicalBackend;
pub use sim::SimBackend;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something that can move the gripper.
pub trait RobotBackend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Move the gripper to the target frame, returning once the motion has completed.
    fn execute_motion(&mut self, target: &Frame) -> Result<(), MotionFailure>;

    /// Open or close the gripper, returning once it has finished moving.
    fn actuate_gripper(&mut self, state: GripperState) -> Result<(), ActuationFailure>;

    /// Access to object creation, if this backend is a simulation.
    fn sim_objects(&mut self) -> Option<&mut dyn SimObjects> {
        None
    }
}

/// Creation and removal of objects in a simulation.
pub trait SimObjects {
    fn spawn_object(&mut self, spec: &SimObjectSpec) -> Result<ObjectHandle, SpawnFailure>;

    fn kill_object(&mut self, handle: &ObjectHandle) -> Result<(), KillFailure>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object to create in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimObjectSpec {
    pub name: String,
    pub color: String,
    pub pose: Pose,
}

/// Refers to an object that exists in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectHandle {
    pub name: String,
}

/// Arm control and the arm server connection, shared by the backends which talk to an arm.
pub(crate) struct RemoteArm {
    arm_ctrl: ArmCtrl,
    client: ArmClient,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MotionFailure {
    #[error("Target cannot be reached: {0}")]
    Unreachable(ArmCtrlError),

    #[error("The arm server rejected the demands: {0:?}")]
    Rejected(ArmResponse),

    #[error("Arm client error: {0}")]
    Client(ArmClientError),
}

#[derive(Debug, thiserror::Error)]
pub enum ActuationFailure {
    #[error("The arm server rejected the gripper demand: {0:?}")]
    Rejected(ArmResponse),

    #[error("Arm client error: {0}")]
    Client(ArmClientError),
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnFailure {
    #[error("An object called {0} already exists")]
    AlreadyExists(String),

    #[error("The simulator could not spawn the object: {0}")]
    Rejected(String),

    #[error("Sim client error: {0}")]
    Client(SimClientError),
}

#[derive(Debug, thiserror::Error)]
pub enum KillFailure {
    #[error("The simulator has no object called {0}")]
    UnknownObject(String),

    #[error("The simulator could not remove the object: {0}")]
    Rejected(String),

    #[error("Sim client error: {0}")]
    Client(SimClientError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<&SimObjectSpec> for ObjectHandle {
    fn from(spec: &SimObjectSpec) -> Self {
        Self {
            name: spec.name.clone(),
        }
    }
}

impl RemoteArm {
    pub(crate) fn new(arm_ctrl: ArmCtrl, client: ArmClient) -> Self {
        Self { arm_ctrl, client }
    }

    pub(crate) fn execute_motion(&mut self, target: &Frame) -> Result<(), MotionFailure> {
        let dems = self
            .arm_ctrl
            .solve(target)
            .map_err(MotionFailure::Unreachable)?;

        debug!("Sending {:?} demands {:?}", target.kind, dems.pos_rad);

        match self
            .client
            .send_demands(&dems)
            .map_err(MotionFailure::Client)?
        {
            ArmResponse::DemsOk => Ok(()),
            r => Err(MotionFailure::Rejected(r)),
        }
    }

    pub(crate) fn actuate_gripper(&mut self, state: GripperState) -> Result<(), ActuationFailure> {
        let dems = self.arm_ctrl.gripper_dems(state);

        debug!("Sending gripper {:?} demand {:.4} rad", state, dems.pos_rad);

        match self
            .client
            .send_gripper(&dems)
            .map_err(ActuationFailure::Client)?
        {
            ArmResponse::DemsOk => Ok(()),
            r => Err(ActuationFailure::Rejected(r)),
        }
    }
}
