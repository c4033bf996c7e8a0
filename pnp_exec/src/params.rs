//! # Pick and Place Executable Parameters
//!
//! This module provides parameters for the pick and place executable, loaded from
//! `pnp_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::path_interp::MotionProfile;
use crate::pose::GraspOffset;
use crate::sim_lifecycle::KillMode;
use crate::stack::BRICK_HEIGHT_MM;
use crate::task_seq::{FailurePolicy, SequencerConfig};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnpExecParams {
    /// Pose of the gripper relative to the objects it picks and places
    #[serde(default)]
    pub grasp_offset: GraspOffset,

    /// Distance above the grasp frame at which approaches start.
    ///
    /// Units: millimetres
    pub initial_approach_distance_mm: f64,

    /// Distance above the grasp frame at which departures end.
    ///
    /// Units: millimetres
    pub final_depart_distance_mm: f64,

    /// How to move between the approach/depart distance and the grasp frame
    pub motion_profile: MotionProfile,

    /// Height of a single object, used for stacking.
    ///
    /// Units: millimetres
    #[serde(default = "default_object_height_mm")]
    pub object_height_mm: f64,

    /// Which robot to drive
    pub backend: BackendKind,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Simulated object settings, only used with the sim backend
    #[serde(default)]
    pub sim: SimParams,

    /// If set the task is refused unless the input file contains exactly this many objects
    #[serde(default)]
    pub expected_objects: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Spawn the objects in the simulator before starting, and remove them afterwards
    pub create_objects: bool,

    pub kill_mode: KillMode,

    /// Wait for the operator before removing the objects at the end of the run
    pub pause_before_cleanup: bool,

    /// Names given to the simulated objects, in input order
    pub names: Vec<String>,

    /// Colours of the simulated objects, in input order
    pub colors: Vec<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Physical,
    Sim,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PnpExecParams {
    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            grasp_offset: self.grasp_offset,
            initial_approach_distance_mm: self.initial_approach_distance_mm,
            final_depart_distance_mm: self.final_depart_distance_mm,
            motion_profile: self.motion_profile,
            object_height_mm: self.object_height_mm,
            failure_policy: self.failure_policy,
        }
    }

    /// True if simulated objects should be created for the task.
    pub fn creates_objects(&self) -> bool {
        self.backend == BackendKind::Sim && self.sim.create_objects
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            create_objects: true,
            kill_mode: KillMode::default(),
            pause_before_cleanup: false,
            names: vec!["brick1".into(), "brick2".into(), "brick3".into()],
            colors: vec!["red".into(), "green".into(), "blue".into()],
        }
    }
}

fn default_object_height_mm() -> f64 {
    BRICK_HEIGHT_MM
}
