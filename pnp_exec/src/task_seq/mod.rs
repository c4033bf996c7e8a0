//! # Task sequencer module
//!
//! Runs the pick and place sequence of every object in a task. Each object goes through the same
//! ordered phases:
//!
//! 1. Approach - open the gripper and move down onto the object
//! 2. Grasp - close the gripper
//! 3. Depart - lift the object clear
//! 4. Transport - move to above the destination
//! 5. PlaceApproach - lower the object onto the destination (or the top of the stack)
//! 6. Release - open the gripper
//! 7. PlaceDepart - move clear of the placed object
//!
//! A failure in any phase abandons the rest of that object's sequence. Whether the remaining
//! objects are still attempted depends on the [`FailurePolicy`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod report;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::backend::{ActuationFailure, MotionFailure};
use crate::input::ObjectDescriptor;
use crate::path_interp::{InterpError, MotionProfile};
use crate::pose::GraspOffset;
use crate::stack::StackError;

pub use report::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerConfig {
    pub grasp_offset: GraspOffset,

    /// Distance above the grasp frame at which the approach to an object or destination starts.
    ///
    /// Units: millimetres
    pub initial_approach_distance_mm: f64,

    /// Distance above the grasp frame at which a departure ends.
    ///
    /// Units: millimetres
    pub final_depart_distance_mm: f64,

    pub motion_profile: MotionProfile,

    /// Height of each object, used to stack objects sharing the destination.
    ///
    /// Units: millimetres
    pub object_height_mm: f64,

    pub failure_policy: FailurePolicy,
}

/// Shared flag used to stop a running sequence.
///
/// The flag is checked before every dispatch to the backend, so a running motion always finishes
/// before the sequence stops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

/// Observer which logs phase progress.
pub struct LogObserver;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Receives progress events from the sequencer. All methods do nothing by default.
pub trait PhaseObserver {
    fn on_object_start(&mut self, _object: &ObjectDescriptor) {}

    fn on_phase_start(&mut self, _object: &ObjectDescriptor, _phase: MotionPhase) {}

    fn on_phase_complete(&mut self, _object: &ObjectDescriptor, _record: &PhaseRecord) {}

    fn on_object_end(&mut self, _object: &ObjectDescriptor, _result: &Result<(), SequenceError>) {}

    /// Called after the last object, before any remaining simulated objects are removed.
    fn on_before_cleanup(&mut self) {}
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phases of the sequence of a single object, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MotionPhase {
    Approach,
    Grasp,
    Depart,
    Transport,
    PlaceApproach,
    Release,
    PlaceDepart,
}

/// What to do with the remaining objects once one has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the task, leaving the remaining objects untouched.
    AbortBatch,

    /// Carry on with the next object.
    ContinueBatch,
}

/// Reasons the sequence of an object can fail.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Motion failed during {phase}: {source}")]
    Motion {
        phase: MotionPhase,
        source: MotionFailure,
    },

    #[error("Gripper actuation failed during {phase}: {source}")]
    Actuation {
        phase: MotionPhase,
        source: ActuationFailure,
    },

    #[error("Sequence cancelled before {phase}")]
    Cancelled { phase: MotionPhase },

    #[error("Could not plan the sequence: {0}")]
    Planning(InterpError),
}

/// Errors in the sequencer configuration.
#[derive(Debug, thiserror::Error)]
pub enum SequencerConfigError {
    #[error("Invalid motion profile: {0}")]
    Interp(#[from] InterpError),

    #[error("Invalid object height: {0}")]
    Stack(#[from] StackError),

    #[error("{0} must be a non-negative finite number, found {1} mm")]
    InvalidDistance(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionPhase {
    /// All phases in execution order.
    pub const ALL: [MotionPhase; 7] = [
        MotionPhase::Approach,
        MotionPhase::Grasp,
        MotionPhase::Depart,
        MotionPhase::Transport,
        MotionPhase::PlaceApproach,
        MotionPhase::Release,
        MotionPhase::PlaceDepart,
    ];
}

impl fmt::Display for MotionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotionPhase::Approach => "approach",
            MotionPhase::Grasp => "grasp",
            MotionPhase::Depart => "depart",
            MotionPhase::Transport => "transport",
            MotionPhase::PlaceApproach => "place approach",
            MotionPhase::Release => "release",
            MotionPhase::PlaceDepart => "place depart",
        };

        write!(f, "{}", s)
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::AbortBatch
    }
}

impl SequenceError {
    /// The phase in which the error occured, if it occured in one.
    pub fn phase(&self) -> Option<MotionPhase> {
        match self {
            SequenceError::Motion { phase, .. }
            | SequenceError::Actuation { phase, .. }
            | SequenceError::Cancelled { phase } => Some(*phase),
            SequenceError::Planning(_) => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            SequenceError::Motion { .. } => FailureKind::Motion,
            SequenceError::Actuation { .. } => FailureKind::Actuation,
            SequenceError::Cancelled { .. } => FailureKind::Cancelled,
            SequenceError::Planning(_) => FailureKind::Planning,
        }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the sequence stops at the next dispatch.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl PhaseObserver for LogObserver {
    fn on_object_start(&mut self, object: &ObjectDescriptor) {
        info!(
            "---- Object {} ({}) at ({:.2}, {:.2}, {:.2}, {:.2}) ----",
            object.index,
            object.name,
            object.pose.x_mm,
            object.pose.y_mm,
            object.pose.z_mm,
            object.pose.phi_deg
        );
    }

    fn on_phase_start(&mut self, object: &ObjectDescriptor, phase: MotionPhase) {
        info!("{}: {}", object.name, phase);
    }

    fn on_object_end(&mut self, object: &ObjectDescriptor, result: &Result<(), SequenceError>) {
        match result {
            Ok(()) => info!("{} placed", object.name),
            Err(e) => warn!("{} abandoned: {}", object.name, e),
        }
    }
}
