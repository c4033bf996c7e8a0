//! Run reporting

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info, warn};
use serde::Serialize;

use super::{MotionPhase, SequenceError};
use crate::path_interp::MotionProfile;
use crate::pose::Pose;
use crate::sim_lifecycle::LifecycleSummary;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Outcome of a whole task.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub backend: String,
    pub motion_profile: MotionProfile,
    pub objects: Vec<ObjectOutcome>,

    /// Simulated object summary, if objects were simulated
    pub sim: Option<LifecycleSummary>,

    pub cancelled: bool,

    /// Time taken by the run.
    ///
    /// Units: seconds
    pub duration_s: f64,
}

/// Outcome of a single object.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectOutcome {
    pub index: usize,
    pub name: String,
    pub pick: Pose,
    pub place: Pose,
    pub status: ObjectStatus,

    /// The phases completed, in order
    pub phases: Vec<PhaseRecord>,
}

/// A completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseRecord {
    pub phase: MotionPhase,

    /// Number of motions and gripper actions sent to the backend
    pub dispatches: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObjectStatus {
    Completed,
    Failed {
        kind: FailureKind,
        phase: Option<MotionPhase>,
        reason: String,
    },

    /// Not attempted because the batch was stopped by an earlier object.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Motion,
    Actuation,
    Cancelled,
    Planning,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObjectStatus {
    pub(crate) fn from_result(result: &Result<(), SequenceError>) -> Self {
        match result {
            Ok(()) => ObjectStatus::Completed,
            Err(e) => ObjectStatus::Failed {
                kind: e.kind(),
                phase: e.phase(),
                reason: e.to_string(),
            },
        }
    }
}

impl RunReport {
    pub fn num_completed(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.status == ObjectStatus::Completed)
            .count()
    }

    /// Objects whose sequence failed, including a cancelled one.
    pub fn failures(&self) -> Vec<&ObjectOutcome> {
        self.objects
            .iter()
            .filter(|o| matches!(o.status, ObjectStatus::Failed { .. }))
            .collect()
    }

    pub fn orphaned(&self) -> &[String] {
        match self.sim {
            Some(ref s) => &s.orphaned,
            None => &[],
        }
    }

    /// True if every object was placed and nothing was left in the simulation.
    pub fn is_success(&self) -> bool {
        self.num_completed() == self.objects.len() && self.orphaned().is_empty()
    }

    /// Log a summary of the run.
    pub fn log_summary(&self) {
        info!(
            "Run finished in {:.2} s: {} of {} objects placed using the {} backend",
            self.duration_s,
            self.num_completed(),
            self.objects.len(),
            self.backend
        );

        for o in self.objects.iter() {
            match o.status {
                ObjectStatus::Completed => info!(
                    "    {} {}: placed at z = {:.2} mm",
                    o.index, o.name, o.place.z_mm
                ),
                ObjectStatus::Failed { ref reason, .. } => {
                    error!("    {} {}: {}", o.index, o.name, reason)
                }
                ObjectStatus::Skipped => warn!("    {} {}: skipped", o.index, o.name),
            }
        }

        if let Some(ref sim) = self.sim {
            info!(
                "Simulated objects: {} spawned, {} killed",
                sim.num_spawned, sim.num_killed
            );

            if !sim.spawn_failures.is_empty() {
                warn!("Objects that could not be spawned: {:?}", sim.spawn_failures);
            }
            if !sim.orphaned.is_empty() {
                error!("Objects left in the simulation: {:?}", sim.orphaned);
            }
        }
    }
}
