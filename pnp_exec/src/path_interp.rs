//! # Path interpolation
//!
//! Approximates straight line motion of the gripper along its approach axis by a sequence of
//! waypoints. Distances are measured from the grasp frame along the approach axis, so an approach
//! runs from a large distance down to zero and a departure from zero up to a large distance.
//!
//! Waypoint `k` lies at `initial ± k * delta`. Waypoints are produced while they lie strictly
//! before the final distance, then the final distance itself is produced exactly once, so the
//! sequence always ends on the boundary frame even when `delta` doesn't divide the distance.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::grasp::GraspModel;
use crate::pose::{Frame, FrameKind, Pose};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Waypoints closer than this to the final distance are merged into it.
///
/// Units: millimetres
const BOUNDARY_TOL_MM: f64 = 1e-9;

/// Upper bound on the number of waypoints in one sequence.
pub const MAX_WAYPOINTS: usize = 100_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Generates waypoint sequences according to a motion profile.
#[derive(Debug, Clone, Copy)]
pub struct PathInterpolator {
    profile: MotionProfile,
}

/// A lazy sequence of distances along the approach axis.
#[derive(Debug, Clone)]
pub struct Waypoints {
    initial_mm: f64,
    final_mm: f64,

    /// Signed distance between consecutive waypoints
    step_mm: f64,

    /// Index of the next waypoint
    k: usize,

    done: bool,
}

/// A single waypoint distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub distance_mm: f64,

    /// True for the last waypoint of the sequence, which is always the final distance.
    pub terminal: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the gripper moves between the approach/depart distance and the grasp frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionProfile {
    /// Move directly from the initial to the final frame.
    Direct,

    /// Approximate continuous straight line motion with waypoints `delta_mm` apart.
    Interpolated { delta_mm: f64 },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InterpError {
    #[error("Waypoint separation must be a positive finite number, found {0} mm")]
    InvalidDelta(f64),

    #[error("Approach/depart distances must be finite, found {0} mm")]
    InvalidDistance(f64),

    #[error(
        "Moving {total_mm} mm in steps of {delta_mm} mm would need more than {} waypoints",
        MAX_WAYPOINTS
    )]
    TooManyWaypoints { total_mm: f64, delta_mm: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathInterpolator {
    /// Create a new interpolator, validating the profile.
    pub fn new(profile: MotionProfile) -> Result<Self, InterpError> {
        if let MotionProfile::Interpolated { delta_mm } = profile {
            if !delta_mm.is_finite() || delta_mm <= 0.0 {
                return Err(InterpError::InvalidDelta(delta_mm));
            }
        }

        Ok(Self { profile })
    }

    pub fn profile(&self) -> MotionProfile {
        self.profile
    }

    /// Get the sequence of distances from `initial_mm` to `final_mm`.
    pub fn distances(&self, initial_mm: f64, final_mm: f64) -> Result<Waypoints, InterpError> {
        for d in [initial_mm, final_mm].iter() {
            if !d.is_finite() {
                return Err(InterpError::InvalidDistance(*d));
            }
        }

        let total_mm = (final_mm - initial_mm).abs();
        let sign = if final_mm >= initial_mm { 1.0 } else { -1.0 };

        // The direct profile is an interpolation with a single step covering the whole distance
        let delta_mm = match self.profile {
            MotionProfile::Direct => total_mm,
            MotionProfile::Interpolated { delta_mm } => {
                if total_mm / delta_mm >= MAX_WAYPOINTS as f64 {
                    return Err(InterpError::TooManyWaypoints { total_mm, delta_mm });
                }
                delta_mm
            }
        };

        Ok(Waypoints {
            initial_mm,
            final_mm,
            step_mm: sign * delta_mm,
            k: 0,
            done: false,
        })
    }

    /// Get the gripper frames along the approach axis of `pose`, from `initial_mm` to `final_mm`.
    ///
    /// Intermediate frames are tagged as waypoints and the last frame with `terminal_kind`. A
    /// terminal distance of zero produces the grasp frame itself.
    pub fn frames<'a>(
        &self,
        model: &'a GraspModel,
        pose: &'a Pose,
        initial_mm: f64,
        final_mm: f64,
        terminal_kind: FrameKind,
    ) -> Result<impl Iterator<Item = Frame> + 'a, InterpError> {
        let waypoints = self.distances(initial_mm, final_mm)?;

        Ok(waypoints.map(move |w| {
            if !w.terminal {
                model
                    .approach_frame(pose, w.distance_mm)
                    .with_kind(FrameKind::Waypoint)
            } else if w.distance_mm == 0.0 {
                model.grasp_frame(pose).with_kind(terminal_kind)
            } else {
                model
                    .approach_frame(pose, w.distance_mm)
                    .with_kind(terminal_kind)
            }
        }))
    }
}

impl Iterator for Waypoints {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let distance_mm = self.initial_mm + self.k as f64 * self.step_mm;

        // Distance still to travel after this waypoint, positive while it lies before the end
        let remaining_mm = (self.final_mm - distance_mm) * self.step_mm.signum();

        if self.step_mm != 0.0 && remaining_mm > BOUNDARY_TOL_MM {
            self.k += 1;
            Some(Waypoint {
                distance_mm,
                terminal: false,
            })
        } else {
            self.done = true;
            Some(Waypoint {
                distance_mm: self.final_mm,
                terminal: true,
            })
        }
    }
}
