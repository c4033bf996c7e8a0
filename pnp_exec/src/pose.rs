//! # Poses and frames
//!
//! Task-level poses (position plus rotation about the vertical axis) and the rigid frames derived
//! from them. Frames are backed by `nalgebra`'s `Isometry3`, which provides the compose, invert and
//! translate operations the grasp model needs.
//!
//! All lengths are in millimetres, task-level angles in degrees.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use comms_if::eqpt::ObjectPose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose of an object or destination in the task plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_mm: f64,

    /// Rotation about the vertical (z) axis.
    ///
    /// Units: degrees
    pub phi_deg: f64,
}

/// Position and orientation of the gripper relative to an object's pose.
///
/// Constant across a task, and applied identically at the pick and place poses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraspOffset {
    pub dx_mm: f64,
    pub dy_mm: f64,
    pub dz_mm: f64,

    /// Rotation of the gripper about the local horizontal (y) axis.
    ///
    /// Units: degrees
    pub theta_deg: f64,
}

/// A named rigid transform in the arm's base frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub kind: FrameKind,
    pub iso: Isometry3<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What a frame represents, used for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    Object,
    Destination,
    Grasp,
    Approach,
    Depart,
    Waypoint,
}

/// A local axis of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_mm: f64, y_mm: f64, z_mm: f64, phi_deg: f64) -> Self {
        Self {
            x_mm,
            y_mm,
            z_mm,
            phi_deg,
        }
    }

    /// Returns true if all fields are finite numbers.
    pub fn is_finite(&self) -> bool {
        util::maths::all_finite(&[self.x_mm, self.y_mm, self.z_mm, self.phi_deg])
    }

    /// The same pose raised to the given height.
    pub fn with_z(&self, z_mm: f64) -> Self {
        Self { z_mm, ..*self }
    }

    /// The rigid transform of this pose: a translation followed by a rotation about z.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.x_mm, self.y_mm, self.z_mm),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.phi_deg.to_radians()),
        )
    }
}

impl From<&Pose> for ObjectPose {
    fn from(pose: &Pose) -> Self {
        ObjectPose {
            x_mm: pose.x_mm,
            y_mm: pose.y_mm,
            z_mm: pose.z_mm,
            phi_deg: pose.phi_deg,
        }
    }
}

impl GraspOffset {
    /// The rigid transform of the offset: a translation followed by a rotation about y.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.dx_mm, self.dy_mm, self.dz_mm),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.theta_deg.to_radians()),
        )
    }
}

impl Default for GraspOffset {
    /// Grasp 5 mm above the object's origin with the gripper pointing straight down.
    fn default() -> Self {
        Self {
            dx_mm: 0.0,
            dy_mm: 0.0,
            dz_mm: 5.0,
            theta_deg: 180.0,
        }
    }
}

impl Frame {
    pub fn new(kind: FrameKind, iso: Isometry3<f64>) -> Self {
        Self { kind, iso }
    }

    /// Build the frame of a pose.
    pub fn from_pose(kind: FrameKind, pose: &Pose) -> Self {
        Self::new(kind, pose.to_isometry())
    }

    /// Compose this frame with a transform expressed in this frame's local coordinates.
    pub fn compose(&self, offset: &Isometry3<f64>, kind: FrameKind) -> Self {
        Self::new(kind, self.iso * offset)
    }

    /// The inverse transform, keeping the same kind.
    pub fn inverse(&self) -> Self {
        Self::new(self.kind, self.iso.inverse())
    }

    /// Move the frame by `distance_mm` along one of its own axes.
    pub fn translate_local(&self, axis: Axis, distance_mm: f64, kind: FrameKind) -> Self {
        let offset = axis.unit() * distance_mm;
        self.compose(
            &Isometry3::translation(offset.x, offset.y, offset.z),
            kind,
        )
    }

    /// Position of the frame's origin.
    pub fn position_mm(&self) -> Vector3<f64> {
        self.iso.translation.vector
    }

    /// Direction of one of the frame's local axes, expressed in the base frame.
    pub fn axis(&self, axis: Axis) -> Vector3<f64> {
        self.iso.rotation * axis.unit()
    }

    /// Retag the frame.
    pub fn with_kind(self, kind: FrameKind) -> Self {
        Self { kind, ..self }
    }
}

impl Axis {
    fn unit(&self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}
