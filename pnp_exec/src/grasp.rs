//! # Grasp model
//!
//! Derives the grasp, approach and depart frames of the gripper from an object (or destination)
//! pose and the fixed grasp offset.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Isometry3;

use crate::pose::{Axis, Frame, FrameKind, GraspOffset, Pose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Computes gripper frames relative to a base pose.
#[derive(Debug, Clone)]
pub struct GraspModel {
    offset: GraspOffset,

    offset_iso: Isometry3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GraspModel {
    pub fn new(offset: GraspOffset) -> Self {
        Self {
            offset_iso: offset.to_isometry(),
            offset,
        }
    }

    pub fn offset(&self) -> &GraspOffset {
        &self.offset
    }

    /// The gripper frame at which the object at `pose` is grasped.
    pub fn grasp_frame(&self, pose: &Pose) -> Frame {
        Frame::from_pose(FrameKind::Object, pose).compose(&self.offset_iso, FrameKind::Grasp)
    }

    /// The grasp frame backed off by `distance_mm` along the gripper's approach (local z) axis.
    pub fn approach_frame(&self, pose: &Pose, distance_mm: f64) -> Frame {
        self.grasp_frame(pose)
            .translate_local(Axis::Z, -distance_mm, FrameKind::Approach)
    }

    /// The frame the gripper retreats to after grasping or releasing.
    ///
    /// Geometrically the same as [`GraspModel::approach_frame`], travelled in reverse.
    pub fn depart_frame(&self, pose: &Pose, distance_mm: f64) -> Frame {
        self.approach_frame(pose, distance_mm).with_kind(FrameKind::Depart)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_grasp_frame_is_deterministic() {
        let model = GraspModel::new(GraspOffset::default());
        let pose = Pose::new(-40.0, 150.0, 0.0, -90.0);

        assert_eq!(model.grasp_frame(&pose), model.grasp_frame(&pose));
    }

    #[test]
    fn test_grasp_frame() {
        let model = GraspModel::new(GraspOffset::default());
        let grasp = model.grasp_frame(&Pose::new(-40.0, 150.0, 0.0, -90.0));

        assert_eq!(grasp.kind, FrameKind::Grasp);
        assert!((grasp.position_mm() - Vector3::new(-40.0, 150.0, 5.0)).norm() < TOL);

        // Gripper points down into the object
        assert!((grasp.axis(Axis::Z) - Vector3::new(0.0, 0.0, -1.0)).norm() < TOL);
    }

    #[test]
    fn test_approach_and_depart_frames() {
        let model = GraspModel::new(GraspOffset::default());
        let pose = Pose::new(40.0, 150.0, 11.4, -90.0);

        let approach = model.approach_frame(&pose, 50.0);
        assert_eq!(approach.kind, FrameKind::Approach);
        assert!((approach.position_mm() - Vector3::new(40.0, 150.0, 66.4)).norm() < TOL);

        // Same orientation as the grasp
        let grasp = model.grasp_frame(&pose);
        assert!(approach.iso.rotation.angle_to(&grasp.iso.rotation) < TOL);

        let depart = model.depart_frame(&pose, 50.0);
        assert_eq!(depart.kind, FrameKind::Depart);
        assert_eq!(depart.iso, approach.iso);
    }

    #[test]
    fn test_offset_translation_is_local() {
        // A lateral offset is applied in the object's frame, so it rotates with phi
        let model = GraspModel::new(GraspOffset {
            dx_mm: 10.0,
            dy_mm: 0.0,
            dz_mm: 0.0,
            theta_deg: 180.0,
        });
        let grasp = model.grasp_frame(&Pose::new(0.0, 0.0, 0.0, 90.0));

        assert!((grasp.position_mm() - Vector3::new(0.0, 10.0, 0.0)).norm() < TOL);
    }
}
