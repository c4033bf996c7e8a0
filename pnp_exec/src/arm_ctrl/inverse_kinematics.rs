//! Arm inverse kinematics calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

// Internal imports
use super::*;
use crate::pose::{Axis, Frame};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest component of the approach axis allowed out of the arm's vertical plane. A 5 axis arm
/// can't yaw the gripper out of this plane.
const PLANE_TOLERANCE: f64 = 1e-3;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmCtrl {
    /// Perform the inverse kinematics calculations.
    ///
    /// The grasp point of the target frame is moved back along the approach (local z) axis by
    /// the effector length to find the wrist. The base angle points the arm's vertical plane at
    /// the wrist, then the shoulder and elbow are found from the two link (humerus, ulna)
    /// triangle, taking the elbow-up solution. The wrist pitch makes up the difference between
    /// the forearm and the approach axis, and the wrist rotation aligns the gripper's local x axis
    /// with the target.
    pub(crate) fn calc_inverse_kinematics(
        &self,
        target: &Frame,
    ) -> Result<JointAngles, ArmCtrlError> {
        let grasp_m = target.position_mm();
        let approach = target.axis(Axis::Z);
        let tool_x = target.axis(Axis::X);

        if !util::maths::all_finite(grasp_m.as_slice()) || !util::maths::all_finite(approach.as_slice()) {
            return Err(ArmCtrlError::NonFiniteTarget);
        }

        let wrist = grasp_m - approach * self.params.effector_length_mm;

        // Base rotation and the horizontal normal of the arm's plane
        let base_rad = wrist.y.atan2(wrist.x);
        let (sin_base, cos_base) = base_rad.sin_cos();
        let plane_normal = Vector3::new(-sin_base, cos_base, 0.0);

        let out_of_plane = approach.dot(&plane_normal);
        if out_of_plane.abs() > PLANE_TOLERANCE {
            return Err(ArmCtrlError::ApproachOutOfPlane(out_of_plane));
        }

        // Wrist position in the arm's plane, relative to the shoulder
        let horizontal_distance_mm = (wrist.x.powi(2) + wrist.y.powi(2)).sqrt();
        let vertical_distance_mm = wrist.z - self.params.base_height_mm;

        let humerus_mm = self.params.humerus_length_mm;
        let ulna_mm = self.params.ulna_length_mm;
        let max_distance_mm = humerus_mm + ulna_mm;
        let min_distance_mm = (humerus_mm - ulna_mm).abs();
        let target_distance_mm =
            (horizontal_distance_mm.powi(2) + vertical_distance_mm.powi(2)).sqrt();

        if target_distance_mm > max_distance_mm || target_distance_mm < min_distance_mm {
            return Err(ArmCtrlError::OutOfReach {
                distance_mm: target_distance_mm,
                min_mm: min_distance_mm,
                max_mm: max_distance_mm,
            });
        }

        // Elbow bend from the cosine rule, clamped against rounding at full extension
        let cos_elbow = ((target_distance_mm.powi(2) - humerus_mm.powi(2) - ulna_mm.powi(2))
            / (2.0 * humerus_mm * ulna_mm))
            .max(-1.0)
            .min(1.0);
        let elbow_rad = cos_elbow.acos();

        let shoulder_rad = vertical_distance_mm.atan2(horizontal_distance_mm)
            + (ulna_mm * elbow_rad.sin()).atan2(humerus_mm + ulna_mm * elbow_rad.cos());

        // Pitch of the approach axis within the arm's plane
        let approach_horizontal = approach.x * cos_base + approach.y * sin_base;
        let tool_pitch_rad = approach.z.atan2(approach_horizontal);
        let wrist_rad = wrap_pi(tool_pitch_rad - (shoulder_rad - elbow_rad));

        // Signed angle from the plane normal to the gripper's x axis, about the approach axis
        let wrist_rot_rad = plane_normal
            .cross(&tool_x)
            .dot(&approach)
            .atan2(plane_normal.dot(&tool_x));

        Ok(JointAngles {
            pos_rad: [base_rad, shoulder_rad, elbow_rad, wrist_rad, wrist_rot_rad],
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pose::{FrameKind, GraspOffset, Pose};
    use crate::grasp::GraspModel;
    use comms_if::eqpt::JointId;
    use std::f64::consts::PI;

    /// Calibration of a desktop-sized arm with unrestricted joints.
    fn test_calibration() -> Calibration {
        Calibration {
            base_height_mm: 70.0,
            humerus_length_mm: 145.0,
            ulna_length_mm: 185.0,
            effector_length_mm: 100.0,
            zero_offset_rad: [0.0; NUM_ARM_JOINTS],
            min_pos_rad: [-PI; NUM_ARM_JOINTS],
            max_pos_rad: [PI; NUM_ARM_JOINTS],
            gripper_open_rad: 0.0,
            gripper_closed_rad: 1.2,
        }
    }

    fn grasp_frame(pose: Pose) -> Frame {
        GraspModel::new(GraspOffset::default()).grasp_frame(&pose)
    }

    #[test]
    fn test_ik_round_trip() {
        let arm = ArmCtrl::new(test_calibration());

        for pose in [
            Pose::new(-40.0, 150.0, 0.0, -90.0),
            Pose::new(40.0, 150.0, 22.8, -90.0),
            Pose::new(120.0, -60.0, 30.0, 15.0),
            Pose::new(0.0, 200.0, 60.0, 0.0),
        ]
        .iter()
        {
            let target = grasp_frame(*pose);
            let angles = arm.calc_inverse_kinematics(&target).unwrap();
            let reached = arm.calc_forward_kinematics(&angles);

            assert!(
                (reached - target.position_mm()).norm() < 1e-6,
                "{:?} reached {:?}",
                pose,
                reached
            );
        }
    }

    #[test]
    fn test_wrist_rotation_follows_phi() {
        let arm = ArmCtrl::new(test_calibration());

        // Two objects at the same place differing only in phi differ only in wrist rotation
        let a = arm
            .calc_inverse_kinematics(&grasp_frame(Pose::new(0.0, 150.0, 0.0, 0.0)))
            .unwrap();
        let b = arm
            .calc_inverse_kinematics(&grasp_frame(Pose::new(0.0, 150.0, 0.0, 30.0)))
            .unwrap();

        for i in 0..4 {
            assert!((a.pos_rad[i] - b.pos_rad[i]).abs() < 1e-9);
        }
        assert!((wrap_pi(b.pos_rad[4] - a.pos_rad[4]).abs() - 30f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_reach() {
        let arm = ArmCtrl::new(test_calibration());

        match arm.calc_inverse_kinematics(&grasp_frame(Pose::new(600.0, 0.0, 0.0, 0.0))) {
            Err(ArmCtrlError::OutOfReach { max_mm, .. }) => assert_eq!(max_mm, 330.0),
            other => panic!("Expected out of reach, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_plane() {
        let arm = ArmCtrl::new(test_calibration());

        // Gripper tilted sideways, pointing across the arm's plane
        let target = Frame::from_pose(FrameKind::Grasp, &Pose::new(150.0, 0.0, 100.0, 0.0))
            .compose(
                &GraspOffset {
                    dx_mm: 0.0,
                    dy_mm: 0.0,
                    dz_mm: 0.0,
                    theta_deg: 0.0,
                }
                .to_isometry(),
                FrameKind::Grasp,
            )
            .compose(
                &nalgebra::Isometry3::rotation(Vector3::x() * (PI / 2.0)),
                FrameKind::Grasp,
            );

        assert!(matches!(
            arm.calc_inverse_kinematics(&target),
            Err(ArmCtrlError::ApproachOutOfPlane(_))
        ));
    }

    #[test]
    fn test_joint_limits() {
        let mut cal = test_calibration();
        cal.max_pos_rad[0] = 0.5;
        let arm = ArmCtrl::new(cal);

        // Object on the +y axis needs a base angle of pi/2
        match arm.solve(&grasp_frame(Pose::new(0.0, 150.0, 0.0, 0.0))) {
            Err(ArmCtrlError::JointLimit { joint, .. }) => assert_eq!(joint, JointId::Base),
            other => panic!("Expected a joint limit error, got {:?}", other),
        }
    }

    #[test]
    fn test_demands_apply_offsets() {
        let mut cal = test_calibration();
        cal.zero_offset_rad = [0.1, 0.2, 0.3, 0.4, 0.5];
        let arm = ArmCtrl::new(cal);

        let dems = arm
            .demands(&JointAngles {
                pos_rad: [0.0, 1.0, 0.5, -1.0, 0.0],
            })
            .unwrap();

        assert_eq!(dems.pos_rad.len(), NUM_ARM_JOINTS);
        assert!((dems.pos_rad[&JointId::Shoulder] - 1.2).abs() < 1e-12);
        assert!((dems.pos_rad[&JointId::WristRot] - 0.5).abs() < 1e-12);

        assert_eq!(arm.gripper_dems(GripperState::Closed).pos_rad, 1.2);
        assert_eq!(arm.gripper_dems(GripperState::Open).pos_rad, 0.0);
    }
}
