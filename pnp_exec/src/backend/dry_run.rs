//! Dry run backend
//!
//! Solves the kinematics of every frame and logs the demands without sending them anywhere. When
//! running as a simulation the objects are tracked in memory.

use log::info;
use std::collections::HashSet;

use super::*;

/// A backend which never opens a socket.
pub struct DryRunBackend {
    arm_ctrl: Option<ArmCtrl>,

    /// Names of the objects currently alive, `None` unless simulating objects.
    objects: Option<HashSet<String>>,

    num_motions: usize,
    num_gripper_actions: usize,
}

impl DryRunBackend {
    /// Create a new dry run backend.
    ///
    /// If an `ArmCtrl` is given every target is solved and an unreachable target fails as it
    /// would on the arm. If `simulate_objects` is set the backend offers object creation.
    pub fn new(arm_ctrl: Option<ArmCtrl>, simulate_objects: bool) -> Self {
        Self {
            arm_ctrl,
            objects: if simulate_objects {
                Some(HashSet::new())
            } else {
                None
            },
            num_motions: 0,
            num_gripper_actions: 0,
        }
    }

    pub fn num_motions(&self) -> usize {
        self.num_motions
    }

    pub fn num_gripper_actions(&self) -> usize {
        self.num_gripper_actions
    }

    /// Names of the simulated objects still alive.
    pub fn alive_objects(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .as_ref()
            .map(|o| o.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl RobotBackend for DryRunBackend {
    fn name(&self) -> &'static str {
        "dry run"
    }

    fn execute_motion(&mut self, target: &Frame) -> Result<(), MotionFailure> {
        let p = target.position_mm();

        match self.arm_ctrl {
            Some(ref arm_ctrl) => {
                let dems = arm_ctrl.solve(target).map_err(MotionFailure::Unreachable)?;
                info!(
                    "[dry run] {:?} ({:.2}, {:.2}, {:.2}) -> {:?}",
                    target.kind, p.x, p.y, p.z, dems.pos_rad
                );
            }
            None => info!(
                "[dry run] {:?} ({:.2}, {:.2}, {:.2})",
                target.kind, p.x, p.y, p.z
            ),
        }

        self.num_motions += 1;
        Ok(())
    }

    fn actuate_gripper(&mut self, state: GripperState) -> Result<(), ActuationFailure> {
        info!("[dry run] gripper {:?}", state);
        self.num_gripper_actions += 1;
        Ok(())
    }

    fn sim_objects(&mut self) -> Option<&mut dyn SimObjects> {
        if self.objects.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl SimObjects for DryRunBackend {
    fn spawn_object(&mut self, spec: &SimObjectSpec) -> Result<ObjectHandle, SpawnFailure> {
        let objects = self
            .objects
            .as_mut()
            .ok_or_else(|| SpawnFailure::Rejected("objects are not simulated".into()))?;

        if !objects.insert(spec.name.clone()) {
            return Err(SpawnFailure::AlreadyExists(spec.name.clone()));
        }

        info!(
            "[dry run] spawned {} ({}) at ({:.2}, {:.2}, {:.2}, {:.2})",
            spec.name, spec.color, spec.pose.x_mm, spec.pose.y_mm, spec.pose.z_mm, spec.pose.phi_deg
        );

        Ok(ObjectHandle::from(spec))
    }

    fn kill_object(&mut self, handle: &ObjectHandle) -> Result<(), KillFailure> {
        let removed = match self.objects.as_mut() {
            Some(objects) => objects.remove(&handle.name),
            None => false,
        };
        if removed {
            info!("[dry run] killed {}", handle.name);
            Ok(())
        } else {
            Err(KillFailure::UnknownObject(handle.name.clone()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pose::{FrameKind, Pose};

    fn spec(name: &str) -> SimObjectSpec {
        SimObjectSpec {
            name: name.into(),
            color: "red".into(),
            pose: Pose::new(0.0, 150.0, 0.0, 0.0),
        }
    }

    #[test]
    fn test_dry_run_counts() {
        let mut backend = DryRunBackend::new(None, false);

        let frame = Frame::from_pose(FrameKind::Grasp, &Pose::new(0.0, 150.0, 5.0, 0.0));
        backend.execute_motion(&frame).unwrap();
        backend.execute_motion(&frame).unwrap();
        backend.actuate_gripper(GripperState::Closed).unwrap();

        assert_eq!(backend.num_motions(), 2);
        assert_eq!(backend.num_gripper_actions(), 1);
        assert!(backend.sim_objects().is_none());
    }

    #[test]
    fn test_dry_run_objects() {
        let mut backend = DryRunBackend::new(None, true);
        let sim = backend.sim_objects().unwrap();

        let handle = sim.spawn_object(&spec("brick1")).unwrap();
        assert!(matches!(
            sim.spawn_object(&spec("brick1")),
            Err(SpawnFailure::AlreadyExists(_))
        ));

        sim.kill_object(&handle).unwrap();
        assert!(matches!(
            sim.kill_object(&handle),
            Err(KillFailure::UnknownObject(_))
        ));
        assert!(backend.alive_objects().is_empty());
    }
}
