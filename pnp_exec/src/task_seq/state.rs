//! Implementations for the TaskSequencer state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, trace, warn};

use super::*;
use crate::arm_ctrl::GripperState;
use crate::backend::{RobotBackend, SimObjectSpec};
use crate::grasp::GraspModel;
use crate::path_interp::PathInterpolator;
use crate::pose::{Frame, FrameKind, Pose};
use crate::sim_lifecycle::SimObjectLifecycle;
use crate::stack::StackPlanner;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Task sequencer state
pub struct TaskSequencer {
    config: SequencerConfig,

    grasp_model: GraspModel,
    interp: PathInterpolator,
    stack: StackPlanner,

    /// Simulated objects, only present when objects are to be created
    lifecycle: Option<SimObjectLifecycle>,

    cancel: CancelToken,

    observers: Vec<Box<dyn PhaseObserver>>,
}

/// The planned steps of one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasePlan {
    pub phase: MotionPhase,
    pub steps: Vec<Step>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A single dispatch to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Move(Frame),
    Gripper(GripperState),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskSequencer {
    /// Create a new sequencer, validating the configuration.
    pub fn new(config: SequencerConfig) -> Result<Self, SequencerConfigError> {
        for (name, d) in [
            ("initial_approach_distance_mm", config.initial_approach_distance_mm),
            ("final_depart_distance_mm", config.final_depart_distance_mm),
        ]
        .iter()
        {
            if !d.is_finite() || *d < 0.0 {
                return Err(SequencerConfigError::InvalidDistance(*name, *d));
            }
        }

        let interp = PathInterpolator::new(config.motion_profile)?;

        // Check the waypoint count is bounded for both distances
        interp.distances(config.initial_approach_distance_mm, 0.0)?;
        interp.distances(0.0, config.final_depart_distance_mm)?;

        Ok(Self {
            grasp_model: GraspModel::new(config.grasp_offset),
            interp,
            stack: StackPlanner::new(config.object_height_mm)?,
            config,
            lifecycle: None,
            cancel: CancelToken::new(),
            observers: Vec::new(),
        })
    }

    /// Create simulated objects for the task, removing them according to the lifecycle's kill
    /// mode. Objects are only created if the backend is a simulation.
    pub fn with_lifecycle(mut self, lifecycle: SimObjectLifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn PhaseObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn lifecycle(&self) -> Option<&SimObjectLifecycle> {
        self.lifecycle.as_ref()
    }

    /// Destination poses for `num_objects` objects stacked on `destination`.
    pub fn place_poses(&self, destination: &Pose, num_objects: usize) -> Vec<Pose> {
        self.stack.plan(destination, num_objects)
    }

    /// Plan every step of the sequence that moves an object from `pick` to `place`.
    pub fn plan_object(&self, pick: &Pose, place: &Pose) -> Result<Vec<PhasePlan>, InterpError> {
        let approach_mm = self.config.initial_approach_distance_mm;
        let depart_mm = self.config.final_depart_distance_mm;

        let moves = |pose: &Pose, from_mm: f64, to_mm: f64, terminal: FrameKind| {
            self.interp
                .frames(&self.grasp_model, pose, from_mm, to_mm, terminal)
                .map(|frames| frames.map(Step::Move).collect::<Vec<_>>())
        };

        let mut approach = vec![Step::Gripper(GripperState::Open)];
        approach.extend(moves(pick, approach_mm, 0.0, FrameKind::Grasp)?);

        Ok(vec![
            PhasePlan {
                phase: MotionPhase::Approach,
                steps: approach,
            },
            PhasePlan {
                phase: MotionPhase::Grasp,
                steps: vec![Step::Gripper(GripperState::Closed)],
            },
            PhasePlan {
                phase: MotionPhase::Depart,
                steps: moves(pick, 0.0, depart_mm, FrameKind::Depart)?,
            },
            PhasePlan {
                phase: MotionPhase::Transport,
                steps: vec![Step::Move(
                    self.grasp_model.approach_frame(place, approach_mm),
                )],
            },
            PhasePlan {
                phase: MotionPhase::PlaceApproach,
                steps: moves(place, approach_mm, 0.0, FrameKind::Grasp)?,
            },
            PhasePlan {
                phase: MotionPhase::Release,
                steps: vec![Step::Gripper(GripperState::Open)],
            },
            PhasePlan {
                phase: MotionPhase::PlaceDepart,
                steps: moves(place, 0.0, depart_mm, FrameKind::Depart)?,
            },
        ])
    }

    /// Run the sequence of a single object, recording each completed phase in `log`.
    ///
    /// The sequence stops at the first failed dispatch. Restarting an object means running its
    /// whole sequence again.
    pub fn run_object(
        &mut self,
        backend: &mut dyn RobotBackend,
        object: &ObjectDescriptor,
        place: &Pose,
        log: &mut Vec<PhaseRecord>,
    ) -> Result<(), SequenceError> {
        let plan = self
            .plan_object(&object.pose, place)
            .map_err(SequenceError::Planning)?;

        for phase_plan in plan {
            let phase = phase_plan.phase;

            for o in self.observers.iter_mut() {
                o.on_phase_start(object, phase);
            }

            for step in phase_plan.steps.iter() {
                if self.cancel.is_cancelled() {
                    return Err(SequenceError::Cancelled { phase });
                }

                match step {
                    Step::Move(frame) => {
                        let p = frame.position_mm();
                        trace!(
                            "{} {:?} frame at ({:.2}, {:.2}, {:.2})",
                            phase,
                            frame.kind,
                            p.x,
                            p.y,
                            p.z
                        );

                        backend
                            .execute_motion(frame)
                            .map_err(|source| SequenceError::Motion { phase, source })?
                    }
                    Step::Gripper(state) => backend
                        .actuate_gripper(*state)
                        .map_err(|source| SequenceError::Actuation { phase, source })?,
                }
            }

            let record = PhaseRecord {
                phase,
                dispatches: phase_plan.steps.len(),
            };
            debug!("{} complete after {} dispatches", phase, record.dispatches);

            for o in self.observers.iter_mut() {
                o.on_phase_complete(object, &record);
            }
            log.push(record);
        }

        Ok(())
    }

    /// Run the whole task: every object in order, stacked on the destination.
    ///
    /// Simulated objects are spawned before the first object and any left alive are removed
    /// after the last, so the simulation is cleaned up however the task ends.
    pub fn run(
        &mut self,
        backend: &mut dyn RobotBackend,
        objects: &[ObjectDescriptor],
        destination: &Pose,
    ) -> RunReport {
        let start_s = util::session::get_elapsed_seconds();
        let backend_name = backend.name();
        let place_poses = self.place_poses(destination, objects.len());

        info!(
            "Sequencing {} object(s) onto ({:.2}, {:.2}, {:.2}, {:.2}) using the {} backend",
            objects.len(),
            destination.x_mm,
            destination.y_mm,
            destination.z_mm,
            destination.phi_deg,
            backend_name
        );

        // ---- SPAWN ----

        if let Some(ref mut lifecycle) = self.lifecycle {
            match backend.sim_objects() {
                Some(sim) => {
                    let specs: Vec<SimObjectSpec> = objects.iter().map(|o| o.sim_spec()).collect();
                    if let Err(e) = lifecycle.spawn_all(&specs, sim) {
                        warn!("No objects spawned, they must be placed by hand: {}", e);
                    }
                }
                None => warn!(
                    "The {} backend can't create objects, they must be placed by hand",
                    backend_name
                ),
            }
        }

        // ---- SEQUENCE ----

        let mut outcomes = Vec::with_capacity(objects.len());
        let mut stopped = false;

        for (object, place) in objects.iter().zip(place_poses.iter()) {
            let mut outcome = ObjectOutcome {
                index: object.index,
                name: object.name.clone(),
                pick: object.pose,
                place: *place,
                status: ObjectStatus::Skipped,
                phases: Vec::new(),
            };

            if stopped {
                outcomes.push(outcome);
                continue;
            }

            for o in self.observers.iter_mut() {
                o.on_object_start(object);
            }

            let result = self.run_object(backend, object, place, &mut outcome.phases);

            if let Some(ref mut lifecycle) = self.lifecycle {
                if let Some(sim) = backend.sim_objects() {
                    match result {
                        Ok(()) => lifecycle.on_object_complete(&object.name, sim),
                        Err(_) => lifecycle.on_object_failed(&object.name, sim),
                    }
                }
            }

            for o in self.observers.iter_mut() {
                o.on_object_end(object, &result);
            }

            if let Err(ref e) = result {
                stopped = match e {
                    SequenceError::Cancelled { .. } => true,
                    _ => self.config.failure_policy == FailurePolicy::AbortBatch,
                };

                if stopped {
                    warn!("Stopping the task after the failure of {}", object.name);
                }
            }

            outcome.status = ObjectStatus::from_result(&result);
            outcomes.push(outcome);
        }

        // ---- CLEANUP ----

        for o in self.observers.iter_mut() {
            o.on_before_cleanup();
        }

        let sim = match self.lifecycle {
            Some(ref mut lifecycle) => backend.sim_objects().map(|sim| lifecycle.finish(sim)),
            None => None,
        };

        RunReport {
            backend: backend_name.to_string(),
            motion_profile: self.config.motion_profile,
            objects: outcomes,
            sim,
            cancelled: self.cancel.is_cancelled(),
            duration_s: util::session::get_elapsed_seconds() - start_s,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path_interp::MotionProfile;

    fn config(profile: MotionProfile) -> SequencerConfig {
        SequencerConfig {
            grasp_offset: GraspOffset::default(),
            initial_approach_distance_mm: 50.0,
            final_depart_distance_mm: 50.0,
            motion_profile: profile,
            object_height_mm: 11.4,
            failure_policy: FailurePolicy::default(),
        }
    }

    #[test]
    fn test_plan_phase_order() {
        let seq = TaskSequencer::new(config(MotionProfile::Interpolated { delta_mm: 10.0 })).unwrap();
        let plan = seq
            .plan_object(
                &Pose::new(-40.0, 150.0, 0.0, -90.0),
                &Pose::new(40.0, 150.0, 0.0, -90.0),
            )
            .unwrap();

        let phases: Vec<MotionPhase> = plan.iter().map(|p| p.phase).collect();
        assert_eq!(phases, MotionPhase::ALL.to_vec());

        // Open, then 5 approach steps and the grasp frame
        assert_eq!(plan[0].steps[0], Step::Gripper(GripperState::Open));
        assert_eq!(plan[0].steps.len(), 7);
        assert_eq!(plan[1].steps, vec![Step::Gripper(GripperState::Closed)]);
        assert_eq!(plan[3].steps.len(), 1);
        assert_eq!(plan[5].steps, vec![Step::Gripper(GripperState::Open)]);

        match plan[2].steps.last() {
            Some(Step::Move(f)) => {
                assert_eq!(f.kind, FrameKind::Depart);
                assert!((f.position_mm().z - 55.0).abs() < 1e-9);
            }
            other => panic!("Unexpected final depart step {:?}", other),
        }
    }

    #[test]
    fn test_direct_profile_plan() {
        let seq = TaskSequencer::new(config(MotionProfile::Direct)).unwrap();
        let plan = seq
            .plan_object(&Pose::new(0.0, 150.0, 0.0, 0.0), &Pose::new(0.0, 200.0, 0.0, 0.0))
            .unwrap();

        let counts: Vec<usize> = plan.iter().map(|p| p.steps.len()).collect();
        assert_eq!(counts, vec![3, 1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn test_invalid_config() {
        let mut c = config(MotionProfile::Direct);
        c.initial_approach_distance_mm = -1.0;
        assert!(matches!(
            TaskSequencer::new(c),
            Err(SequencerConfigError::InvalidDistance(..))
        ));

        let c = config(MotionProfile::Interpolated { delta_mm: 0.0 });
        assert!(matches!(
            TaskSequencer::new(c),
            Err(SequencerConfigError::Interp(_))
        ));

        // A valid delta which would need too many waypoints fails up front
        let c = config(MotionProfile::Interpolated { delta_mm: 1e-4 });
        assert!(matches!(
            TaskSequencer::new(c),
            Err(SequencerConfigError::Interp(
                crate::path_interp::InterpError::TooManyWaypoints { .. }
            ))
        ));

        let mut c = config(MotionProfile::Direct);
        c.object_height_mm = 0.0;
        assert!(matches!(
            TaskSequencer::new(c),
            Err(SequencerConfigError::Stack(_))
        ));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let seq = TaskSequencer::new(config(MotionProfile::Direct)).unwrap();
        let token = seq.cancel_token();

        assert!(!seq.cancel.is_cancelled());
        token.cancel();
        assert!(seq.cancel.is_cancelled());
    }
}
