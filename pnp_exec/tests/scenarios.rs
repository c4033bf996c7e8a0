//! # Pick and place scenarios
//!
//! Runs whole tasks through the sequencer against an in-memory backend which records every
//! dispatch.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::path::PathBuf;
use std::rc::Rc;

use comms_if::eqpt::ArmResponse;
use pnp_lib::{
    arm_ctrl::{ArmCtrl, Calibration, GripperState},
    backend::{
        ActuationFailure, DryRunBackend, KillFailure, MotionFailure, ObjectHandle, RobotBackend,
        SimObjectSpec, SimObjects, SpawnFailure,
    },
    grasp::GraspModel,
    input::{ObjectDescriptor, TaskInput},
    path_interp::MotionProfile,
    pose::{Frame, FrameKind, GraspOffset, Pose},
    sim_lifecycle::{KillMode, SimObjectLifecycle},
    task_seq::{
        FailureKind, FailurePolicy, MotionPhase, ObjectStatus, PhaseObserver, PhaseRecord,
        SequencerConfig, TaskSequencer,
    },
};

// ------------------------------------------------------------------------------------------------
// RECORDING BACKEND
// ------------------------------------------------------------------------------------------------

/// Phase the sequencer is currently in, shared between the observer and the backend.
type CurrentPhase = Rc<Cell<Option<(usize, MotionPhase)>>>;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Motion(Frame),
    Gripper(GripperState),
    Spawn(String),
    Kill(String),
}

struct RecordingBackend {
    events: Vec<Event>,
    simulate_objects: bool,
    current: CurrentPhase,

    /// Motions fail while the sequencer is in this phase of this object
    fail_in: Option<(usize, MotionPhase)>,

    /// Names of objects the simulation refuses to spawn
    fail_spawn: HashSet<String>,

    /// Names of objects the simulation refuses to kill
    fail_kill: HashSet<String>,
}

impl RecordingBackend {
    fn new(simulate_objects: bool, current: CurrentPhase) -> Self {
        Self {
            events: Vec::new(),
            simulate_objects,
            current,
            fail_in: None,
            fail_spawn: HashSet::new(),
            fail_kill: HashSet::new(),
        }
    }

    fn motions(&self) -> Vec<Frame> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Motion(f) => Some(*f),
                _ => None,
            })
            .collect()
    }

    fn position_of(&self, event: &Event) -> usize {
        self.events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("{:?} never happened", event))
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl RobotBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn execute_motion(&mut self, target: &Frame) -> Result<(), MotionFailure> {
        if self.fail_in.is_some() && self.current.get() == self.fail_in {
            return Err(MotionFailure::Rejected(ArmResponse::DemsInvalid));
        }

        self.events.push(Event::Motion(*target));
        Ok(())
    }

    fn actuate_gripper(&mut self, state: GripperState) -> Result<(), ActuationFailure> {
        self.events.push(Event::Gripper(state));
        Ok(())
    }

    fn sim_objects(&mut self) -> Option<&mut dyn SimObjects> {
        if self.simulate_objects {
            Some(self)
        } else {
            None
        }
    }
}

impl SimObjects for RecordingBackend {
    fn spawn_object(&mut self, spec: &SimObjectSpec) -> Result<ObjectHandle, SpawnFailure> {
        self.events.push(Event::Spawn(spec.name.clone()));
        if self.fail_spawn.contains(&spec.name) {
            return Err(SpawnFailure::Rejected("no room on the table".into()));
        }
        Ok(ObjectHandle::from(spec))
    }

    fn kill_object(&mut self, handle: &ObjectHandle) -> Result<(), KillFailure> {
        self.events.push(Event::Kill(handle.name.clone()));
        if self.fail_kill.contains(&handle.name) {
            return Err(KillFailure::Rejected("object is held".into()));
        }
        Ok(())
    }
}

/// Records the phases started by the sequencer.
struct PhaseRecorder {
    current: CurrentPhase,
    started: Rc<RefCell<Vec<(usize, MotionPhase)>>>,
}

impl PhaseObserver for PhaseRecorder {
    fn on_phase_start(&mut self, object: &ObjectDescriptor, phase: MotionPhase) {
        self.current.set(Some((object.index, phase)));
        self.started.borrow_mut().push((object.index, phase));
    }

    fn on_phase_complete(&mut self, _object: &ObjectDescriptor, _record: &PhaseRecord) {
        self.current.set(None);
    }
}

// ------------------------------------------------------------------------------------------------
// HELPERS
// ------------------------------------------------------------------------------------------------

fn config(policy: FailurePolicy) -> SequencerConfig {
    SequencerConfig {
        grasp_offset: GraspOffset {
            dx_mm: 0.0,
            dy_mm: 0.0,
            dz_mm: 5.0,
            theta_deg: 180.0,
        },
        initial_approach_distance_mm: 50.0,
        final_depart_distance_mm: 50.0,
        motion_profile: MotionProfile::Interpolated { delta_mm: 10.0 },
        object_height_mm: 11.4,
        failure_policy: policy,
    }
}

fn bricks(poses: &[Pose]) -> Vec<ObjectDescriptor> {
    poses
        .iter()
        .enumerate()
        .map(|(index, pose)| ObjectDescriptor {
            index,
            pose: *pose,
            name: format!("brick{}", index + 1),
            color: "red".into(),
        })
        .collect()
}

fn three_bricks() -> Vec<ObjectDescriptor> {
    bricks(&[
        Pose::new(-40.0, 150.0, 0.0, -90.0),
        Pose::new(0.0, 150.0, 0.0, -90.0),
        Pose::new(-80.0, 150.0, 0.0, -90.0),
    ])
}

fn destination() -> Pose {
    Pose::new(40.0, 150.0, 0.0, -90.0)
}

fn sequencer(
    config: SequencerConfig,
    kill_mode: Option<KillMode>,
) -> (TaskSequencer, CurrentPhase, Rc<RefCell<Vec<(usize, MotionPhase)>>>) {
    let mut seq = TaskSequencer::new(config).unwrap();
    if let Some(mode) = kill_mode {
        seq = seq.with_lifecycle(SimObjectLifecycle::new(mode));
    }

    let current = CurrentPhase::default();
    let started = Rc::new(RefCell::new(Vec::new()));
    seq.add_observer(Box::new(PhaseRecorder {
        current: current.clone(),
        started: started.clone(),
    }));

    (seq, current, started)
}

fn test_calibration() -> Calibration {
    Calibration {
        base_height_mm: 67.31,
        humerus_length_mm: 146.05,
        ulna_length_mm: 187.325,
        effector_length_mm: 100.0,
        zero_offset_rad: [0.0; 5],
        min_pos_rad: [-PI; 5],
        max_pos_rad: [PI; 5],
        gripper_open_rad: 0.0,
        gripper_closed_rad: 1.2,
    }
}

// ------------------------------------------------------------------------------------------------
// SCENARIOS
// ------------------------------------------------------------------------------------------------

#[test]
fn single_object_without_simulation() {
    let object = bricks(&[Pose::new(-40.0, 150.0, 0.0, -90.0)]);
    let (mut seq, current, started) = sequencer(config(FailurePolicy::AbortBatch), None);
    let mut backend = RecordingBackend::new(false, current);

    let report = seq.run(&mut backend, &object, &destination());

    assert!(report.is_success());
    assert!(report.sim.is_none());

    // Phases in order
    let phases: Vec<MotionPhase> = started.borrow().iter().map(|(_, p)| *p).collect();
    assert_eq!(phases, MotionPhase::ALL.to_vec());
    let recorded: Vec<MotionPhase> = report.objects[0].phases.iter().map(|r| r.phase).collect();
    assert_eq!(recorded, MotionPhase::ALL.to_vec());

    // Gripper opens, closes, opens
    let gripper: Vec<&Event> = backend
        .events
        .iter()
        .filter(|e| matches!(e, Event::Gripper(_)))
        .collect();
    assert_eq!(
        gripper,
        vec![
            &Event::Gripper(GripperState::Open),
            &Event::Gripper(GripperState::Closed),
            &Event::Gripper(GripperState::Open)
        ]
    );

    // Approach ends exactly at the grasp frame
    let approach = &report.objects[0].phases[0];
    assert!(approach.dispatches - 1 >= 2);

    let motions = backend.motions();
    let grasp = GraspModel::new(config(FailurePolicy::AbortBatch).grasp_offset)
        .grasp_frame(&object[0].pose);
    let last_approach = motions[approach.dispatches - 2];
    assert_eq!(last_approach.kind, FrameKind::Grasp);
    assert_eq!(last_approach.iso, grasp.iso);

    // Depart has at least two waypoints and climbs
    let depart = &report.objects[0].phases[2];
    assert_eq!(depart.phase, MotionPhase::Depart);
    assert!(depart.dispatches >= 2);
    let depart_frames = &motions[approach.dispatches - 1..][..depart.dispatches];
    for pair in depart_frames.windows(2) {
        assert!(pair[1].position_mm().z > pair[0].position_mm().z);
    }

    assert_eq!(
        backend.count(|e| matches!(e, Event::Spawn(_) | Event::Kill(_))),
        0
    );
}

#[test]
fn three_objects_stacked_with_simulation() {
    let objects = three_bricks();
    let (mut seq, current, _) = sequencer(
        config(FailurePolicy::AbortBatch),
        Some(KillMode::AfterEach),
    );
    let mut backend = RecordingBackend::new(true, current);

    let report = seq.run(&mut backend, &objects, &destination());

    assert!(report.is_success());
    assert_eq!(report.num_completed(), 3);

    // Objects placed in order on an increasing stack
    let place_z: Vec<f64> = report.objects.iter().map(|o| o.place.z_mm).collect();
    assert!((place_z[1] - 11.4).abs() < 1e-9 && (place_z[2] - 22.8).abs() < 1e-9);

    let release_heights: Vec<f64> = backend
        .events
        .windows(2)
        .filter_map(|w| match (&w[0], &w[1]) {
            (Event::Motion(f), Event::Gripper(GripperState::Open)) if f.kind == FrameKind::Grasp => {
                Some(f.position_mm().z)
            }
            _ => None,
        })
        .collect();
    assert_eq!(release_heights.len(), 3);
    assert!(release_heights.windows(2).all(|w| w[1] > w[0]));

    // All spawned first, each killed straight after its own sequence
    let spawns: Vec<usize> = (1..=3)
        .map(|i| backend.position_of(&Event::Spawn(format!("brick{}", i))))
        .collect();
    let kills: Vec<usize> = (1..=3)
        .map(|i| backend.position_of(&Event::Kill(format!("brick{}", i))))
        .collect();
    let first_motion = backend
        .events
        .iter()
        .position(|e| !matches!(e, Event::Spawn(_)))
        .unwrap();

    assert!(spawns.iter().all(|s| *s < first_motion));
    assert!(kills.windows(2).all(|w| w[0] < w[1]));

    // A kill directly follows the final place depart motion of its object
    for k in kills.iter() {
        match backend.events[k - 1] {
            Event::Motion(f) => assert_eq!(f.kind, FrameKind::Depart),
            ref e => panic!("Kill preceded by {:?}", e),
        }
    }

    let sim = report.sim.unwrap();
    assert_eq!(sim.num_spawned, 3);
    assert_eq!(sim.num_kill_attempts, 3);
    assert!(sim.orphaned.is_empty());
}

#[test]
fn motion_failure_on_second_object() {
    let objects = three_bricks();
    let (mut seq, current, _) = sequencer(
        config(FailurePolicy::ContinueBatch),
        Some(KillMode::Batch),
    );
    let mut backend = RecordingBackend::new(true, current);
    backend.fail_in = Some((1, MotionPhase::Depart));

    let report = seq.run(&mut backend, &objects, &destination());

    assert!(!report.is_success());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    match failures[0].status {
        ObjectStatus::Failed { kind, phase, .. } => {
            assert_eq!(kind, FailureKind::Motion);
            assert_eq!(phase, Some(MotionPhase::Depart));
        }
        ref s => panic!("Unexpected status {:?}", s),
    }

    // Grasp completed, depart didn't
    let phases: Vec<MotionPhase> = report.objects[1].phases.iter().map(|r| r.phase).collect();
    assert_eq!(phases, vec![MotionPhase::Approach, MotionPhase::Grasp]);

    assert_eq!(report.objects[0].status, ObjectStatus::Completed);
    assert_eq!(report.objects[2].status, ObjectStatus::Completed);

    // The failed object is killed before the next object starts, the others at the end
    let kill_2 = backend.position_of(&Event::Kill("brick2".into()));
    let kill_1 = backend.position_of(&Event::Kill("brick1".into()));
    let kill_3 = backend.position_of(&Event::Kill("brick3".into()));
    let last_motion = backend
        .events
        .iter()
        .rposition(|e| matches!(e, Event::Motion(_)))
        .unwrap();

    assert!(matches!(backend.events[kill_2 + 1], Event::Gripper(GripperState::Open)));
    assert!(kill_1 > last_motion && kill_3 > last_motion);
    assert!(kill_2 < last_motion);

    // Stacking stays by index, the third object goes on the third layer
    assert!((report.objects[2].place.z_mm - 22.8).abs() < 1e-9);

    let sim = report.sim.unwrap();
    assert_eq!(sim.num_spawned, sim.num_kill_attempts);
    assert_eq!(sim.num_killed, 3);
}

#[test]
fn spawn_failure_still_sequences_object() {
    let objects = three_bricks();
    let (mut seq, current, _) = sequencer(
        config(FailurePolicy::AbortBatch),
        Some(KillMode::AfterEach),
    );
    let mut backend = RecordingBackend::new(true, current);
    backend.fail_spawn.insert("brick2".into());

    let report = seq.run(&mut backend, &objects, &destination());

    // The object is handled as if placed by hand
    assert_eq!(report.num_completed(), 3);
    let phases: Vec<MotionPhase> = report.objects[1].phases.iter().map(|r| r.phase).collect();
    assert_eq!(phases, MotionPhase::ALL.to_vec());

    // Nothing to kill for it
    assert_eq!(backend.count(|e| *e == Event::Kill("brick2".into())), 0);

    let sim = report.sim.as_ref().unwrap();
    assert_eq!(sim.spawn_failures, vec!["brick2".to_string()]);
    assert_eq!(sim.num_spawned, 2);
    assert_eq!(sim.num_kill_attempts, 2);
    assert!(report.is_success());
}

#[test]
fn kill_failure_orphans_object() {
    let objects = three_bricks();
    let (mut seq, current, _) = sequencer(config(FailurePolicy::AbortBatch), Some(KillMode::Batch));
    let mut backend = RecordingBackend::new(true, current);
    backend.fail_kill.insert("brick1".into());

    let report = seq.run(&mut backend, &objects, &destination());

    // Every object placed, but the run isn't clean
    assert_eq!(report.num_completed(), 3);
    assert_eq!(report.orphaned().to_vec(), vec!["brick1".to_string()]);
    assert!(!report.is_success());

    // One attempt only
    assert_eq!(backend.count(|e| *e == Event::Kill("brick1".into())), 1);
    assert_eq!(report.sim.as_ref().unwrap().num_killed, 2);
    assert!(seq.lifecycle().unwrap().alive().is_empty());
}

#[test]
fn partial_batch_kills_failed_object_by_name() {
    // Resume a task from its second object
    let objects: Vec<ObjectDescriptor> = three_bricks().into_iter().skip(1).collect();
    let (mut seq, current, _) = sequencer(
        config(FailurePolicy::ContinueBatch),
        Some(KillMode::Batch),
    );
    let mut backend = RecordingBackend::new(true, current);
    backend.fail_in = Some((1, MotionPhase::Transport));

    let report = seq.run(&mut backend, &objects, &destination());

    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].name, "brick2");

    // The failed object goes straight away, the completed one at the end
    let kill_2 = backend.position_of(&Event::Kill("brick2".into()));
    let kill_3 = backend.position_of(&Event::Kill("brick3".into()));
    let last_motion = backend
        .events
        .iter()
        .rposition(|e| matches!(e, Event::Motion(_)))
        .unwrap();

    assert!(kill_2 < last_motion);
    assert!(kill_3 > last_motion);
    assert_eq!(backend.count(|e| matches!(e, Event::Kill(_))), 2);
}

#[test]
fn duplicate_names_spawn_nothing() {
    let mut objects = three_bricks();
    objects[2].name = objects[0].name.clone();
    let (mut seq, current, _) = sequencer(config(FailurePolicy::AbortBatch), Some(KillMode::Batch));
    let mut backend = RecordingBackend::new(true, current);

    let report = seq.run(&mut backend, &objects, &destination());

    // Sequencing goes ahead with objects placed by hand
    assert_eq!(report.num_completed(), 3);
    assert_eq!(
        backend.count(|e| matches!(e, Event::Spawn(_) | Event::Kill(_))),
        0
    );
    assert_eq!(report.sim.unwrap().num_spawned, 0);
}

#[test]
fn abort_batch_skips_remaining_objects() {
    let objects = three_bricks();
    let (mut seq, current, _) = sequencer(config(FailurePolicy::AbortBatch), Some(KillMode::Batch));
    let mut backend = RecordingBackend::new(true, current);
    backend.fail_in = Some((0, MotionPhase::Transport));

    let report = seq.run(&mut backend, &objects, &destination());

    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.objects[1].status, ObjectStatus::Skipped);
    assert_eq!(report.objects[2].status, ObjectStatus::Skipped);

    // Nothing left behind, including objects never sequenced
    assert_eq!(backend.count(|e| matches!(e, Event::Kill(_))), 3);
    assert!(seq.lifecycle().unwrap().alive().is_empty());
}

#[test]
fn cancellation_stops_dispatch() {
    struct CancelOnTransport(pnp_lib::task_seq::CancelToken);

    impl PhaseObserver for CancelOnTransport {
        fn on_phase_start(&mut self, _object: &ObjectDescriptor, phase: MotionPhase) {
            if phase == MotionPhase::Transport {
                self.0.cancel();
            }
        }
    }

    let objects = three_bricks();
    let (mut seq, current, _) = sequencer(
        config(FailurePolicy::ContinueBatch),
        Some(KillMode::Batch),
    );
    let token = seq.cancel_token();
    seq.add_observer(Box::new(CancelOnTransport(token)));
    let mut backend = RecordingBackend::new(true, current);

    let report = seq.run(&mut backend, &objects, &destination());

    assert!(report.cancelled);
    assert!(!report.is_success());

    // The last motion is the end of the first depart
    let last_motion = backend.motions().last().copied().unwrap();
    assert_eq!(last_motion.kind, FrameKind::Depart);
    assert!(matches!(
        report.objects[0].status,
        ObjectStatus::Failed {
            kind: FailureKind::Cancelled,
            ..
        }
    ));
    assert_eq!(report.objects[1].status, ObjectStatus::Skipped);

    // Cleanup still happens
    assert_eq!(report.sim.unwrap().num_killed, 3);
}

#[test]
fn dry_run_solves_every_frame() {
    let objects = three_bricks();
    let (mut seq, _, _) = sequencer(config(FailurePolicy::AbortBatch), Some(KillMode::Batch));
    let mut backend = DryRunBackend::new(Some(ArmCtrl::new(test_calibration())), true);

    let report = seq.run(&mut backend, &objects, &destination());

    assert!(report.is_success(), "{:#?}", report);
    assert_eq!(
        backend.num_motions(),
        report
            .objects
            .iter()
            .flat_map(|o| o.phases.iter())
            .map(|r| r.dispatches)
            .sum::<usize>()
            - backend.num_gripper_actions()
    );
    assert!(backend.alive_objects().is_empty());
}

#[test]
fn unreachable_object_fails() {
    let objects = bricks(&[Pose::new(600.0, 0.0, 0.0, 0.0)]);
    let (mut seq, _, _) = sequencer(config(FailurePolicy::AbortBatch), None);
    let mut backend = DryRunBackend::new(Some(ArmCtrl::new(test_calibration())), false);

    let report = seq.run(&mut backend, &objects, &destination());

    match report.objects[0].status {
        ObjectStatus::Failed { kind, phase, .. } => {
            assert_eq!(kind, FailureKind::Motion);
            assert_eq!(phase, Some(MotionPhase::Approach));
        }
        ref s => panic!("Unexpected status {:?}", s),
    }
    assert_eq!(backend.num_motions(), 0);
}

#[test]
fn shipped_task_runs_dry() {
    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data");
    let task = TaskInput::load(data_dir.join("pnp_input.txt")).unwrap();
    let arm_ctrl = ArmCtrl::load(&task.calibration_path).unwrap();

    let objects = task.describe(&[], &[]);
    let (mut seq, _, _) = sequencer(config(FailurePolicy::AbortBatch), None);
    let mut backend = DryRunBackend::new(Some(arm_ctrl), false);

    let report = seq.run(&mut backend, &objects, &task.destination);

    assert_eq!(report.objects.len(), 3);
    assert!(report.is_success(), "{:#?}", report);
}
