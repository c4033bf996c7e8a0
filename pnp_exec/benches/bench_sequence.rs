//! # Sequence Planning Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pnp_lib::{
    arm_ctrl::{ArmCtrl, Calibration},
    path_interp::MotionProfile,
    pose::{GraspOffset, Pose},
    task_seq::{FailurePolicy, SequencerConfig, Step, TaskSequencer},
};

fn sequence_benchmark(c: &mut Criterion) {
    // ---- Build a fine grained sequencer ----

    let sequencer = TaskSequencer::new(SequencerConfig {
        grasp_offset: GraspOffset::default(),
        initial_approach_distance_mm: 50.0,
        final_depart_distance_mm: 50.0,
        motion_profile: MotionProfile::Interpolated { delta_mm: 0.5 },
        object_height_mm: 11.4,
        failure_policy: FailurePolicy::AbortBatch,
    })
    .unwrap();

    let arm_ctrl = ArmCtrl::new(Calibration {
        base_height_mm: 67.31,
        humerus_length_mm: 146.05,
        ulna_length_mm: 187.325,
        effector_length_mm: 100.0,
        zero_offset_rad: [0.0; 5],
        min_pos_rad: [-std::f64::consts::PI; 5],
        max_pos_rad: [std::f64::consts::PI; 5],
        gripper_open_rad: 0.0,
        gripper_closed_rad: 1.2,
    });

    let pick = Pose::new(-40.0, 150.0, 0.0, -90.0);
    let place = Pose::new(40.0, 150.0, 22.8, -90.0);

    // ---- Benchmarks ----

    c.bench_function("plan_object", |b| {
        b.iter(|| sequencer.plan_object(black_box(&pick), black_box(&place)))
    });

    let plan = sequencer.plan_object(&pick, &place).unwrap();

    c.bench_function("solve_object", |b| {
        b.iter(|| {
            for phase in plan.iter() {
                for step in phase.steps.iter() {
                    if let Step::Move(frame) = step {
                        black_box(arm_ctrl.solve(frame).unwrap());
                    }
                }
            }
        })
    });
}

criterion_group!(benches, sequence_benchmark);
criterion_main!(benches);
