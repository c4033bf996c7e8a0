//! # Pick and place library.
//!
//! Sequences a 5 axis arm through picking objects from given poses and stacking them on a common
//! destination. The library allows the executable, tests and benchmarks to access the items
//! defined inside the crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control - inverse kinematics from gripper frames to joint demands
pub mod arm_ctrl;

/// Arm client - sends joint and gripper demands to the arm server
pub mod arm_client;

/// Robot backends - physical, simulated and dry run
pub mod backend;

/// Grasp model - grasp, approach and depart frames of an object
pub mod grasp;

/// Task input file parsing
pub mod input;

/// Executable parameters
pub mod params;

/// Path interpolation - waypoints along the approach axis
pub mod path_interp;

/// Poses and rigid frames
pub mod pose;

/// Simulation client - spawns and kills objects in the simulator
pub mod sim_client;

/// Simulated object lifecycle
pub mod sim_lifecycle;

/// Stack planning
pub mod stack;

/// Task sequencer - runs the pick and place phases of every object
pub mod task_seq;
