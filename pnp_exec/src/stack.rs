//! # Stack planning
//!
//! Objects sharing a destination are stacked on top of one another. Object `i` is placed at
//! `base_z + i * height`, so objects must be placed in index order: object 0 forms the bottom of
//! the stack and every later object rests on the one before it. Placing out of order would leave
//! an object hanging above a layer that doesn't exist yet, this is a precondition of the caller
//! and isn't checked here.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::pose::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Height of the standard brick.
///
/// Units: millimetres
pub const BRICK_HEIGHT_MM: f64 = 11.4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Computes stacked destination poses.
#[derive(Debug, Clone, Copy)]
pub struct StackPlanner {
    object_height_mm: f64,
}

/// The placement height of one object in a stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StackEntry {
    pub object_index: usize,
    pub destination_z_mm: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StackError {
    #[error("Object height must be a positive finite number, found {0} mm")]
    InvalidHeight(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StackPlanner {
    pub fn new(object_height_mm: f64) -> Result<Self, StackError> {
        if !object_height_mm.is_finite() || object_height_mm <= 0.0 {
            return Err(StackError::InvalidHeight(object_height_mm));
        }

        Ok(Self { object_height_mm })
    }

    pub fn object_height_mm(&self) -> f64 {
        self.object_height_mm
    }

    /// Heights of `num_objects` objects stacked on `destination`.
    pub fn entries(&self, destination: &Pose, num_objects: usize) -> Vec<StackEntry> {
        (0..num_objects)
            .map(|object_index| StackEntry {
                object_index,
                destination_z_mm: destination.z_mm
                    + object_index as f64 * self.object_height_mm,
            })
            .collect()
    }

    /// Destination poses of `num_objects` objects stacked on `destination`, in placement order.
    pub fn plan(&self, destination: &Pose, num_objects: usize) -> Vec<Pose> {
        self.entries(destination, num_objects)
            .iter()
            .map(|e| destination.with_z(e.destination_z_mm))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_brick_stack() {
        let planner = StackPlanner::new(BRICK_HEIGHT_MM).unwrap();
        let poses = planner.plan(&Pose::new(40.0, 150.0, 0.0, -90.0), 3);

        let z: Vec<f64> = poses.iter().map(|p| p.z_mm).collect();
        assert_eq!(z, vec![0.0, 11.4, 22.8]);

        for pair in poses.windows(2) {
            assert!(pair[1].z_mm > pair[0].z_mm);
            assert!((pair[1].z_mm - pair[0].z_mm - BRICK_HEIGHT_MM).abs() < 1e-9);
        }

        // Only the height changes
        assert!(poses
            .iter()
            .all(|p| p.x_mm == 40.0 && p.y_mm == 150.0 && p.phi_deg == -90.0));
    }

    #[test]
    fn test_raised_base() {
        let planner = StackPlanner::new(20.0).unwrap();
        let entries = planner.entries(&Pose::new(0.0, 0.0, 5.0, 0.0), 2);

        assert_eq!(
            entries,
            vec![
                StackEntry {
                    object_index: 0,
                    destination_z_mm: 5.0
                },
                StackEntry {
                    object_index: 1,
                    destination_z_mm: 25.0
                },
            ]
        );
    }

    #[test]
    fn test_invalid_height() {
        assert_eq!(StackPlanner::new(0.0).unwrap_err(), StackError::InvalidHeight(0.0));
        assert!(StackPlanner::new(-11.4).is_err());
        assert!(StackPlanner::new(std::f64::NAN).is_err());
        assert!(StackPlanner::new(11.4).unwrap().plan(&Pose::new(0.0, 0.0, 0.0, 0.0), 0).is_empty());
    }
}
