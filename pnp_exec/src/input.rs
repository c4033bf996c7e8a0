//! # Task input
//!
//! Parses the task input file. The file is a whitespace separated list of tokens:
//!
//! ```text
//! al5d_calibration.toml
//! -40 150 0 -90
//!   0 150 0 -90
//!  40 150 0 -90
//!  40 200 0 -90
//! ```
//!
//! The first token names the arm calibration file, relative to the directory holding the input
//! file. It is followed by groups of four numbers (x, y, z in millimetres and the rotation about
//! the vertical axis in degrees). Every group is an object to pick except the last, which is the
//! destination all objects are stacked on. Line breaks carry no meaning beyond error reporting.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::SimObjectSpec;
use crate::pose::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of values in each pose group.
const VALUES_PER_POSE: usize = 4;

/// Colour used when none are configured.
const DEFAULT_COLOR: &str = "red";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A parsed task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInput {
    /// Calibration identifier as given in the file
    pub calibration_id: String,

    /// Path to the calibration file
    pub calibration_path: PathBuf,

    /// Poses of the objects to pick, in pick order
    pub objects: Vec<Pose>,

    pub destination: Pose,
}

/// An object of the task together with its simulation identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDescriptor {
    pub index: usize,
    pub pose: Pose,
    pub name: String,
    pub color: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Could not read the input file {0:?}: {1}")]
    LoadError(PathBuf, std::io::Error),

    #[error("The input file doesn't name a calibration file")]
    MissingCalibration,

    #[error("Line {line}: expected a number, found {token:?}")]
    InvalidValue { line: usize, token: String },

    #[error("Line {line}: {token} is not a finite number")]
    NonFiniteValue { line: usize, token: String },

    #[error(
        "Found {0} pose values, which is not a whole number of poses (4 values each). Is the file \
        truncated?"
    )]
    IncompletePose(usize),

    #[error("The input file must contain at least one object and a destination, found {0} pose(s)")]
    NotEnoughPoses(usize),

    #[error("Expected {expected} objects but the input file contains {found}")]
    UnexpectedObjectCount { expected: usize, found: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskInput {
    /// Load the task input file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();

        let text = fs::read_to_string(path)
            .map_err(|e| InputError::LoadError(path.to_path_buf(), e))?;

        Self::parse(&text, path.parent().unwrap_or_else(|| Path::new("")))
    }

    /// Parse the contents of an input file, resolving the calibration file relative to
    /// `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, InputError> {
        // Tokens along with their 1-based line number
        let mut tokens = text
            .lines()
            .enumerate()
            .flat_map(|(i, l)| l.split_whitespace().map(move |t| (i + 1, t)));

        let calibration_id = match tokens.next() {
            Some((_, t)) => t.to_string(),
            None => return Err(InputError::MissingCalibration),
        };

        let mut values = Vec::new();
        for (line, token) in tokens {
            let v: f64 = token.parse().map_err(|_| InputError::InvalidValue {
                line,
                token: token.into(),
            })?;

            if !v.is_finite() {
                return Err(InputError::NonFiniteValue {
                    line,
                    token: token.into(),
                });
            }

            values.push(v);
        }

        // A calibration id that parses as a number means the id itself is missing
        if calibration_id.parse::<f64>().is_ok() {
            return Err(InputError::MissingCalibration);
        }

        if values.len() % VALUES_PER_POSE != 0 {
            return Err(InputError::IncompletePose(values.len()));
        }

        let mut poses: Vec<Pose> = values
            .chunks(VALUES_PER_POSE)
            .map(|c| Pose::new(c[0], c[1], c[2], c[3]))
            .collect();

        if poses.len() < 2 {
            return Err(InputError::NotEnoughPoses(poses.len()));
        }

        // Length checked above
        let destination = poses.pop().ok_or(InputError::NotEnoughPoses(0))?;

        Ok(Self {
            calibration_path: base_dir.join(&calibration_id),
            calibration_id,
            objects: poses,
            destination,
        })
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Refuse the task if it doesn't contain the expected number of objects.
    pub fn check_object_count(&self, expected: Option<usize>) -> Result<(), InputError> {
        match expected {
            Some(expected) if expected != self.objects.len() => {
                Err(InputError::UnexpectedObjectCount {
                    expected,
                    found: self.objects.len(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Name the objects of the task.
    ///
    /// Names and colours are taken from the given lists in order. If there are more objects than
    /// names the names are reused with a numeric suffix (`brick1`, `brick2`, `brick1_2`, ...),
    /// colours are simply reused. Names are unique: a name already taken, for instance through a
    /// repeat in `names`, gets a further suffix.
    pub fn describe(&self, names: &[String], colors: &[String]) -> Vec<ObjectDescriptor> {
        let mut used = HashSet::new();

        self.objects
            .iter()
            .enumerate()
            .map(|(index, pose)| ObjectDescriptor {
                index,
                pose: *pose,
                name: unique_name(object_name(names, index), &mut used),
                color: match colors.len() {
                    0 => DEFAULT_COLOR.to_string(),
                    n => colors[index % n].clone(),
                },
            })
            .collect()
    }
}

impl ObjectDescriptor {
    /// The simulated object representing this object.
    pub fn sim_spec(&self) -> SimObjectSpec {
        SimObjectSpec {
            name: self.name.clone(),
            color: self.color.clone(),
            pose: self.pose,
        }
    }
}

fn unique_name(base: String, used: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 2;

    while used.contains(&name) {
        name = format!("{}_{}", base, n);
        n += 1;
    }

    used.insert(name.clone());
    name
}

fn object_name(names: &[String], index: usize) -> String {
    match names.len() {
        0 => format!("object{}", index + 1),
        n if index < n => names[index].clone(),
        n => format!("{}_{}", names[index % n], index / n + 1),
    }
}
