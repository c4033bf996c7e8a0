//! # Simulated object lifecycle
//!
//! Keeps track of the objects spawned into the simulation for a task, and makes sure each one is
//! removed again. Every spawned object gets exactly one kill attempt: right after its own sequence
//! (in [`KillMode::AfterEach`]), as soon as its sequence fails, or at the end of the batch.
//!
//! Objects are identified by name, which must be unique within a task.
//!
//! Failures here never stop the task. A failed spawn is equivalent to an operator forgetting to
//! place an object and a failed kill leaves the object orphaned in the simulation, both are
//! reported at the end of the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::backend::{KillFailure, ObjectHandle, SimObjectSpec, SimObjects};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Registry of the simulated objects of a task.
#[derive(Debug)]
pub struct SimObjectLifecycle {
    kill_mode: KillMode,

    /// Registered objects in spawn order, names are unique
    objects: Vec<SimulatedObject>,

    num_spawned: usize,
    num_kill_attempts: usize,
}

/// An object in the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedObject {
    pub spec: SimObjectSpec,
    pub state: ObjectState,

    /// Why the last spawn or kill of this object failed
    pub error: Option<String>,

    #[serde(skip)]
    handle: Option<ObjectHandle>,
}

/// Summary of the objects handled by a lifecycle, produced at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LifecycleSummary {
    pub num_spawned: usize,
    pub num_kill_attempts: usize,
    pub num_killed: usize,

    /// Names of the objects which could not be spawned
    pub spawn_failures: Vec<String>,

    /// Names of the objects left in the simulation
    pub orphaned: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// When simulated objects are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillMode {
    /// Remove all objects once every sequence has finished, leaving the finished stack visible
    /// until then.
    Batch,

    /// Remove each object as soon as its own sequence completes.
    AfterEach,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LifecycleError {
    #[error("Simulated object name {0:?} is used by more than one object")]
    DuplicateName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectState {
    NotSpawned,
    Alive,
    Killed,

    /// A kill was attempted and failed, the object may still be in the simulation.
    Orphaned,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for KillMode {
    fn default() -> Self {
        KillMode::Batch
    }
}

impl SimObjectLifecycle {
    pub fn new(kill_mode: KillMode) -> Self {
        Self {
            kill_mode,
            objects: Vec::new(),
            num_spawned: 0,
            num_kill_attempts: 0,
        }
    }

    pub fn kill_mode(&self) -> KillMode {
        self.kill_mode
    }

    pub fn objects(&self) -> &[SimulatedObject] {
        &self.objects
    }

    /// Names of the objects currently alive.
    pub fn alive(&self) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|o| o.state == ObjectState::Alive)
            .map(|o| o.spec.name.as_str())
            .collect()
    }

    /// Register and spawn one object per task object, in order.
    ///
    /// Nothing is spawned if two of the specs share a name. Objects whose name is already
    /// registered and alive are not spawned again.
    pub fn spawn_all(
        &mut self,
        specs: &[SimObjectSpec],
        sim: &mut dyn SimObjects,
    ) -> Result<(), LifecycleError> {
        let mut names = HashSet::new();
        if let Some(dup) = specs.iter().find(|s| !names.insert(s.name.as_str())) {
            return Err(LifecycleError::DuplicateName(dup.name.clone()));
        }

        for spec in specs {
            let index = match self.position(&spec.name) {
                Some(i) if self.objects[i].state == ObjectState::Alive => {
                    debug!("{} is already alive, not spawning it again", spec.name);
                    continue;
                }
                Some(i) => i,
                None => {
                    self.objects.push(SimulatedObject {
                        spec: spec.clone(),
                        state: ObjectState::NotSpawned,
                        error: None,
                        handle: None,
                    });
                    self.objects.len() - 1
                }
            };

            let object = &mut self.objects[index];

            match sim.spawn_object(spec) {
                Ok(handle) => {
                    info!(
                        "Spawned {} ({}) at ({:.2}, {:.2}, {:.2}, {:.2})",
                        spec.name,
                        spec.color,
                        spec.pose.x_mm,
                        spec.pose.y_mm,
                        spec.pose.z_mm,
                        spec.pose.phi_deg
                    );
                    object.state = ObjectState::Alive;
                    object.error = None;
                    object.handle = Some(handle);
                    self.num_spawned += 1;
                }
                Err(e) => {
                    warn!("Could not spawn {}, it must be placed by hand: {}", spec.name, e);
                    object.state = ObjectState::NotSpawned;
                    object.error = Some(e.to_string());
                }
            }
        }

        Ok(())
    }

    /// Called once the sequence of the object named `name` has completed.
    pub fn on_object_complete(&mut self, name: &str, sim: &mut dyn SimObjects) {
        if self.kill_mode == KillMode::AfterEach {
            self.kill_named(name, sim);
        }
    }

    /// Called when the sequence of the object named `name` has failed. The object is removed
    /// straight away regardless of the kill mode.
    pub fn on_object_failed(&mut self, name: &str, sim: &mut dyn SimObjects) {
        self.kill_named(name, sim);
    }

    /// Remove every object still alive and summarise the lifecycle.
    pub fn finish(&mut self, sim: &mut dyn SimObjects) -> LifecycleSummary {
        for index in 0..self.objects.len() {
            self.kill(index, sim);
        }

        let summary = self.summary();

        if !summary.orphaned.is_empty() {
            warn!(
                "{} object(s) could not be removed from the simulation: {:?}",
                summary.orphaned.len(),
                summary.orphaned
            );
        }

        summary
    }

    pub fn summary(&self) -> LifecycleSummary {
        let names_in = |state: ObjectState| -> Vec<String> {
            self.objects
                .iter()
                .filter(|o| o.state == state)
                .map(|o| o.spec.name.clone())
                .collect()
        };

        LifecycleSummary {
            num_spawned: self.num_spawned,
            num_kill_attempts: self.num_kill_attempts,
            num_killed: names_in(ObjectState::Killed).len(),
            spawn_failures: self
                .objects
                .iter()
                .filter(|o| o.state == ObjectState::NotSpawned && o.error.is_some())
                .map(|o| o.spec.name.clone())
                .collect(),
            orphaned: names_in(ObjectState::Orphaned),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.spec.name == name)
    }

    fn kill_named(&mut self, name: &str, sim: &mut dyn SimObjects) {
        match self.position(name) {
            Some(index) => self.kill(index, sim),
            None => debug!("{} was never registered, nothing to kill", name),
        }
    }

    /// Kill the registered object at `index` if it's alive, otherwise do nothing.
    fn kill(&mut self, index: usize, sim: &mut dyn SimObjects) {
        let object = match self.objects.get_mut(index) {
            Some(o) if o.state == ObjectState::Alive => o,
            _ => return,
        };

        let handle = match object.handle.take() {
            Some(h) => h,
            None => return,
        };

        self.num_kill_attempts += 1;

        match sim.kill_object(&handle) {
            Ok(()) => {
                info!("Killed {}", handle.name);
                object.state = ObjectState::Killed;
            }
            // Already gone from the simulation, which is all a kill is for
            Err(KillFailure::UnknownObject(name)) => {
                warn!("{} was already missing from the simulation", name);
                object.state = ObjectState::Killed;
            }
            Err(e) => {
                warn!("Could not kill {}: {}", handle.name, e);
                object.state = ObjectState::Orphaned;
                object.error = Some(e.to_string());
            }
        }
    }
}

impl Drop for SimObjectLifecycle {
    fn drop(&mut self) {
        let alive = self.alive();

        if !alive.is_empty() {
            warn!(
                "Simulated object registry dropped with {} object(s) still alive: {:?}",
                alive.len(),
                alive
            );
        }
    }
}
