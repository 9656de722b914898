//! Gas particle representation and the insertion-ordered collection.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::boundary::ContactPatches;

/// Per-particle material properties handed in by the host configuration.
///
/// The host is responsible for validating ranges (positive density,
/// damping in `[0, 1]`, ...) before particles are spawned.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GasProperties {
    /// Rest density the constraint solver drives toward.
    pub rest_density: f32,
    /// Particle mass. Zero means "derive from diameter and rest density"
    /// at spawn time (see [`crate::emitter::default_mass`]).
    pub mass: f32,
    /// Velocity damping coefficient applied each step.
    pub damping: f32,
    /// XSPH viscosity coefficient.
    pub viscosity: f32,
    /// Scalar tag accumulated into region densities (toxicity).
    pub toxicity: f32,
}

impl Default for GasProperties {
    fn default() -> Self {
        Self {
            rest_density: 1.0,
            mass: 0.0,
            damping: 0.1,
            viscosity: 0.05,
            toxicity: 1.0,
        }
    }
}

/// A single gas particle.
///
/// `position` is authoritative between steps; `predicted` is the working
/// position during a step. `density` and `lambda` are solver scratch
/// values, only meaningful within the step that wrote them.
#[derive(Clone, Debug)]
pub struct Particle3D {
    pub position: Vec3,
    pub predicted: Vec3,
    pub velocity: Vec3,
    pub vorticity: Vec3,
    pub mass: f32,
    pub rest_density: f32,
    pub damping: f32,
    pub viscosity: f32,
    pub toxicity: f32,
    /// Working density, written by the constraint solver.
    pub density: f32,
    /// Working Lagrange multiplier, written by the constraint solver.
    pub lambda: f32,
    /// Boundary contact patches owned by this particle.
    pub contacts: ContactPatches,
}

impl Particle3D {
    /// Create a particle at rest at the given position. `patch_scale` is
    /// the particle diameter and sizes the boundary sample patches.
    pub fn new(position: Vec3, props: GasProperties, patch_scale: f32) -> Self {
        Self {
            position,
            predicted: position,
            velocity: Vec3::ZERO,
            vorticity: Vec3::ZERO,
            mass: props.mass,
            rest_density: props.rest_density,
            damping: props.damping,
            viscosity: props.viscosity,
            toxicity: props.toxicity,
            density: 0.0,
            lambda: 0.0,
            contacts: ContactPatches::new(patch_scale),
        }
    }
}

/// Insertion-ordered particle collection.
///
/// Indices into `list` are what the spatial hash hands out as neighbor
/// references; they stay valid only until the next structural mutation,
/// so removal happens strictly between steps.
#[derive(Debug, Default)]
pub struct Particles3D {
    pub list: Vec<Particle3D>,
}

impl Particles3D {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Remove particles farther than `max_travel` from `origin`,
    /// preserving insertion order. Returns the number retired.
    pub fn retire_distant(&mut self, origin: Vec3, max_travel: f32) -> usize {
        let before = self.list.len();
        self.list
            .retain(|p| p.position.distance(origin) < max_travel);
        before - self.list.len()
    }

    /// Mean of all particle positions, or zero when empty.
    pub fn mean_position(&self) -> Vec3 {
        if self.list.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = self.list.iter().map(|p| p.position).sum();
        sum / self.list.len() as f32
    }
}
