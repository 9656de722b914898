//! Real-time position-based gas simulation.
//!
//! Particles advance under gravity, wind and damping, then an iterative
//! density constraint projects their predicted positions back toward the
//! rest density (Macklin & Müller style position based fluids). Solid
//! geometry enters through a raycast trait the host implements; contact
//! surfaces are sampled into small point patches the solver treats as
//! static virtual particles. After the solve, velocities pick up a drag
//! blend, a Boussinesq buoyancy/vorticity term and XSPH viscosity.
//!
//! The host drives one [`GasSimulation3D`] per gas volume:
//!
//! ```
//! use gas3d::{GasParams, GasProperties, GasSimulation3D, NoBoundaries};
//! use glam::Vec3;
//!
//! let mut sim = GasSimulation3D::new(GasParams::default(), NoBoundaries);
//! sim.spawn_box(Vec3::ZERO, Vec3::splat(2.0), GasProperties::default());
//! assert!(sim.particles.len() > 0);
//!
//! for _ in 0..10 {
//!     sim.step(1.0 / 60.0);
//! }
//! assert!(sim.particles.list.iter().all(|p| p.position.is_finite()));
//! ```

pub mod boundary;
pub mod constants;
pub mod emitter;
pub mod forces;
pub mod kernel;
pub mod particle;
pub mod region;
pub mod serde_utils;
pub mod solver;
pub mod spatial_hash;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{BOUSSINESQ_LIFT, BUOYANCY_GRAVITY, DRAG_COEFF, KERNEL_RADIUS_FACTOR};
use crate::emitter::default_mass;
use crate::kernel::CubicKernel;
use crate::serde_utils::{deserialize_vec3, serialize_vec3};
use crate::solver::DensityConstraint;
use crate::spatial_hash::ParticleHash;

pub use crate::boundary::{BoundaryQuery, ContactPatches, NoBoundaries, RayHit};
pub use crate::emitter::{box_positions, sphere_positions, RuntimeEmitter};
pub use crate::forces::{Forces, Wind, WindVolume};
pub use crate::particle::{GasProperties, Particle3D, Particles3D};
pub use crate::region::{GasRegion, RegionObserver, RegionTracker};

/// Host-facing simulation parameters. Fixed at construction; the kernel
/// support radius and hash cell size are both `particle_radius * 4`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GasParams {
    pub particle_radius: f32,
    /// Hard particle capacity; spawns past it are truncated.
    pub max_particles: usize,
    /// Density solver iterations per step.
    pub solver_iterations: usize,
    /// Particles farther than this from `origin` are retired.
    pub max_travel: f32,
    /// Spawn origin the travel distance is measured from.
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub origin: Vec3,
    pub forces: Forces,
}

impl Default for GasParams {
    fn default() -> Self {
        Self {
            particle_radius: 0.25,
            max_particles: 8192,
            solver_iterations: 2,
            max_travel: 50.0,
            origin: Vec3::ZERO,
            forces: Forces::default(),
        }
    }
}

/// One simulated gas volume: the particle set, the solver state and the
/// injected boundary geometry.
///
/// [`step`](Self::step) advances the physics; retirement and region
/// feedback run strictly between steps so neighbor indices handed out by
/// the spatial hash never outlive a structural change to the particle
/// list.
pub struct GasSimulation3D<G: BoundaryQuery> {
    pub params: GasParams,
    pub particles: Particles3D,
    kernel: CubicKernel,
    hash: ParticleHash,
    constraint: DensityConstraint,
    geometry: G,
    regions: Option<RegionTracker>,
}

impl<G: BoundaryQuery> GasSimulation3D<G> {
    pub fn new(params: GasParams, geometry: G) -> Self {
        let cell_size = params.particle_radius * KERNEL_RADIUS_FACTOR;
        let kernel = CubicKernel::new(cell_size);
        let hash = ParticleHash::new(cell_size, params.max_particles);
        let constraint =
            DensityConstraint::new(params.particle_radius * 2.0, params.solver_iterations);

        Self {
            particles: Particles3D::with_capacity(params.max_particles),
            kernel,
            hash,
            constraint,
            geometry,
            regions: None,
            params,
        }
    }

    pub fn particle_diameter(&self) -> f32 {
        self.params.particle_radius * 2.0
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Install (or replace) the region tracker density feedback runs on.
    pub fn set_region_tracker(&mut self, tracker: RegionTracker) {
        self.regions = Some(tracker);
    }

    pub fn region_tracker(&self) -> Option<&RegionTracker> {
        self.regions.as_ref()
    }

    /// Fill an axis-aligned box with particles. Returns how many spawned;
    /// the count is truncated at the particle capacity.
    pub fn spawn_box(&mut self, min: Vec3, size: Vec3, props: GasProperties) -> usize {
        let positions = box_positions(min, size, self.params.particle_radius);
        self.admit(positions, props)
    }

    /// Fill a sphere with particles, truncated at the particle capacity.
    pub fn spawn_sphere(&mut self, center: Vec3, radius: f32, props: GasProperties) -> usize {
        let positions = sphere_positions(center, radius, self.params.particle_radius);
        self.admit(positions, props)
    }

    /// Spawn a single particle, e.g. from a [`RuntimeEmitter`]. Returns
    /// false when the capacity is full.
    pub fn spawn_at(&mut self, position: Vec3, props: GasProperties) -> bool {
        self.admit([position], props) == 1
    }

    fn admit(&mut self, positions: impl IntoIterator<Item = Vec3>, props: GasProperties) -> usize {
        let mut props = props;
        if props.mass == 0.0 {
            props.mass = default_mass(self.particle_diameter(), props.rest_density);
        }

        let diameter = self.particle_diameter();
        let capacity = self.hash.capacity();
        let mut spawned = 0;
        for position in positions {
            if self.particles.len() >= capacity {
                log::warn!("particle capacity {} reached, spawn truncated", capacity);
                break;
            }
            self.particles
                .list
                .push(Particle3D::new(position, props, diameter));
            spawned += 1;
        }
        spawned
    }

    /// Advance the simulation by `dt` seconds. A zero `dt` is a no-op.
    pub fn step(&mut self, dt: f32) {
        if dt == 0.0 || self.particles.is_empty() {
            return;
        }

        self.apply_external_forces(dt);
        self.predict_positions(dt);
        self.refresh_contacts();
        self.constraint
            .constrain_positions(&mut self.particles, &self.kernel, &mut self.hash);
        self.update_velocities(dt);
        self.compute_viscosity();
        self.commit_positions();
    }

    /// Retire particles that traveled past `max_travel` from the origin.
    /// Must only run between steps. Returns the number retired.
    pub fn retire_distant(&mut self) -> usize {
        self.particles
            .retire_distant(self.params.origin, self.params.max_travel)
    }

    /// Run the per-region density accounting over the live particles and
    /// hand the result to `observer`. Must only run between steps.
    pub fn report_regions<O: RegionObserver + ?Sized>(&mut self, observer: &mut O) {
        let Some(tracker) = self.regions.as_mut() else {
            return;
        };
        tracker.accumulate(&self.particles, self.params.particle_radius);
        tracker.finish(self.particles.mean_position(), self.particles.len(), observer);
    }

    fn apply_external_forces(&mut self, dt: f32) {
        for p in &mut self.particles.list {
            p.velocity -= p.velocity * p.damping * dt;
        }
        self.params.forces.apply(dt, &mut self.particles);
    }

    fn predict_positions(&mut self, dt: f32) {
        for p in &mut self.particles.list {
            p.predicted = p.position + p.velocity * dt;
        }
    }

    fn refresh_contacts(&mut self) {
        let geometry = &self.geometry;
        for p in &mut self.particles.list {
            let (position, predicted) = (p.position, p.predicted);
            p.contacts.update(position, predicted, geometry);
        }
    }

    /// Derive velocities from the solved position delta, then add the
    /// drag blend and the Boussinesq vorticity force.
    fn update_velocities(&mut self, dt: f32) {
        let inv_dt = 1.0 / dt;
        let drag_target = self.params.forces.drag;
        let n = self.particles.len();

        for i in 0..n {
            let (velocity, drag, vorticity) = {
                let list = &self.particles.list;
                let p = &list[i];

                let velocity = (p.predicted - p.position) * inv_dt;
                let drag = (velocity - drag_target)
                    * -DRAG_COEFF
                    * (1.0 - p.density / p.rest_density);

                // Surface normal estimate: density-weighted neighbor
                // gradients plus raw boundary-sample gradients.
                let mut normal = Vec3::ZERO;
                for &j in self.hash.neighbors(i) {
                    let neighbor = &list[j as usize];
                    normal += self.kernel.grad_w(p.position - neighbor.position)
                        * (neighbor.mass / neighbor.density);
                }
                for s in p.contacts.iter_samples() {
                    normal += self.kernel.grad_w(p.position - s);
                }

                let lift = normal.cross(Vec3::new(0.0, BUOYANCY_GRAVITY, 0.0)) * BOUSSINESQ_LIFT;
                let swirl = p.vorticity.dot(self.kernel.grad_w(velocity));
                let vorticity = (lift + Vec3::splat(swirl)) * dt;

                (velocity, drag, vorticity)
            };
            self.particles.list[i].vorticity = vorticity;

            // Vorticity confinement over the neighborhood; runs after the
            // write above so earlier-indexed neighbors contribute their
            // fresh vorticity, later ones last step's.
            let vort = {
                let list = &self.particles.list;
                let p = &list[i];
                let mut vort = Vec3::ZERO;
                for &j in self.hash.neighbors(i) {
                    let neighbor = &list[j as usize];
                    let d = p.position - neighbor.position;
                    vort += neighbor.vorticity.cross(d) * self.kernel.w(d);
                }
                vort
            };

            let p = &mut self.particles.list[i];
            p.velocity = velocity + (vort + drag) / p.mass * dt;
        }
    }

    /// XSPH-style viscosity: pull each velocity toward its neighbors',
    /// weighted by the kernel and the neighbor's density. Applied in
    /// index order, so earlier particles' smoothed velocities feed into
    /// later ones.
    fn compute_viscosity(&mut self) {
        let n = self.particles.len();
        for i in 0..n {
            let smoothed = {
                let list = &self.particles.list;
                let p = &list[i];
                let viscosity_mul_mass = p.viscosity * p.mass;
                let pi = p.predicted;

                let mut v = p.velocity;
                for &j in self.hash.neighbors(i) {
                    let neighbor = &list[j as usize];
                    let k = self.kernel.w(pi - neighbor.predicted) * viscosity_mul_mass
                        / neighbor.density;
                    v -= (v - neighbor.velocity) * k;
                }
                v
            };
            self.particles.list[i].velocity = smoothed;
        }
    }

    fn commit_positions(&mut self) {
        for p in &mut self.particles.list {
            p.position = p.predicted;
        }
    }
}
