//! Iterative density constraint solver (position based fluids).
//!
//! Each iteration runs two passes over all particles: first densities and
//! Lagrange multipliers for everyone, then position corrections. The
//! multipliers are always computed from the pre-correction predicted
//! positions of the whole set, never from partially corrected state.
//!
//! Solid boundaries enter the density as virtual particles: every contact
//! patch sample contributes with a weight from the Psi table, indexed by
//! how many contact faces the particle currently tracks.

use glam::Vec3;

use crate::boundary::MAX_CONTACT_NORMALS;
use crate::constants::{LAMBDA_EPSILON, PSI_ADJUST_FACTOR, PSI_ADJUST_THRESHOLD};
use crate::kernel::CubicKernel;
use crate::particle::Particles3D;
use crate::spatial_hash::ParticleHash;

/// Boundary-density contribution weights, indexed by contact count - 1.
const PSI_BASE: [f32; MAX_CONTACT_NORMALS] = [
    0.717662382055,
    0.617662382055,
    0.517662382055,
    0.417662382055,
    0.317662382055,
];

/// The density constraint and its iteration schedule.
#[derive(Debug)]
pub struct DensityConstraint {
    psi: [f32; MAX_CONTACT_NORMALS],
    iterations: usize,
    /// Scratch copy of predicted positions for the neighborhood search.
    predicted: Vec<Vec3>,
}

impl DensityConstraint {
    /// Build the constraint for particles of the given diameter. Large
    /// particles shift the whole Psi table once, here at construction.
    pub fn new(particle_diameter: f32, iterations: usize) -> Self {
        let mut psi = PSI_BASE;
        if particle_diameter > PSI_ADJUST_THRESHOLD {
            for entry in &mut psi {
                *entry += particle_diameter * PSI_ADJUST_FACTOR;
            }
        }
        Self {
            psi,
            iterations,
            predicted: Vec::new(),
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Psi weight for a particle tracking `normal_count` contact faces.
    #[inline]
    fn psi_weight(&self, normal_count: usize) -> f32 {
        if normal_count == 0 {
            0.0
        } else {
            self.psi[(normal_count - 1).min(MAX_CONTACT_NORMALS - 1)]
        }
    }

    /// Project the density constraint onto the predicted positions.
    ///
    /// Performs one neighborhood search up front; the neighbor lists stay
    /// fixed across the configured iterations. Ends by advancing the hash
    /// epoch so the next step starts from logically empty buckets.
    pub fn constrain_positions(
        &mut self,
        particles: &mut Particles3D,
        kernel: &CubicKernel,
        hash: &mut ParticleHash,
    ) {
        let n = particles.len();

        self.predicted.clear();
        self.predicted.extend(particles.list.iter().map(|p| p.predicted));
        hash.neighborhood_search(&self.predicted);

        for _ in 0..self.iterations {
            // Densities and multipliers for every particle before any
            // correction is applied.
            for i in 0..n {
                let (density, lambda) = self.density_and_lambda(particles, kernel, hash, i);
                particles.list[i].density = density;
                particles.list[i].lambda = lambda;
            }

            for i in 0..n {
                let corr = self.position_correction(particles, kernel, hash, i);
                particles.list[i].predicted += corr;
            }
        }

        hash.increment_time_stamp();
    }

    fn density_and_lambda(
        &self,
        particles: &Particles3D,
        kernel: &CubicKernel,
        hash: &ParticleHash,
        i: usize,
    ) -> (f32, f32) {
        let list = &particles.list;
        let p = &list[i];
        let pi = p.predicted;
        let psi = self.psi_weight(p.contacts.normal_count());

        let mut density = p.mass * kernel.w_zero();
        for &j in hash.neighbors(i) {
            density += p.mass * kernel.w(pi - list[j as usize].predicted);
        }
        for s in p.contacts.iter_samples() {
            density += psi * kernel.w(pi - s);
        }

        let inv_density = 1.0 / p.rest_density;
        let mass_mul_inv_density = p.mass * inv_density;

        // Under-density never pulls particles together.
        let c = (density * inv_density - 1.0).max(0.0);
        if c == 0.0 {
            return (density, 0.0);
        }

        let mut sum_grad_c2 = 0.0;
        let mut grad_ci = Vec3::ZERO;

        for &j in hash.neighbors(i) {
            let grad_w = kernel.grad_w(pi - list[j as usize].predicted);
            let grad_cj = grad_w * -mass_mul_inv_density;
            sum_grad_c2 += grad_cj.length_squared();
            grad_ci -= grad_cj;
        }
        let psi_factor = -psi * inv_density;
        for s in p.contacts.iter_samples() {
            let grad_cj = kernel.grad_w(pi - s) * psi_factor;
            sum_grad_c2 += grad_cj.length_squared();
            grad_ci -= grad_cj;
        }
        sum_grad_c2 += grad_ci.length_squared();

        (density, -c / (sum_grad_c2 + LAMBDA_EPSILON))
    }

    fn position_correction(
        &self,
        particles: &Particles3D,
        kernel: &CubicKernel,
        hash: &ParticleHash,
        i: usize,
    ) -> Vec3 {
        let list = &particles.list;
        let p = &list[i];
        let pi = p.predicted;
        let inv_density = 1.0 / p.rest_density;
        let mass_mul_inv_density = p.mass * inv_density;
        let psi = self.psi_weight(p.contacts.normal_count());

        let mut corr = Vec3::ZERO;

        for &j in hash.neighbors(i) {
            let neighbor = &list[j as usize];
            let grad_w = kernel.grad_w(pi - neighbor.predicted);
            let lambda = (p.lambda + neighbor.lambda) * -mass_mul_inv_density;
            corr -= grad_w * lambda;
        }

        let boundary_lambda = p.lambda * -psi * inv_density;
        for s in p.contacts.iter_samples() {
            corr -= kernel.grad_w(pi - s) * boundary_lambda;
        }

        corr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{GasProperties, Particle3D};

    fn particle_at(pos: Vec3, rest_density: f32, mass: f32) -> Particle3D {
        let props = GasProperties {
            rest_density,
            mass,
            ..Default::default()
        };
        Particle3D::new(pos, props, 0.25)
    }

    #[test]
    fn test_psi_base_for_small_particles() {
        let constraint = DensityConstraint::new(0.2, 3);
        assert!((constraint.psi_weight(1) - 0.717662382055).abs() < 1e-6);
        assert!((constraint.psi_weight(5) - 0.317662382055).abs() < 1e-6);
    }

    #[test]
    fn test_psi_offset_for_large_particles() {
        let constraint = DensityConstraint::new(1.0, 3);
        assert!((constraint.psi_weight(1) - (0.717662382055 + 2.0)).abs() < 1e-5);
    }

    #[test]
    fn test_no_contacts_no_boundary_weight() {
        let constraint = DensityConstraint::new(0.2, 3);
        assert_eq!(constraint.psi_weight(0), 0.0);
    }

    #[test]
    fn test_under_dense_pair_unmoved() {
        // Two far-apart particles against a huge rest density: C clamps to
        // zero, lambda is zero and the prediction must not move.
        let kernel = CubicKernel::new(1.0);
        let mut hash = ParticleHash::new(1.0, 8);
        let mut constraint = DensityConstraint::new(0.25, 2);

        let mut particles = Particles3D::new();
        particles.list.push(particle_at(Vec3::ZERO, 1000.0, 1.0));
        particles.list.push(particle_at(Vec3::new(0.8, 0.0, 0.0), 1000.0, 1.0));
        let before: Vec<Vec3> = particles.list.iter().map(|p| p.predicted).collect();

        constraint.constrain_positions(&mut particles, &kernel, &mut hash);

        for (p, b) in particles.list.iter().zip(&before) {
            assert_eq!(p.predicted, *b);
            assert_eq!(p.lambda, 0.0);
        }
    }

    #[test]
    fn test_over_dense_pair_pushed_apart() {
        // Two nearly coincident particles with a low rest density: the
        // constraint is violated and the correction must separate them.
        let kernel = CubicKernel::new(1.0);
        let mut hash = ParticleHash::new(1.0, 8);
        let mut constraint = DensityConstraint::new(0.25, 3);

        let mut particles = Particles3D::new();
        particles.list.push(particle_at(Vec3::ZERO, 0.5, 1.0));
        particles.list.push(particle_at(Vec3::new(0.3, 0.0, 0.0), 0.5, 1.0));
        let before = particles.list[0]
            .predicted
            .distance(particles.list[1].predicted);

        constraint.constrain_positions(&mut particles, &kernel, &mut hash);

        let after = particles.list[0]
            .predicted
            .distance(particles.list[1].predicted);
        assert!(
            after > before,
            "over-dense pair should separate: {} -> {}",
            before,
            after
        );
        for p in &particles.list {
            assert!(p.predicted.is_finite());
        }
    }

    #[test]
    fn test_uniform_lattice_produces_no_corrections() {
        // 6x6x6 grid at diameter stride with the derived default mass:
        // the lattice sits below rest density, so C clamps to zero for
        // every particle and one iteration must leave all predicted
        // positions in place.
        let radius = 0.25;
        let diameter = radius * 2.0;
        let kernel = CubicKernel::new(radius * 4.0);
        let mut hash = ParticleHash::new(radius * 4.0, 216);
        let mut constraint = DensityConstraint::new(diameter, 1);

        let mass = 0.8 * diameter * diameter * diameter;
        let mut particles = Particles3D::new();
        for z in 0..6 {
            for y in 0..6 {
                for x in 0..6 {
                    let pos = Vec3::new(x as f32, y as f32, z as f32) * diameter;
                    particles.list.push(particle_at(pos, 1.0, mass));
                }
            }
        }
        let before: Vec<Vec3> = particles.list.iter().map(|p| p.predicted).collect();

        constraint.constrain_positions(&mut particles, &kernel, &mut hash);

        let max_move = particles
            .list
            .iter()
            .zip(&before)
            .map(|(p, b)| p.predicted.distance(*b))
            .fold(0.0_f32, f32::max);
        assert!(
            max_move < 1e-4 * diameter,
            "uniform lattice drifted by {} after one iteration",
            max_move
        );
    }

    #[test]
    fn test_density_includes_self_contribution() {
        let kernel = CubicKernel::new(1.0);
        let mut hash = ParticleHash::new(1.0, 4);
        let mut constraint = DensityConstraint::new(0.25, 1);

        let mut particles = Particles3D::new();
        particles.list.push(particle_at(Vec3::ZERO, 1.0, 2.0));
        constraint.constrain_positions(&mut particles, &kernel, &mut hash);

        let expected = 2.0 * kernel.w_zero();
        assert!(
            (particles.list[0].density - expected).abs() < 1e-6,
            "isolated particle density must be mass * WZero"
        );
    }
}
