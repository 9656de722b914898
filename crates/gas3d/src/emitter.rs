//! Deterministic particle seeding and runtime emission.
//!
//! The fill routines are deterministic given spacing and volume; hosts
//! rely on the exact particle counts they produce, so the truncation
//! arithmetic runs in f64 to keep counts stable across positions.

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

use crate::constants::{DEFAULT_MASS_FACTOR, SHELL_STEP_FACTOR};
use crate::particle::GasProperties;

/// Default particle mass for a given diameter and rest density, used
/// when the host config leaves the mass at zero.
pub fn default_mass(diameter: f32, rest_density: f32) -> f32 {
    DEFAULT_MASS_FACTOR * diameter * diameter * diameter * rest_density
}

/// Fill an axis-aligned box with a regular grid of positions.
///
/// Stride is the particle diameter (`2 * spacing`); the grid is offset
/// from the box minimum by one spacing. Counts truncate per axis, so a
/// box smaller than one diameter in any axis yields no positions.
pub fn box_positions(min: Vec3, size: Vec3, spacing: f32) -> Vec<Vec3> {
    let diameter = spacing as f64 * 2.0;
    let num_x = (size.x as f64 / diameter) as i32;
    let num_y = (size.y as f64 / diameter) as i32;
    let num_z = (size.z as f64 / diameter) as i32;

    let mut positions = Vec::with_capacity((num_x.max(0) * num_y.max(0) * num_z.max(0)) as usize);
    for z in 0..num_z {
        for y in 0..num_y {
            for x in 0..num_x {
                positions.push(Vec3::new(
                    (diameter * x as f64) as f32 + min.x + spacing,
                    (diameter * y as f64) as f32 + min.y + spacing,
                    (diameter * z as f64) as f32 + min.z + spacing,
                ));
            }
        }
    }
    positions
}

/// Fill a sphere with latitude/longitude-banded shells of positions.
///
/// Each shell distributes points so their area share approximates one
/// particle volume; the radius shrinks by `2.5 * spacing` per shell
/// until it goes negative, and the center point is always appended.
pub fn sphere_positions(center: Vec3, radius: f32, spacing: f32) -> Vec<Vec3> {
    let spacing = spacing as f64;
    let particle_volume = (4.0 / 3.0) * PI * spacing.powi(3);

    let mut positions = Vec::new();
    let mut r = radius as f64;

    while r >= 0.0 {
        let shell_volume = (4.0 / 3.0) * PI * r.powi(3);
        let count = (shell_volume / particle_volume) as i64;

        // Band the shell: average area per point, band height, then
        // points per band proportional to the band circumference.
        let area = (4.0 * PI * r * r) / count as f64;
        let d = area.sqrt();
        let bands = (PI / d) as i64;
        let d_theta = PI / bands as f64;
        let d_phi = area / d_theta;

        for i in 0..bands {
            let theta = PI * (i as f64 + 0.5) / bands as f64;
            let points = ((2.0 * PI * theta.sin()) / d_phi) as i64;

            for j in 0..points {
                let phi = (2.0 * PI * j as f64) / points as f64;
                positions.push(Vec3::new(
                    (r * theta.sin() * phi.cos()) as f32 + center.x,
                    (r * theta.sin() * phi.sin()) as f32 + center.y,
                    (r * theta.cos()) as f32 + center.z,
                ));
            }
        }

        r -= spacing * SHELL_STEP_FACTOR;
    }

    positions.push(center);
    positions
}

/// A runtime particle source: emits one jittered position per call.
#[derive(Debug)]
pub struct RuntimeEmitter {
    pub position: Vec3,
    pub properties: GasProperties,
    rng: StdRng,
}

impl RuntimeEmitter {
    pub fn new(position: Vec3, properties: GasProperties, seed: u64) -> Self {
        Self {
            position,
            properties,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next spawn position: the source position plus one uniform random
    /// offset in `[0, 1)` applied to every axis.
    pub fn emit(&mut self) -> Vec3 {
        let jitter: f32 = self.rng.gen_range(0.0..1.0);
        self.position + Vec3::splat(jitter)
    }
}
