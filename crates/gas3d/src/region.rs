//! Per-region density aggregation and host feedback.
//!
//! Regions are spheres the host places (or lets the tracker place) over
//! the simulation volume. Each step every live particle inside a region
//! contributes a toxicity-weighted share to its density; the host gets
//! the result through a [`RegionObserver`] before densities reset.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::particle::Particles3D;
use crate::serde_utils::{deserialize_vec3, serialize_vec3};

/// Per-step change applied to the smoothed density readout.
const SMOOTHING_STEP: f32 = 0.001;
/// Density at which a region flips dense/clear.
const DENSE_THRESHOLD: f32 = 0.5;
/// Follow-region radius adaptation: target density band and step.
const FOLLOW_BAND_LOW: f32 = 0.4;
const FOLLOW_BAND_HIGH: f32 = 0.6;
const FOLLOW_RADIUS_STEP: f32 = 0.01;

/// A spherical density-sampling region.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GasRegion {
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub center: Vec3,
    pub radius: f32,
    /// Density accumulated this step; reset after the observer runs.
    #[serde(skip)]
    pub density: f32,
    /// Readout density, relaxed toward `density` by a fixed step.
    #[serde(skip)]
    pub smoothed: f32,
    /// Latched dense/clear state with the threshold applied.
    #[serde(skip)]
    pub dense: bool,
}

impl GasRegion {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            density: 0.0,
            smoothed: 0.0,
            dense: false,
        }
    }
}

/// Host callback receiving the per-region densities for one step along
/// with the swarm's mean position and live particle count.
pub trait RegionObserver {
    fn on_regions(&mut self, regions: &[GasRegion], swarm_center: Vec3, live_particles: usize);
}

/// How the tracker manages its region set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RegionMode {
    /// Fixed host-placed regions.
    Placed,
    /// Spawn a new region over any particle no region covers.
    AutoPlace,
    /// The first region recenters on the swarm mean each step and its
    /// radius relaxes toward the target density band.
    Follow,
}

/// Tracks a set of regions and runs the per-step density accounting.
#[derive(Debug)]
pub struct RegionTracker {
    regions: Vec<GasRegion>,
    mode: RegionMode,
    /// Radius for regions spawned in auto-place mode.
    spawn_radius: f32,
}

impl RegionTracker {
    /// Fixed set of host-placed regions.
    pub fn placed(regions: Vec<GasRegion>) -> Self {
        Self {
            regions,
            mode: RegionMode::Placed,
            spawn_radius: 0.0,
        }
    }

    /// One seed region; uncovered particles spawn new regions of the
    /// same radius at their position.
    pub fn auto_place(seed: GasRegion) -> Self {
        let spawn_radius = seed.radius;
        Self {
            regions: vec![seed],
            mode: RegionMode::AutoPlace,
            spawn_radius,
        }
    }

    /// A single region that follows the swarm and adapts its radius.
    pub fn following(center: Vec3, radius: f32) -> Self {
        Self {
            regions: vec![GasRegion::new(center, radius)],
            mode: RegionMode::Follow,
            spawn_radius: 0.0,
        }
    }

    pub fn regions(&self) -> &[GasRegion] {
        &self.regions
    }

    /// Fold the live particles into the region densities. A particle
    /// inside several overlapping regions contributes to each of them.
    pub fn accumulate(&mut self, particles: &Particles3D, particle_radius: f32) {
        for p in &particles.list {
            let mut covered = false;
            for region in &mut self.regions {
                if p.position.distance(region.center) <= region.radius {
                    region.density += p.toxicity * particle_radius / region.radius;
                    covered = true;
                }
            }
            if !covered && self.mode == RegionMode::AutoPlace {
                self.regions.push(GasRegion::new(p.position, self.spawn_radius));
            }
        }
    }

    /// Close out the step: relax readouts, latch dense flags, notify the
    /// observer, then adapt the follow region and reset the accumulators.
    pub fn finish<O: RegionObserver + ?Sized>(
        &mut self,
        swarm_center: Vec3,
        live_particles: usize,
        observer: &mut O,
    ) {
        for region in &mut self.regions {
            if region.density >= region.smoothed {
                region.smoothed += SMOOTHING_STEP;
            } else {
                region.smoothed -= SMOOTHING_STEP;
            }

            if region.density >= DENSE_THRESHOLD && !region.dense {
                region.dense = true;
            } else if region.density < DENSE_THRESHOLD && region.dense {
                region.dense = false;
            }
        }

        observer.on_regions(&self.regions, swarm_center, live_particles);

        if self.mode == RegionMode::Follow {
            // Adapt on this step's density, then recenter on the swarm.
            let region = &mut self.regions[0];
            if region.density > FOLLOW_BAND_HIGH {
                region.radius -= FOLLOW_RADIUS_STEP;
            } else if region.density < FOLLOW_BAND_LOW {
                region.radius += FOLLOW_RADIUS_STEP;
            }
            region.center = swarm_center;
        }

        for region in &mut self.regions {
            region.density = 0.0;
        }
    }
}
