//! External force configuration: gravity, drag and boxed wind volumes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::particle::Particles3D;
use crate::serde_utils::{deserialize_vec3, serialize_vec3};

/// Axis-aligned wind volume.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WindVolume {
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub min: Vec3,
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub max: Vec3,
}

impl WindVolume {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// A wind force paired with the volume it acts in.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Wind {
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub force: Vec3,
    pub volume: WindVolume,
}

/// External forces applied to every particle each step.
///
/// Gravity always applies; each wind volume adds its paired force to
/// particles inside it, so overlapping volumes sum. The drag vector is
/// not applied here: it is the target the post-solve drag term blends
/// velocities toward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Forces {
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub gravity: Vec3,
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub drag: Vec3,
    pub winds: Vec<Wind>,
}

impl Default for Forces {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            drag: Vec3::ZERO,
            winds: Vec::new(),
        }
    }
}

impl Forces {
    /// Add gravity and wind impulses to every particle's velocity.
    /// Wind containment tests the committed position, not the prediction.
    pub fn apply(&self, dt: f32, particles: &mut Particles3D) {
        for p in &mut particles.list {
            p.velocity += self.gravity * dt;

            for wind in &self.winds {
                if wind.volume.contains(p.position) {
                    p.velocity += wind.force * dt;
                }
            }
        }
    }
}
