//! Boundary contact detection via raycasts against host geometry.
//!
//! Each particle tracks a small set of contact normals against nearby
//! solids. Every normal is keyed to a 9-point sample patch (one anchor
//! plus two 4-point rings) that approximates the local surface; the
//! density solver treats those samples as virtual static particles.

use glam::{Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

use crate::constants::{CONTACT_REFRESH_CAP, PROBE_DISTANCE};

/// Number of distinct contact normals a particle can track, matching the
/// length of the solver's Psi table.
pub const MAX_CONTACT_NORMALS: usize = 5;

/// A boundary raycast hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Synchronous, side-effect-free raycast query against the host's solid
/// geometry. The direction need not be normalized; `max_dist` is measured
/// along the ray. A zero direction yields no hit.
pub trait BoundaryQuery {
    fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<RayHit>;
}

/// Geometry stub for simulations without solids.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBoundaries;

impl BoundaryQuery for NoBoundaries {
    fn raycast(&self, _origin: Vec3, _dir: Vec3, _max_dist: f32) -> Option<RayHit> {
        None
    }
}

/// One tracked contact: a surface normal and its sample patch.
/// `samples[0]` is the patch anchor on the surface.
#[derive(Clone, Debug)]
pub struct ContactPatch {
    pub normal: Vec3,
    pub samples: [Vec3; 9],
}

/// The set of contact patches owned by one particle.
#[derive(Clone, Debug)]
pub struct ContactPatches {
    patches: Vec<ContactPatch>,
    /// Patch ring scale, the particle diameter.
    scale: f32,
    dropped: u64,
}

impl ContactPatches {
    pub fn new(scale: f32) -> Self {
        Self {
            patches: Vec::new(),
            scale,
            dropped: 0,
        }
    }

    pub fn patches(&self) -> &[ContactPatch] {
        &self.patches
    }

    /// Number of distinct contact normals currently tracked.
    pub fn normal_count(&self) -> usize {
        self.patches.len()
    }

    /// All sample points across all patches.
    pub fn iter_samples(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.patches.iter().flat_map(|p| p.samples.iter().copied())
    }

    /// Contacts skipped because the tracking cap was reached.
    pub fn dropped_contacts(&self) -> u64 {
        self.dropped
    }

    fn contains_normal(&self, n: Vec3) -> bool {
        self.patches.iter().any(|p| p.normal == n)
    }

    /// Refresh tracked contacts and probe for new ones along the motion
    /// from `position` to `predicted`.
    pub fn update<G: BoundaryQuery>(&mut self, position: Vec3, predicted: Vec3, geometry: &G) {
        // Re-probe every tracked normal from a point offset along it back
        // toward the surface. A miss drops the contact; a hit re-anchors
        // the patch where the contact plane meets the line through the
        // particle along the normal.
        let tracked = std::mem::take(&mut self.patches);
        for patch in tracked {
            let n = patch.normal;
            let old_anchor = patch.samples[0];

            if geometry.raycast(position + n, -n, PROBE_DISTANCE).is_none() {
                continue;
            }
            if self.patches.len() > CONTACT_REFRESH_CAP {
                self.dropped += 1;
                continue;
            }
            let anchor =
                plane_line_intersection(n, old_anchor, n, position).unwrap_or(old_anchor);
            self.patches.push(build_patch(anchor, n, self.scale));
        }

        // Probe along the predicted motion for a fresh contact.
        let dir = predicted - position;
        if dir.length_squared() <= f32::EPSILON {
            return;
        }
        if let Some(hit) = geometry.raycast(position, dir, PROBE_DISTANCE) {
            if !self.contains_normal(hit.normal) {
                if self.patches.len() < MAX_CONTACT_NORMALS {
                    self.patches.push(build_patch(hit.point, hit.normal, self.scale));
                } else {
                    self.dropped += 1;
                    log::debug!("contact cap reached, normal {:?} dropped", hit.normal);
                }
            }
        }
    }
}

/// Pick the 90-degree axis rotation whose image of the normal spans the
/// surface tangent plane, preferring the axis of least dominance in the
/// normal's component magnitudes.
fn dominant_axis_rotation(n: Vec3) -> Quat {
    let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
    if ax >= ay && ay >= az {
        Quat::from_rotation_z(FRAC_PI_2)
    } else if ax >= ay && az >= ay {
        Quat::from_rotation_y(FRAC_PI_2)
    } else {
        Quat::from_rotation_x(FRAC_PI_2)
    }
}

/// Build the 9-point sample patch tangent to `normal` at `anchor`.
///
/// First ring: the rotated normal and its cross with the normal, scaled
/// by the particle diameter, plus their mirror images through the anchor.
/// Second ring: midpoints between the corresponding unit-scale offsets,
/// forming the diagonal ring.
fn build_patch(anchor: Vec3, normal: Vec3, scale: f32) -> ContactPatch {
    let rot = dominant_axis_rotation(normal);
    let r = rot * normal;
    let c = r.cross(normal);

    let unit_xp = anchor + r;
    let unit_xn = anchor + c;
    let unit_zp = anchor - r;
    let unit_zn = anchor - c;

    ContactPatch {
        normal,
        samples: [
            anchor,
            anchor + r * scale,
            anchor + c * scale,
            anchor - r * scale,
            anchor - c * scale,
            (unit_xp + unit_xn) / 2.0,
            (unit_xp + unit_zn) / 2.0,
            (unit_xn + unit_zp) / 2.0,
            (unit_zp + unit_zn) / 2.0,
        ],
    }
}

/// Intersection of the plane `(level_normal, level_point)` with the line
/// `line_point - t * line_normal`. Returns `None` when the line is
/// parallel to the plane within tolerance instead of dividing by zero.
fn plane_line_intersection(
    level_normal: Vec3,
    level_point: Vec3,
    line_normal: Vec3,
    line_point: Vec3,
) -> Option<Vec3> {
    let level = level_normal.dot(level_point);
    let along = level_normal.dot(line_point);
    let denom = level_normal.dot(-line_normal);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (level - along) / denom;
    Some(line_point - line_normal * t)
}
