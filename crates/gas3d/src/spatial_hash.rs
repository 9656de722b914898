//! Uniform-grid spatial hash with timestamped buckets.
//!
//! Buckets are invalidated by bumping a timestamp instead of clearing the
//! whole grid every step: a bucket whose stamp does not match the current
//! one is treated as empty even if it still holds stale indices.
//! Neighbor lists live in a flat capacity-bounded buffer
//! (`particle * max_neighbors + slot`), fixed at construction.

use glam::Vec3;
use std::collections::HashMap;

use crate::constants::{
    HASH_P1, HASH_P2, HASH_P3, MAX_NEIGHBORS, MAX_PARTICLES_PER_CELL,
};

#[derive(Debug)]
struct HashEntry {
    time_stamp: u32,
    indices: Vec<u32>,
}

/// Spatial hash over particle positions for radius-neighbor queries.
///
/// The cell size equals the kernel support radius, so scanning the 3x3x3
/// cell neighborhood of a particle yields a superset of all particles
/// within that radius.
#[derive(Debug)]
pub struct ParticleHash {
    cell_size: f32,
    inv_cell_size: f64,
    max_particles: usize,
    max_neighbors: usize,
    time_stamp: u32,
    grid: HashMap<i32, HashEntry>,
    /// Flat neighbor index buffer, `max_particles * max_neighbors` slots.
    neighbors: Vec<u32>,
    /// Live neighbor count per particle (length = particles last searched).
    counts: Vec<u32>,
    /// Neighbors beyond the per-particle cap, dropped silently but counted.
    dropped: u64,
}

impl ParticleHash {
    /// Create a hash for up to `max_particles` particles with the given
    /// cell size (the kernel support radius).
    pub fn new(cell_size: f32, max_particles: usize) -> Self {
        Self::with_neighbor_cap(cell_size, max_particles, MAX_NEIGHBORS)
    }

    pub fn with_neighbor_cap(cell_size: f32, max_particles: usize, max_neighbors: usize) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size as f64,
            max_particles,
            max_neighbors,
            time_stamp: 0,
            grid: HashMap::new(),
            neighbors: vec![0; max_particles * max_neighbors],
            counts: Vec::with_capacity(max_particles),
            dropped: 0,
        }
    }

    /// Maximum particle count fixed at construction.
    pub fn capacity(&self) -> usize {
        self.max_particles
    }

    /// Neighbor indices of particle `i` from the last search.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[u32] {
        let count = self.counts[i] as usize;
        let base = i * self.max_neighbors;
        &self.neighbors[base..base + count]
    }

    /// Total neighbors dropped past the per-particle cap since creation.
    pub fn dropped_neighbors(&self) -> u64 {
        self.dropped
    }

    /// Advance the epoch: the next rebuild logically invalidates every
    /// bucket without touching the grid storage.
    pub fn increment_time_stamp(&mut self) {
        self.time_stamp = self.time_stamp.wrapping_add(1);
    }

    /// Cell coordinate via a biased floor. The bias keeps the value
    /// positive before truncation so negative positions floor correctly.
    #[inline]
    fn cell_coord(&self, v: f32) -> i32 {
        (v as f64 * self.inv_cell_size + 32768.1) as i32 - 32768
    }

    #[inline]
    fn hash_cell(x: i32, y: i32, z: i32) -> i32 {
        // Collisions in this 1D key space are accepted; they only merge
        // candidate lists ahead of the exact distance test.
        x.wrapping_mul(HASH_P1)
            .wrapping_add(y.wrapping_mul(HASH_P2))
            .wrapping_add(z.wrapping_mul(HASH_P3))
    }

    fn insert(&mut self, i: u32, position: Vec3) {
        // Insertion is offset by +1 per axis so the 27-cell query scan
        // (offsets 0..3 around the raw floor) centers on this cell.
        let x = self.cell_coord(position.x) + 1;
        let y = self.cell_coord(position.y) + 1;
        let z = self.cell_coord(position.z) + 1;
        let key = Self::hash_cell(x, y, z);

        let stamp = self.time_stamp;
        let entry = self.grid.entry(key).or_insert_with(|| HashEntry {
            time_stamp: stamp,
            indices: Vec::with_capacity(MAX_PARTICLES_PER_CELL),
        });
        if entry.time_stamp != stamp {
            entry.time_stamp = stamp;
            entry.indices.clear();
        }
        entry.indices.push(i);
    }

    /// Insert all particles and fill every particle's neighbor list with
    /// the indices of other particles within the cell-size radius.
    pub fn neighborhood_search(&mut self, positions: &[Vec3]) {
        debug_assert!(
            positions.len() <= self.max_particles,
            "particle count {} exceeds hash capacity {}",
            positions.len(),
            self.max_particles
        );

        let r2 = self.cell_size * self.cell_size;

        for (i, &p) in positions.iter().enumerate() {
            self.insert(i as u32, p);
        }

        self.counts.clear();
        self.counts.resize(positions.len(), 0);

        for i in 0..positions.len() {
            let p0 = positions[i];
            let cx = self.cell_coord(p0.x);
            let cy = self.cell_coord(p0.y);
            let cz = self.cell_coord(p0.z);

            let base = i * self.max_neighbors;
            let mut count = 0usize;

            for dz in 0..3 {
                for dy in 0..3 {
                    for dx in 0..3 {
                        let key = Self::hash_cell(cx + dx, cy + dy, cz + dz);
                        let Some(entry) = self.grid.get(&key) else {
                            continue;
                        };
                        if entry.time_stamp != self.time_stamp {
                            continue;
                        }
                        for &pi in &entry.indices {
                            if pi as usize == i {
                                continue;
                            }
                            let d = p0 - positions[pi as usize];
                            if d.length_squared() < r2 {
                                if count < self.max_neighbors {
                                    self.neighbors[base + count] = pi;
                                    count += 1;
                                } else {
                                    self.dropped += 1;
                                }
                            }
                        }
                    }
                }
            }

            self.counts[i] = count as u32;
        }

        if self.dropped > 0 {
            log::debug!("neighbor cap reached, {} total dropped", self.dropped);
        }
    }
}
