//! Spatial hash correctness against a brute-force reference.
//!
//! For randomly scattered particles and a query radius equal to the cell
//! size, the hash must return exactly the particles within that radius
//! (self excluded), as long as the per-particle cap is not hit.

use gas3d::spatial_hash::ParticleHash;
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Brute-force O(N²) neighbor sets with the same strict-less distance test.
fn brute_force_neighbors(positions: &[Vec3], radius: f32) -> Vec<Vec<u32>> {
    let r2 = radius * radius;
    let mut result = vec![Vec::new(); positions.len()];
    for i in 0..positions.len() {
        for j in 0..positions.len() {
            if i == j {
                continue;
            }
            if (positions[i] - positions[j]).length_squared() < r2 {
                result[i].push(j as u32);
            }
        }
    }
    result
}

fn scatter(count: usize, extent: f32, seed: u64) -> Vec<Vec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            )
        })
        .collect()
}

#[test]
fn hash_matches_brute_force_on_random_scatter() {
    let cell_size = 1.0;
    for seed in 0..4 {
        let positions = scatter(200, 5.0, seed);
        let mut hash = ParticleHash::new(cell_size, positions.len());
        hash.neighborhood_search(&positions);

        let reference = brute_force_neighbors(&positions, cell_size);

        for i in 0..positions.len() {
            let mut got: Vec<u32> = hash.neighbors(i).to_vec();
            let mut want = reference[i].clone();
            got.sort_unstable();
            want.sort_unstable();
            assert_eq!(
                got, want,
                "neighbor set mismatch for particle {} (seed {})",
                i, seed
            );
        }
        assert_eq!(hash.dropped_neighbors(), 0, "scatter should stay under the cap");
    }
}

#[test]
fn hash_matches_brute_force_on_dense_cluster() {
    // Tight cluster well under the cap: everyone is everyone's neighbor.
    let positions = scatter(40, 0.2, 7);
    let mut hash = ParticleHash::new(1.0, positions.len());
    hash.neighborhood_search(&positions);

    for i in 0..positions.len() {
        assert_eq!(
            hash.neighbors(i).len(),
            positions.len() - 1,
            "cluster particle {} should see all others",
            i
        );
    }
}

#[test]
fn hash_stays_correct_across_epochs() {
    let cell_size = 1.0;
    let mut hash = ParticleHash::new(cell_size, 200);

    for seed in 10..13 {
        let positions = scatter(150, 4.0, seed);
        hash.neighborhood_search(&positions);

        let reference = brute_force_neighbors(&positions, cell_size);
        for i in 0..positions.len() {
            let mut got: Vec<u32> = hash.neighbors(i).to_vec();
            let mut want = reference[i].clone();
            got.sort_unstable();
            want.sort_unstable();
            assert_eq!(got, want, "stale buckets leaked into epoch seeded {}", seed);
        }

        hash.increment_time_stamp();
    }
}
