//! End-to-end simulation scenarios.
//!
//! These drive full steps through the public API: spawn, integrate,
//! solve, retire and report, checking conservation and stability rather
//! than exact trajectories.

use gas3d::{
    BoundaryQuery, GasParams, GasProperties, GasRegion, GasSimulation3D, NoBoundaries, RayHit,
    RegionObserver, RegionTracker, Wind, WindVolume,
};
use glam::Vec3;

/// Thick horizontal slab with its top surface at `y`.
struct Floor {
    y: f32,
}

impl BoundaryQuery for Floor {
    fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<RayHit> {
        let d = dir.normalize_or_zero();
        if d == Vec3::ZERO || d.y >= 0.0 || origin.y < self.y {
            return None;
        }
        let t = (origin.y - self.y) / -d.y;
        if t < 0.0 || t > max_dist {
            return None;
        }
        Some(RayHit {
            point: origin + d * t,
            normal: Vec3::Y,
        })
    }
}

fn params(max_particles: usize) -> GasParams {
    GasParams {
        max_particles,
        ..Default::default()
    }
}

#[test]
fn gravity_pulls_the_swarm_down() {
    let mut sim = GasSimulation3D::new(params(256), NoBoundaries);
    let spawned = sim.spawn_box(
        Vec3::ZERO,
        Vec3::new(2.5, 2.5, 2.0),
        GasProperties::default(),
    );
    assert_eq!(spawned, 100, "5x5x4 grid expected from the fill stride");
    let start_y = sim.particles.mean_position().y;

    for _ in 0..60 {
        sim.step(1.0 / 60.0);
    }

    assert_eq!(sim.particles.len(), spawned, "no particle may vanish mid-run");
    assert!(
        sim.particles.mean_position().y < start_y,
        "swarm mean should drift down under gravity: {} -> {}",
        start_y,
        sim.particles.mean_position().y
    );
    for p in &sim.particles.list {
        assert!(p.position.is_finite(), "non-finite position {:?}", p.position);
        assert!(p.velocity.is_finite(), "non-finite velocity {:?}", p.velocity);
    }
}

#[test]
fn wind_volume_pushes_contained_particles() {
    let mut sim_params = params(64);
    sim_params.forces.gravity = Vec3::ZERO;
    sim_params.forces.winds = vec![Wind {
        force: Vec3::new(2.0, 0.0, 0.0),
        volume: WindVolume::new(Vec3::splat(-10.0), Vec3::splat(10.0)),
    }];
    let mut sim = GasSimulation3D::new(sim_params, NoBoundaries);
    sim.spawn_at(Vec3::ZERO, GasProperties::default());

    for _ in 0..30 {
        sim.step(1.0 / 60.0);
    }

    assert!(
        sim.particles.list[0].position.x > 0.0,
        "wind should carry the particle along +x, got {:?}",
        sim.particles.list[0].position
    );
}

#[test]
fn falling_particle_acquires_floor_contact() {
    let mut sim = GasSimulation3D::new(params(16), Floor { y: 0.0 });
    sim.spawn_at(Vec3::new(0.0, 1.0, 0.0), GasProperties::default());

    let mut contact_seen = false;
    for _ in 0..120 {
        sim.step(1.0 / 60.0);
        if sim.particles.list[0].contacts.normal_count() > 0 {
            contact_seen = true;
        }
        assert!(sim.particles.list[0].position.is_finite());
    }

    assert!(contact_seen, "falling particle never registered the floor");
}

#[test]
fn retirement_runs_between_steps() {
    let mut sim_params = params(32);
    sim_params.max_travel = 2.0;
    sim_params.forces.gravity = Vec3::new(0.0, -50.0, 0.0);
    let mut sim = GasSimulation3D::new(sim_params, NoBoundaries);
    sim.spawn_at(Vec3::ZERO, GasProperties::default());

    let mut retired_total = 0;
    for _ in 0..120 {
        sim.step(1.0 / 60.0);
        retired_total += sim.retire_distant();
    }

    assert_eq!(retired_total, 1, "the particle should fall past max_travel once");
    assert!(sim.particles.is_empty());
}

struct Recorder {
    density: f32,
    live: usize,
    calls: usize,
}

impl RegionObserver for Recorder {
    fn on_regions(&mut self, regions: &[GasRegion], _swarm_center: Vec3, live: usize) {
        self.density = regions[0].density;
        self.live = live;
        self.calls += 1;
    }
}

#[test]
fn region_feedback_reports_toxic_swarm() {
    let mut sim = GasSimulation3D::new(params(256), NoBoundaries);
    let props = GasProperties {
        toxicity: 2.0,
        ..Default::default()
    };
    let spawned = sim.spawn_box(Vec3::new(-1.0, -1.0, -1.0), Vec3::splat(2.0), props);
    sim.set_region_tracker(RegionTracker::placed(vec![GasRegion::new(
        Vec3::ZERO,
        10.0,
    )]));

    sim.step(1.0 / 60.0);
    sim.retire_distant();

    let mut recorder = Recorder {
        density: 0.0,
        live: 0,
        calls: 0,
    };
    sim.report_regions(&mut recorder);

    assert_eq!(recorder.calls, 1);
    assert_eq!(recorder.live, spawned);
    // Every particle is inside the region: density is the exact sum of
    // toxicity * particle_radius / region_radius.
    let expected = spawned as f32 * 2.0 * sim.params.particle_radius / 10.0;
    assert!(
        (recorder.density - expected).abs() < 1e-3,
        "region density {} != expected {}",
        recorder.density,
        expected
    );
}

#[test]
fn isolated_particles_rest_without_forces() {
    // Particles outside each other's kernel support, no gravity, no wind:
    // every term of the step vanishes and nothing moves.
    let mut sim_params = params(8);
    sim_params.forces.gravity = Vec3::ZERO;
    let mut sim = GasSimulation3D::new(sim_params, NoBoundaries);
    for x in 0..4 {
        sim.spawn_at(Vec3::new(x as f32 * 5.0, 0.0, 0.0), GasProperties::default());
    }
    let before: Vec<Vec3> = sim.particles.list.iter().map(|p| p.position).collect();

    for _ in 0..10 {
        sim.step(1.0 / 60.0);
    }

    for (p, b) in sim.particles.list.iter().zip(&before) {
        assert_eq!(
            p.position, *b,
            "isolated force-free particle drifted from {:?}",
            b
        );
        assert_eq!(p.velocity, Vec3::ZERO);
    }
}
