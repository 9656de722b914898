//! Tuning constants for the gas simulation.
//!
//! The numeric values here are load-bearing: the density solver, the Psi
//! boundary table and the spawn fills are calibrated against each other,
//! so changing one in isolation shifts the rest behavior of the gas.

/// Smoothing-kernel support radius as a multiple of the particle radius.
/// The spatial hash cell size equals the kernel radius by construction.
pub const KERNEL_RADIUS_FACTOR: f32 = 4.0;

/// Hard cap on neighbors stored per particle. Excess neighbors are
/// dropped first-found-wins and counted, not reported as an error.
pub const MAX_NEIGHBORS: usize = 60;

/// Initial bucket capacity for a hash cell.
pub const MAX_PARTICLES_PER_CELL: usize = 50;

/// Spatial hash mixing primes (classic 3D position hash).
pub const HASH_P1: i32 = 73856093;
pub const HASH_P2: i32 = 19349663;
pub const HASH_P3: i32 = 83492791;

/// Distance below which the kernel gradient is treated as zero to avoid
/// dividing by a near-zero separation.
pub const KERNEL_NOISE_FLOOR: f32 = 1.0e-6;

/// Denominator guard for the Lagrange multiplier when constraint
/// gradients vanish.
pub const LAMBDA_EPSILON: f32 = 1.0e-6;

/// Maximum raycast distance for boundary contact probes.
pub const PROBE_DISTANCE: f32 = 2.0;

/// A tracked contact is only re-anchored while at most this many other
/// contacts survive the refresh pass.
pub const CONTACT_REFRESH_CAP: usize = 3;

/// Velocity drag blend factor toward the configured drag vector.
pub const DRAG_COEFF: f32 = 0.5;

/// Lift factor for the Boussinesq buoyancy approximation.
pub const BOUSSINESQ_LIFT: f32 = 0.3;

/// Upward reference acceleration used by the buoyancy cross product (m/s^2).
pub const BUOYANCY_GRAVITY: f32 = 9.81;

/// Default particle mass as a fraction of `diameter^3 * rest_density`.
pub const DEFAULT_MASS_FACTOR: f32 = 0.8;

/// Radius decrement between concentric shells of the sphere fill,
/// as a multiple of the particle spacing.
pub const SHELL_STEP_FACTOR: f64 = 2.5;

/// Particle diameter above which the Psi boundary table is offset.
pub const PSI_ADJUST_THRESHOLD: f32 = 0.5;

/// Offset applied to every Psi entry per unit of particle diameter when
/// the diameter exceeds [`PSI_ADJUST_THRESHOLD`].
pub const PSI_ADJUST_FACTOR: f32 = 2.0;
