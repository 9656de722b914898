//! Cubic spline smoothing kernel for density interpolation.

use glam::Vec3;
use std::f32::consts::PI;

use crate::constants::KERNEL_NOISE_FLOOR;

/// Radially symmetric cubic spline kernel with support radius `h`.
///
/// `W` weights density contributions, `GradW` is its analytic gradient.
/// Both are zero outside the support radius. Normalization constants are
/// precomputed once: `K = 8/(pi h^3)` for the kernel and `L = 48/(pi h^3)`
/// for the gradient.
#[derive(Clone, Debug)]
pub struct CubicKernel {
    radius: f32,
    inv_radius: f32,
    k: f32,
    l: f32,
    w_zero: f32,
}

impl CubicKernel {
    /// Create a kernel with the given support radius.
    pub fn new(radius: f32) -> Self {
        let h3 = radius * radius * radius;
        let mut kernel = Self {
            radius,
            inv_radius: 1.0 / radius,
            k: 8.0 / (PI * h3),
            l: 48.0 / (PI * h3),
            w_zero: 0.0,
        };
        kernel.w_zero = kernel.w(Vec3::ZERO);
        kernel
    }

    /// Support radius `h`.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// `W(0)`, the self-density contribution.
    pub fn w_zero(&self) -> f32 {
        self.w_zero
    }

    /// Kernel weight for a separation vector.
    ///
    /// Two-piece cubic: `K(6q^3 - 6q^2 + 1)` for `q <= 0.5`,
    /// `2K(1-q)^3` for `0.5 < q <= 1`, zero beyond the support radius.
    #[inline]
    pub fn w(&self, d: Vec3) -> f32 {
        let rl = d.length();
        let q = rl * self.inv_radius;

        if q > 1.0 {
            return 0.0;
        }
        if q <= 0.5 {
            let q2 = q * q;
            let q3 = q2 * q;
            self.k * (6.0 * q3 - 6.0 * q2 + 1.0)
        } else {
            let v = 1.0 - q;
            self.k * 2.0 * v * v * v
        }
    }

    /// Kernel gradient for a separation vector.
    ///
    /// Zero outside the support radius and below the distance noise floor
    /// (the direction is undefined at zero separation).
    #[inline]
    pub fn grad_w(&self, d: Vec3) -> Vec3 {
        let rl = d.length();
        let q = rl * self.inv_radius;

        if q > 1.0 || rl <= KERNEL_NOISE_FLOOR {
            return Vec3::ZERO;
        }

        let grad_q = d * (1.0 / (rl * self.radius));

        if q <= 0.5 {
            grad_q * (self.l * q * (3.0 * q - 2.0))
        } else {
            let v = 1.0 - q;
            grad_q * (self.l * -(v * v))
        }
    }
}
