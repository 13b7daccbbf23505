use std::f32::consts::{FRAC_PI_2, TAU};

use crate::Mat4;

/// Model rotation as two angles: `phi` around Y, then `theta` around X.
///
/// `phi` is kept in `[0, 2π)` and `theta` in `[-π/2, π/2]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Orientation {
    phi: f32,
    theta: f32,
}

impl Orientation {
    pub fn new(phi: f32, theta: f32) -> Self {
        let mut o = Self::default();
        o.set_phi(phi);
        o.set_theta(theta);
        o
    }

    #[inline]
    pub fn phi(&self) -> f32 {
        self.phi
    }

    #[inline]
    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn set_phi(&mut self, phi: f32) {
        self.phi = phi.rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs.
        if self.phi >= TAU {
            self.phi = 0.0;
        }
    }

    pub fn set_theta(&mut self, theta: f32) {
        self.theta = theta.clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Advance both angles by `rate * dt` (radians per second).
    pub fn advance(&mut self, dt: f32, phi_rate: f32, theta_rate: f32) {
        self.set_phi(self.phi + phi_rate * dt);
        self.set_theta(self.theta + theta_rate * dt);
    }

    /// `RotX(theta) * RotY(phi)`.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.theta) * Mat4::from_rotation_y(self.phi)
    }
}
