//! Frames, vectors and rigid transforms.
//!
//! World frame: X along the box, Y away from the pilot, Z up.
//! Body frame: X forward, Y right wing, Z down through the belly.
//! Attitude quaternions rotate body vectors into the world frame.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub type Vec3 = Vector3<f64>;
pub type Quat = UnitQuaternion<f64>;

pub fn px() -> Vec3 {
    Vec3::x()
}

pub fn py() -> Vec3 {
    Vec3::y()
}

pub fn pz() -> Vec3 {
    Vec3::z()
}

/// Intrinsic Z-Y-X composition: yaw, then pitch, then roll.
pub fn euler(roll: f64, pitch: f64, yaw: f64) -> Quat {
    Quat::from_euler_angles(roll, pitch, yaw)
}

/// Rotation of `angle` about `axis`. A zero axis gives the identity.
pub fn axis_angle(axis: &Vec3, angle: f64) -> Quat {
    let n = axis.norm();
    if n < 1e-12 {
        return Quat::identity();
    }
    Quat::from_scaled_axis(axis * (angle / n))
}

pub fn cos_angle_between(a: &Vec3, b: &Vec3) -> f64 {
    let d = a.norm() * b.norm();
    if d < 1e-12 {
        0.0
    } else {
        (a.dot(b) / d).clamp(-1.0, 1.0)
    }
}

/// Component of `a` perpendicular to `b`.
pub fn vector_rejection(a: &Vec3, b: &Vec3) -> Vec3 {
    let bb = b.norm_squared();
    if bb < 1e-12 {
        return *a;
    }
    a - b * (a.dot(b) / bb)
}

pub fn unit_or(v: &Vec3, fallback: Vec3) -> Vec3 {
    let n = v.norm();
    if n < 1e-12 {
        fallback
    } else {
        v / n
    }
}

pub fn wrap_pi(a: f64) -> f64 {
    let mut x = (a + PI) % (2.0 * PI);
    if x < 0.0 {
        x += 2.0 * PI;
    }
    x - PI
}

pub fn is_vertical(v: &Vec3, tol: f64) -> bool {
    cos_angle_between(v, &pz()).abs() > (1.0 - tol)
}

pub fn is_horizontal(v: &Vec3, tol: f64) -> bool {
    cos_angle_between(v, &pz()).abs() < tol
}

/// Rigid body pose: `world = rotation * local + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zeros(), Quat::identity())
    }

    pub fn point(&self, local: &Vec3) -> Vec3 {
        self.rotation * local + self.translation
    }

    pub fn rotate(&self, local: &Vec3) -> Vec3 {
        self.rotation * local
    }

    pub fn attitude(&self, local: &Quat) -> Quat {
        self.rotation * local
    }

    pub fn inverse(&self) -> Self {
        let inv = self.rotation.inverse();
        Self::new(-(inv * self.translation), inv)
    }

    /// Applies `self` after `inner`.
    pub fn compose(&self, inner: &Transform) -> Self {
        Self::new(
            self.point(&inner.translation),
            self.rotation * inner.rotation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_yaw_turns_x_into_y() {
        let q = euler(0.0, 0.0, PI / 2.0);
        assert!((q * px() - py()).norm() < 1e-12);
    }

    #[test]
    fn inverse_round_trips_points() {
        let t = Transform::new(Vec3::new(1.0, 2.0, 3.0), euler(0.3, -0.2, 1.1));
        let p = Vec3::new(-4.0, 0.5, 9.0);
        let back = t.inverse().point(&t.point(&p));
        assert!((back - p).norm() < 1e-9);
    }

    #[test]
    fn wrap_pi_stays_in_range() {
        for a in [-7.0, -PI, 0.0, 3.0, 4.0, 12.0] {
            let w = wrap_pi(a);
            assert!(w >= -PI && w < PI, "{} -> {}", a, w);
        }
    }
}
