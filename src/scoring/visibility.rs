//! How visible an error is to a judge standing at the origin.
//!
//! Visibility factors are in [0, 1]. Small errors seen at a low factor
//! are shrunk, errors beyond the criteria limit are left alone.

use crate::geometry::{cos_angle_between, py, vector_rejection, Vec3};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum VisibilityKind {
    /// each value is weighted on its own
    Value,
    /// changes between values are weighted, then summed back up
    Deviation,
}

/// Exponent curve `b = base - factor * slope`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub base: f64,
    pub slope: f64,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            base: 2.2,
            slope: 1.2,
        }
    }
}

impl Visibility {
    fn weigh(&self, v: f64, factor: f64, limit: f64) -> f64 {
        if v == 0.0 || limit <= 0.0 || !limit.is_finite() {
            return v;
        }
        let b = self.base - factor.clamp(0.0, 1.0) * self.slope;
        let norm = (v / limit).abs();
        let scaled = if norm > 1.0 { norm } else { norm.powf(b) };
        scaled * limit * v.signum()
    }

    pub fn apply(&self, values: &[f64], factors: &[f64], limit: f64, kind: VisibilityKind) -> Vec<f64> {
        let factor = |i: usize| factors.get(i).copied().unwrap_or(1.0);
        match kind {
            VisibilityKind::Value => values
                .iter()
                .enumerate()
                .map(|(i, v)| self.weigh(*v, factor(i), limit))
                .collect(),
            VisibilityKind::Deviation => {
                let Some(&first) = values.first() else {
                    return Vec::new();
                };
                let mut out = Vec::with_capacity(values.len());
                let mut acc = first;
                out.push(acc);
                for i in 1..values.len() {
                    acc += self.weigh(values[i] - values[i - 1], factor(i), limit);
                    out.push(acc);
                }
                out
            }
        }
    }
}

/// Errors are hard to see when the aircraft is far along the line of sight.
pub fn pos_vis(loc: &Vec3) -> f64 {
    let n = loc.norm();
    if n < 1e-9 {
        return 1.0;
    }
    vector_rejection(loc, &py()).norm() / n
}

/// Errors along `direction` are most visible across the line of sight.
pub fn vector_vis(loc: &Vec3, direction: &Vec3) -> f64 {
    (1.0 - 0.8 * cos_angle_between(loc, direction).abs()) * pos_vis(loc)
}

/// Roll errors move the wing tips along body Z, given here in world axes.
pub fn roll_vis(loc: &Vec3, tip_direction: &Vec3) -> f64 {
    vector_vis(loc, tip_direction)
}

/// Radius errors are most visible when looking along the loop axis.
pub fn rad_vis(loc: &Vec3, axis: &Vec3) -> f64 {
    (0.2 + 0.8 * cos_angle_between(loc, axis).abs()) * pos_vis(loc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_visibility_is_identity() {
        let vis = Visibility::default();
        let vs = vec![0.1, -0.3, 0.5];
        let out = vis.apply(&vs, &[1.0, 1.0, 1.0], 1.0, VisibilityKind::Value);
        for (a, b) in vs.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn poor_visibility_shrinks_small_errors_only() {
        let vis = Visibility::default();
        let out = vis.apply(&[0.5, 2.0], &[0.0, 0.0], 1.0, VisibilityKind::Value);
        assert!(out[0] < 0.5 && out[0] > 0.0);
        assert_eq!(out[1], 2.0);
    }

    #[test]
    fn deviation_keeps_the_first_value() {
        let vis = Visibility::default();
        let out = vis.apply(&[3.0, 3.5, 3.0], &[0.0; 3], 1.0, VisibilityKind::Deviation);
        assert_eq!(out[0], 3.0);
        assert!(out[1] < 3.5);
        assert!((out[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn looking_along_the_depth_axis_hides_everything() {
        assert!(pos_vis(&Vec3::new(0.0, 150.0, 0.0)) < 1e-12);
        assert!((pos_vis(&Vec3::new(150.0, 0.0, 0.0)) - 1.0).abs() < 1e-12);
        let loc = Vec3::new(0.0, 150.0, 150.0);
        assert!(rad_vis(&loc, &py()) > vector_vis(&loc, &py()));
    }
}
