use super::{build_template, integrated_roll, mean_speed, Kinematic, TimeBase};
use crate::error::{checked_div, FsResult, ScoreError};
use crate::geometry::{axis_angle, euler, px, py, Transform, Vec3};
use crate::state::State;
use crate::util::sign;
use serde::{Deserialize, Serialize};

/// Arc of constant radius. Positive angles pull towards the canopy, `ke`
/// tilts the loop plane about the entry heading (π/2 gives a turn to the
/// right for an upright aircraft).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub uid: String,
    pub speed: f64,
    pub angle: f64,
    pub radius: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub ke: f64,
}

impl Loop {
    pub const PARAMETERS: &'static [&'static str] = &["speed", "angle", "radius", "roll", "ke"];

    pub fn new(uid: &str, speed: f64, angle: f64, radius: f64, roll: f64, ke: f64) -> Self {
        Self {
            uid: uid.to_string(),
            speed,
            angle,
            radius,
            roll,
            ke,
        }
    }

    pub fn duration(&self) -> FsResult<f64> {
        if self.radius <= 0.0 {
            return Err(ScoreError::degenerate(&self.uid, "loop radius must be positive"));
        }
        if self.angle == 0.0 {
            return Err(ScoreError::degenerate(&self.uid, "loop angle must be non zero"));
        }
        checked_div(&self.uid, "duration", self.angle.abs() * self.radius, self.speed)
    }

    /// Rotation axis of the loop in the entry body frame.
    pub fn axis(&self) -> Vec3 {
        euler(self.ke, 0.0, 0.0) * py()
    }

    pub fn rate(&self) -> f64 {
        match self.duration() {
            Ok(d) => self.roll / d,
            Err(_) => 0.0,
        }
    }

    pub fn pitch_rate(&self) -> f64 {
        if self.radius > 0.0 {
            self.speed / self.radius
        } else {
            0.0
        }
    }

    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("speed", self.speed),
            ("angle", self.angle),
            ("radius", self.radius),
            ("roll", self.roll),
            ("ke", self.ke),
            ("rate", self.rate()),
            ("pitch_rate", self.pitch_rate()),
        ]
    }

    /// Loop centre relative to the entry point, in the entry body frame.
    pub fn centre(&self) -> Vec3 {
        let axis = self.axis();
        axis.cross(&px()) * (self.radius * sign(self.angle))
    }

    pub fn create_template(&self, entry: &Transform, time: TimeBase) -> FsResult<State> {
        let duration = self.duration()?;
        let axis = self.axis();
        let c = self.centre();
        build_template(&self.uid, duration, time, |f| {
            let carrier = axis_angle(&axis, self.angle * f);
            let att = carrier * euler(self.roll * f, 0.0, 0.0);
            Kinematic::from_local(
                entry,
                c - carrier * c,
                att,
                carrier * Vec3::new(self.speed, 0.0, 0.0),
            )
        })
    }

    /// Radius from the flown arc length, angle and plane from the definition.
    pub fn match_intention(&self, _entry: &Transform, flown: &State) -> FsResult<Loop> {
        let speed = mean_speed(&self.uid, flown)?;
        let arc: f64 = flown
            .samples
            .windows(2)
            .map(|w| (w[1].pos - w[0].pos).norm())
            .sum();
        let radius = checked_div(&self.uid, "radius", arc, self.angle.abs())?;
        if radius <= 0.0 {
            return Err(ScoreError::degenerate(&self.uid, "flown loop has no extent"));
        }
        let observed = sign(integrated_roll(flown));
        let roll = if observed == 0.0 {
            self.roll
        } else {
            self.roll.abs() * observed
        };
        Ok(Loop {
            uid: self.uid.clone(),
            speed,
            angle: self.angle,
            radius,
            roll,
            ke: self.ke,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pz;
    use std::f64::consts::PI;

    #[test]
    fn half_loop_moves_two_radii_up() {
        let l = Loop::new("e0", 30.0, PI, 50.0, 0.0, 0.0);
        let entry = Transform::identity();
        let tp = l.create_template(&entry, TimeBase::freq(25.0)).unwrap();
        let last = tp.last().unwrap();
        // body -Z is up for the aircraft
        let up = entry.rotation * -pz();
        assert!((last.pos - up * 100.0).norm() < 1e-6);
        assert!((last.att.angle() - PI).abs() < 1e-6);
    }

    #[test]
    fn negative_angle_pushes() {
        let l = Loop::new("e0", 30.0, -PI / 2.0, 50.0, 0.0, 0.0);
        let tp = l.create_template(&Transform::identity(), TimeBase::freq(25.0)).unwrap();
        let last = tp.last().unwrap();
        assert!((last.pos - Vec3::new(50.0, 0.0, 50.0)).norm() < 1e-6);
    }

    #[test]
    fn ke_turns_the_loop_sideways() {
        let l = Loop::new("e0", 30.0, PI / 2.0, 50.0, 0.0, PI / 2.0);
        let tp = l.create_template(&Transform::identity(), TimeBase::freq(25.0)).unwrap();
        let last = tp.last().unwrap();
        assert!((last.pos - Vec3::new(50.0, 50.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn zero_radius_is_degenerate() {
        let l = Loop::new("e0", 30.0, PI, 0.0, 0.0, 0.0);
        assert!(l.create_template(&Transform::identity(), TimeBase::freq(25.0)).is_err());
    }
}
