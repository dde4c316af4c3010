use super::{build_template, integrated_roll, mean_speed, Kinematic, TimeBase};
use crate::error::{checked_div, FsResult, ScoreError};
use crate::geometry::{euler, Transform, Vec3};
use crate::state::State;
use crate::util::sign;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Flick roll. The nose pitches to `break_angle` over the first
/// `break_roll` of rotation and recovers over the last `recovery_roll`,
/// the flight path stays on the entry heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snap {
    pub uid: String,
    pub speed: f64,
    pub length: f64,
    pub roll: f64,
    pub break_angle: f64,
    pub break_roll: f64,
    pub recovery_roll: f64,
}

impl Snap {
    pub const PARAMETERS: &'static [&'static str] = &[
        "speed",
        "length",
        "roll",
        "break_angle",
        "break_roll",
        "recovery_roll",
    ];

    pub fn new(uid: &str, speed: f64, length: f64, roll: f64, break_angle: f64) -> Self {
        Self {
            uid: uid.to_string(),
            speed,
            length,
            roll,
            break_angle,
            break_roll: PI / 4.0,
            recovery_roll: PI / 2.0,
        }
    }

    fn check(&self) -> FsResult<()> {
        if self.break_roll <= 0.0 || self.recovery_roll <= 0.0 {
            return Err(ScoreError::degenerate(
                &self.uid,
                "break and recovery rolls must be positive",
            ));
        }
        if self.roll.abs() < self.break_roll + self.recovery_roll {
            return Err(ScoreError::degenerate(
                &self.uid,
                format!(
                    "roll {:.2} is shorter than break plus recovery {:.2}",
                    self.roll.abs(),
                    self.break_roll + self.recovery_roll
                ),
            ));
        }
        if self.length <= 0.0 {
            return Err(ScoreError::degenerate(&self.uid, "snap length must be positive"));
        }
        Ok(())
    }

    pub fn duration(&self) -> FsResult<f64> {
        self.check()?;
        checked_div(&self.uid, "duration", self.length, self.speed)
    }

    pub fn rate(&self) -> f64 {
        if self.length.abs() < 1e-9 {
            0.0
        } else {
            self.roll.abs() * self.speed / self.length
        }
    }

    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("speed", self.speed),
            ("length", self.length),
            ("roll", self.roll),
            ("break_angle", self.break_angle),
            ("break_roll", self.break_roll),
            ("recovery_roll", self.recovery_roll),
            ("rate", self.rate()),
        ]
    }

    /// Pitch offset at fraction `f` of the rotation.
    fn alpha(&self, f: f64) -> f64 {
        let fb = self.break_roll / self.roll.abs();
        let fr = self.recovery_roll / self.roll.abs();
        if f < fb {
            self.break_angle * f / fb
        } else if f > 1.0 - fr {
            self.break_angle * (1.0 - f) / fr
        } else {
            self.break_angle
        }
    }

    pub fn create_template(&self, entry: &Transform, time: TimeBase) -> FsResult<State> {
        let duration = self.duration()?;
        build_template(&self.uid, duration, time, |f| {
            Kinematic::from_local(
                entry,
                Vec3::new(self.length * f, 0.0, 0.0),
                euler(self.roll * f, 0.0, 0.0) * euler(0.0, self.alpha(f), 0.0),
                Vec3::new(self.speed, 0.0, 0.0),
            )
        })
    }

    pub fn match_intention(&self, entry: &Transform, flown: &State) -> FsResult<Snap> {
        let speed = mean_speed(&self.uid, flown)?;
        let (first, last) = match (flown.first(), flown.last()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(ScoreError::degenerate(&self.uid, "empty segment")),
        };
        let local = entry.inverse();
        let length = local.point(&last.pos).x - local.point(&first.pos).x;
        if length <= 0.0 {
            return Err(ScoreError::degenerate(
                &self.uid,
                "flown snap does not progress along its heading",
            ));
        }
        let observed = sign(integrated_roll(flown));
        Ok(Snap {
            uid: self.uid.clone(),
            speed,
            length,
            roll: if observed == 0.0 {
                self.roll
            } else {
                self.roll.abs() * observed
            },
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_exits_level_after_full_rotation() {
        let s = Snap::new("e0", 30.0, 45.0, 2.0 * PI, 0.3);
        let tp = s.create_template(&Transform::identity(), TimeBase::freq(25.0)).unwrap();
        let last = tp.last().unwrap();
        assert!(last.att.angle() < 1e-6);
        assert!((last.pos - Vec3::new(45.0, 0.0, 0.0)).norm() < 1e-9);
        // fully broken in the middle of the rotation
        assert!((s.alpha(0.5) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn short_snap_is_degenerate() {
        let s = Snap::new("e0", 30.0, 45.0, PI / 2.0, 0.3);
        assert!(s.duration().is_err());
    }
}
