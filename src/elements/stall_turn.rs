use super::{build_template, mean_speed, Kinematic, TimeBase};
use crate::error::{checked_div, FsResult, ScoreError};
use crate::geometry::{euler, Transform, Vec3};
use crate::state::State;
use crate::util::argmax;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Half turn about the body Z axis at the top of a vertical line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallTurn {
    pub uid: String,
    #[serde(default)]
    pub speed: f64,
    pub yaw_rate: f64,
}

impl StallTurn {
    pub const PARAMETERS: &'static [&'static str] = &["speed", "yaw_rate"];

    pub fn new(uid: &str, yaw_rate: f64) -> Self {
        Self {
            uid: uid.to_string(),
            speed: 0.0,
            yaw_rate,
        }
    }

    pub fn duration(&self) -> FsResult<f64> {
        checked_div(&self.uid, "duration", PI, self.yaw_rate.abs())
    }

    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![("speed", self.speed), ("yaw_rate", self.yaw_rate)]
    }

    pub fn create_template(&self, entry: &Transform, time: TimeBase) -> FsResult<State> {
        let duration = self.duration()?;
        let turn = PI * self.yaw_rate.signum();
        build_template(&self.uid, duration, time, |f| {
            Kinematic::from_local(entry, Vec3::zeros(), euler(0.0, 0.0, turn * f), Vec3::zeros())
        })
    }

    /// The yaw rate at the fastest point of the pivot, and the mean speed.
    pub fn match_intention(&self, _entry: &Transform, flown: &State) -> FsResult<StallTurn> {
        let speed = mean_speed(&self.uid, flown)?;
        let rates: Vec<f64> = flown.samples.iter().map(|s| s.rvel.z).collect();
        let abs: Vec<f64> = rates.iter().map(|r| r.abs()).collect();
        let yaw_rate = match argmax(&abs) {
            Some(i) if abs[i] > 1e-6 => rates[i],
            _ => {
                return Err(ScoreError::degenerate(
                    &self.uid,
                    "flown stall turn does not yaw",
                ))
            }
        };
        Ok(StallTurn {
            uid: self.uid.clone(),
            speed,
            yaw_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stallturn_stays_in_place() {
        let st = StallTurn::new("e0", 3.0);
        let entry = Transform::new(Vec3::new(10.0, 150.0, 180.0), euler(0.0, -PI / 2.0, 0.0));
        let tp = st.create_template(&entry, TimeBase::freq(25.0)).unwrap();
        assert!(tp.samples.iter().all(|s| (s.pos - entry.translation).norm() < 1e-9));
        assert!((tp.duration() - PI / 3.0).abs() < 1e-9);
        let m = st.match_intention(&entry, &tp).unwrap();
        assert!((m.yaw_rate - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_yaw_rate_is_degenerate() {
        assert!(StallTurn::new("e0", 0.0).duration().is_err());
    }
}
