use super::{build_template, integrated_roll, mean_speed, Kinematic, TimeBase};
use crate::error::{checked_div, FsResult, ScoreError};
use crate::geometry::{euler, Transform, Vec3};
use crate::state::State;
use crate::util::sign;
use serde::{Deserialize, Serialize};

/// Straight flight along the entry heading, optionally rolling at a
/// constant rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub uid: String,
    pub speed: f64,
    pub length: f64,
    /// total roll angle, radians, positive to the right
    #[serde(default)]
    pub roll: f64,
}

impl Line {
    pub const PARAMETERS: &'static [&'static str] = &["speed", "length", "roll"];

    pub fn new(uid: &str, speed: f64, length: f64, roll: f64) -> Self {
        Self {
            uid: uid.to_string(),
            speed,
            length,
            roll,
        }
    }

    pub fn duration(&self) -> FsResult<f64> {
        if self.length <= 0.0 {
            return Err(ScoreError::degenerate(&self.uid, "line length must be positive"));
        }
        checked_div(&self.uid, "duration", self.length, self.speed)
    }

    pub fn rate(&self) -> f64 {
        if self.length.abs() < 1e-9 {
            0.0
        } else {
            self.roll * self.speed / self.length
        }
    }

    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("speed", self.speed),
            ("length", self.length),
            ("roll", self.roll),
            ("rate", self.rate()),
        ]
    }

    pub fn create_template(&self, entry: &Transform, time: TimeBase) -> FsResult<State> {
        let duration = self.duration()?;
        build_template(&self.uid, duration, time, |f| {
            Kinematic::from_local(
                entry,
                Vec3::new(self.length * f, 0.0, 0.0),
                euler(self.roll * f, 0.0, 0.0),
                Vec3::new(self.speed, 0.0, 0.0),
            )
        })
    }

    /// Speed and length come from the flown segment, the roll keeps its
    /// magnitude and takes the flown direction.
    pub fn match_intention(&self, entry: &Transform, flown: &State) -> FsResult<Line> {
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
                format!("flown line does not progress along its heading ({:.2} m)", length),
            ));
        }
        let observed = sign(integrated_roll(flown));
        let roll = if observed == 0.0 {
            self.roll
        } else {
            self.roll.abs() * observed
        };
        Ok(Line {
            uid: self.uid.clone(),
            speed,
            length,
            roll,
        })
    }
}
