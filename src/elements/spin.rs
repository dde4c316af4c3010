use super::{build_template, mean_speed, Kinematic, TimeBase};
use crate::error::{checked_div, FsResult, ScoreError};
use crate::geometry::{axis_angle, pz, unit_or, vector_rejection, Quat, Transform, Vec3};
use crate::state::State;
use crate::util::{argmax, cumsum, mean, sign, sign_or_pos};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Vertical autorotation.
///
/// The aircraft drops its nose through a quarter arc while starting to
/// yaw, autorotates straight down about the world vertical, optionally
/// reverses, then stops the rotation. `turns` is the total rotation in
/// radians, positive for a right hand spin. A reversal spins `rturns` the
/// other way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub uid: String,
    pub speed: f64,
    pub height: f64,
    pub turns: f64,
    #[serde(default)]
    pub rturns: f64,
    pub break_angle: f64,
    pub nd_turns: f64,
    pub recovery_turns: f64,
    #[serde(default)]
    pub reversal_turns: f64,
}

/// Durations of each phase at a given rotation rate.
struct Phases {
    rate: f64,
    nose_drop: f64,
    first: f64,
    reversal: f64,
    second: f64,
    recovery: f64,
}

impl Phases {
    fn total(&self) -> f64 {
        self.nose_drop + self.first + self.reversal + self.second + self.recovery
    }
}

impl Spin {
    pub const PARAMETERS: &'static [&'static str] = &[
        "speed",
        "height",
        "turns",
        "rturns",
        "break_angle",
        "nd_turns",
        "recovery_turns",
        "reversal_turns",
    ];

    pub fn new(uid: &str, speed: f64, height: f64, turns: f64, rturns: f64, break_angle: f64) -> Self {
        Self {
            uid: uid.to_string(),
            speed,
            height,
            turns,
            // a reversal always turns against the entry rotation
            rturns: -sign_or_pos(turns) * rturns.abs(),
            break_angle,
            nd_turns: PI / 4.0,
            recovery_turns: PI / 2.0,
            reversal_turns: if rturns == 0.0 { 0.0 } else { PI / 2.0 },
        }
    }

    fn reverses(&self) -> bool {
        self.rturns != 0.0
    }

    /// Rotation spent in steady autorotation before and after any reversal.
    fn autorotation(&self) -> (f64, f64) {
        if self.reverses() {
            (
                self.turns.abs() - self.nd_turns,
                self.rturns.abs() - self.recovery_turns,
            )
        } else {
            (
                self.turns.abs() - self.nd_turns - self.recovery_turns,
                0.0,
            )
        }
    }

    /// Height lost per unit of speed over rate.
    fn height_factor(&self) -> f64 {
        let (a1, a2) = self.autorotation();
        // nose drop lasts 2 nd_turns / rate
        let mut k = self.nd_turns * 4.0 / PI + a1 + 2.0 * self.recovery_turns;
        if self.reverses() {
            k += 2.0 * self.reversal_turns + a2;
        }
        k
    }

    fn check(&self) -> FsResult<()> {
        let (a1, a2) = self.autorotation();
        if self.nd_turns <= 0.0 || self.recovery_turns <= 0.0 {
            return Err(ScoreError::degenerate(
                &self.uid,
                "nose drop and recovery must turn",
            ));
        }
        if a1 < 0.0 || a2 < 0.0 || (self.reverses() && self.reversal_turns <= 0.0) {
            return Err(ScoreError::degenerate(
                &self.uid,
                format!(
                    "{:.2} turns do not cover nose drop, reversal and recovery",
                    self.turns.abs()
                ),
            ));
        }
        if self.height <= 0.0 || self.speed <= 0.0 {
            return Err(ScoreError::degenerate(
                &self.uid,
                "spin needs positive height and speed",
            ));
        }
        Ok(())
    }

    pub fn rate(&self) -> f64 {
        if self.height.abs() < 1e-9 {
            0.0
        } else {
            self.speed * self.height_factor() / self.height
        }
    }

    /// Height the spin loses when rotating at `rate`.
    pub fn get_height(&self, rate: f64) -> FsResult<f64> {
        checked_div(&self.uid, "height", self.speed * self.height_factor(), rate)
    }

    fn phases(&self) -> FsResult<Phases> {
        self.check()?;
        let rate = self.rate();
        let (a1, a2) = self.autorotation();
        let t = |turns: f64| checked_div(&self.uid, "phase", turns, rate);
        Ok(Phases {
            rate,
            nose_drop: t(2.0 * self.nd_turns)?,
            first: t(a1)?,
            reversal: if self.reverses() {
                t(2.0 * self.reversal_turns)?
            } else {
                0.0
            },
            second: t(a2)?,
            recovery: t(2.0 * self.recovery_turns)?,
        })
    }

    pub fn duration(&self) -> FsResult<f64> {
        Ok(self.phases()?.total())
    }

    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("speed", self.speed),
            ("height", self.height),
            ("turns", self.turns),
            ("rturns", self.rturns),
            ("break_angle", self.break_angle),
            ("nd_turns", self.nd_turns),
            ("recovery_turns", self.recovery_turns),
            ("reversal_turns", self.reversal_turns),
            ("rate", self.rate()),
        ]
    }

    /// Yaw about world Z, pitch through the nose drop and pitch offset at
    /// time `t` after entry. The yaw rate ramps up over the nose drop and
    /// down over the recovery.
    fn profile(&self, ph: &Phases, t: f64) -> (f64, f64, f64) {
        let s1 = -sign_or_pos(self.turns);
        let w = ph.rate;
        let t1 = ph.nose_drop + ph.first;
        let theta = if t < ph.nose_drop {
            PI / 2.0 * t / ph.nose_drop
        } else {
            PI / 2.0
        };
        let entry_yaw = |t: f64| {
            if t < ph.nose_drop {
                w * t * t / (2.0 * ph.nose_drop)
            } else {
                w * (t - ph.nose_drop / 2.0)
            }
        };
        let psi1 = s1 * entry_yaw(t1);

        let (psi_recovery_start, s_rec, t_rec_start) = if self.reverses() {
            let t2 = t1 + ph.reversal;
            let t3 = t2 + ph.second;
            if t < t1 {
                return (s1 * entry_yaw(t), theta, self.alpha_at(ph, t));
            }
            if t < t2 {
                let tau = t - t1;
                let psi = psi1 + s1 * w * (tau - tau * tau / ph.reversal);
                return (psi, theta, self.break_angle);
            }
            if t < t3 {
                return (psi1 - s1 * w * (t - t2), theta, self.break_angle);
            }
            (psi1 - s1 * w * ph.second, -s1, t3)
        } else {
            if t < t1 {
                return (s1 * entry_yaw(t), theta, self.alpha_at(ph, t));
            }
            (psi1, s1, t1)
        };

        let tau = (t - t_rec_start).min(ph.recovery);
        let psi = psi_recovery_start + s_rec * w * (tau - tau * tau / (2.0 * ph.recovery));
        let alpha = self.break_angle * (1.0 - tau / ph.recovery);
        (psi, theta, alpha)
    }

    fn alpha_at(&self, ph: &Phases, t: f64) -> f64 {
        if t < ph.nose_drop {
            self.break_angle * t / ph.nose_drop
        } else {
            self.break_angle
        }
    }

    pub fn create_template(&self, entry: &Transform, time: TimeBase) -> FsResult<State> {
        let ph = self.phases()?;
        let total = ph.total();
        let heading = entry.rotate(&Vec3::x());
        let flat = vector_rejection(&heading, &pz());
        if flat.norm() < 1e-6 {
            return Err(ScoreError::degenerate(
                &self.uid,
                "spin entry must not be vertical",
            ));
        }
        let x0 = unit_or(&flat, Vec3::x());
        let down = -pz();
        let h = x0.cross(&down);
        let r_nd = self.speed * ph.nose_drop * 2.0 / PI;
        let e = entry.rotation;

        build_template(&self.uid, total, time, |f| {
            let t = f * total;
            let (psi, theta, alpha) = self.profile(&ph, t);
            let (offset, dir) = if t < ph.nose_drop {
                (
                    (x0 * theta.sin() + down * (1.0 - theta.cos())) * r_nd,
                    x0 * theta.cos() + down * theta.sin(),
                )
            } else {
                (
                    (x0 + down) * r_nd + down * self.speed * (t - ph.nose_drop),
                    down,
                )
            };
            let att: Quat = axis_angle(&pz(), psi)
                * axis_angle(&h, theta)
                * e
                * axis_angle(&Vec3::y(), alpha);
            Kinematic {
                pos: entry.translation + offset,
                att,
                wvel: dir * self.speed,
            }
        })
    }

    /// Height and pitch offset come from the flown segment, the rotation
    /// keeps its magnitude and takes the flown direction.
    pub fn match_intention(&self, _entry: &Transform, flown: &State) -> FsResult<Spin> {
        let speed = mean_speed(&self.uid, flown)?;
        let (first, last) = match (flown.first(), flown.last()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(ScoreError::degenerate(&self.uid, "empty segment")),
        };
        let height = first.pos.z - last.pos.z;
        if height <= 0.0 {
            return Err(ScoreError::degenerate(&self.uid, "flown spin does not descend"));
        }

        let cum = cumsum(&flown.yaw_increments());
        let abs_cum: Vec<f64> = cum.iter().map(|v| v.abs()).collect();
        let peak = argmax(&abs_cum).unwrap_or(0);
        let first_dir = cum.get(peak).copied().unwrap_or(0.0);
        let turns = if first_dir == 0.0 {
            self.turns
        } else {
            -sign(first_dir) * self.turns.abs()
        };
        let rturns = -sign_or_pos(turns) * self.rturns.abs();

        let lower = self.nd_turns + 0.02;
        let upper = if self.reverses() {
            self.turns.abs()
        } else {
            self.turns.abs() - self.recovery_turns
        } - 0.02;
        // cum[i] is the rotation reached at sample i + 1
        let mut alphas: Vec<f64> = (0..cum.len().min(peak + 1))
            .filter(|&i| abs_cum[i] >= lower && abs_cum[i] <= upper)
            .map(|i| {
                let v = flown.samples[i + 1].vel;
                v.z.atan2(v.x)
            })
            .collect();
        if alphas.is_empty() {
            let n = flown.len();
            alphas = flown.samples[n / 3..(2 * n / 3).max(n / 3 + 1).min(n)]
                .iter()
                .map(|s| s.vel.z.atan2(s.vel.x))
                .collect();
        }

        Ok(Spin {
            uid: self.uid.clone(),
            speed,
            height,
            turns,
            rturns,
            break_angle: mean(&alphas),
            ..self.clone()
        })
    }
}
