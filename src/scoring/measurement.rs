//! Flown against template comparisons, one value per sample.

use super::visibility::{rad_vis, roll_vis, vector_vis};
use crate::elements::{Element, Loop};
use crate::error::{FsResult, ScoreError};
use crate::geometry::{px, py, pz, unit_or, vector_rejection, Quat, Vec3};
use crate::state::{Sample, State};
use crate::util::{argmax, sign, unwrap_angles};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: Vec<f64>,
    pub expected: Vec<f64>,
    /// world frame direction an error in `value` moves the aircraft
    pub direction: Vec<Vec3>,
    pub visibility: Vec<f64>,
}

impl Measurement {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn select(&self, indices: &[usize]) -> Measurement {
        fn pick<T: Copy>(vs: &[T], ix: &[usize]) -> Vec<T> {
            ix.iter().filter_map(|i| vs.get(*i).copied()).collect()
        }
        Measurement {
            value: pick(&self.value, indices),
            expected: pick(&self.expected, indices),
            direction: pick(&self.direction, indices),
            visibility: pick(&self.visibility, indices),
        }
    }

    fn build(
        fl: &State,
        value: Vec<f64>,
        expected: Vec<f64>,
        direction: Vec<Vec3>,
        vis: impl Fn(&Vec3, &Vec3) -> f64,
    ) -> Measurement {
        let visibility = fl
            .samples
            .iter()
            .zip(direction.iter())
            .map(|(s, d)| vis(&s.pos, d))
            .collect();
        Measurement {
            value,
            expected,
            direction,
            visibility,
        }
    }
}

/// Every quantity a downgrade can be scored on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Measure {
    Speed,
    /// roll error about the flown body X axis
    RollAngle,
    /// roll error seen as the movement of the template wing axis
    RollAngleY,
    /// roll error seen as the movement of the template belly axis
    RollAngleZ,
    RollAngleGradient,
    /// heading error across the element entry frame
    TrackY,
    /// heading error in the element entry plane
    TrackZ,
    LoopAxialTrack,
    LoopRadialTrack,
    /// relative radius error about the template loop centre
    Radius,
    /// pitch rate relative to the one giving the template radius
    Curvature,
    RollRate,
    AbsRollRate,
    RollRateDelta,
    PivotWidth,
    ReverseYaw,
    YawAttitude,
    PitchAttitude,
    AutorotationAlpha,
    PitchRate,
    Length,
}

impl Measure {
    pub fn measure(&self, el: &Element, fl: &State, tp: &State) -> FsResult<Measurement> {
        if fl.len() != tp.len() {
            return Err(ScoreError::degenerate(
                el.uid(),
                format!("{} flown samples against {} template samples", fl.len(), tp.len()),
            ));
        }
        let tp0 = *tp
            .first()
            .ok_or_else(|| ScoreError::degenerate(el.uid(), "nothing to measure"))?;
        let pairs = || fl.samples.iter().zip(tp.samples.iter());

        let m = match self {
            Measure::Speed => {
                let dirs = pairs().map(|(f, _)| unit_or(&f.world_vel(), f.att * px())).collect();
                Measurement::build(fl, fl.speeds(), tp.speeds(), dirs, vector_vis)
            }
            Measure::RollAngle => {
                let raw: Vec<f64> = pairs().map(|(f, t)| attitude_error(f, t).x).collect();
                roll_measurement(fl, unwrap_angles(&raw))
            }
            Measure::RollAngleY => roll_measurement(fl, projected_roll(fl, tp, &py())),
            Measure::RollAngleZ => roll_measurement(fl, projected_roll(fl, tp, &pz())),
            Measure::RollAngleGradient => {
                let raw: Vec<f64> = pairs().map(|(f, t)| attitude_error(f, t).x).collect();
                roll_measurement(fl, gradient(&unwrap_angles(&raw), fl.dt()))
            }
            Measure::TrackY | Measure::TrackZ => {
                let axis = if *self == Measure::TrackY { py() } else { pz() };
                let (value, dirs): (Vec<f64>, Vec<Vec3>) = pairs()
                    .map(|(f, t)| {
                        let body = tp0.att.inverse() * f.world_vel();
                        let reference = tp0.att.inverse() * t.world_vel();
                        let err = vector_rejection(&body, &unit_or(&reference, px()));
                        let v = track_angle(err.dot(&axis), body.norm());
                        (v, tp0.att * axis)
                    })
                    .unzip();
                Measurement::build(fl, value, zeros(fl), dirs, vector_vis)
            }
            Measure::LoopAxialTrack => {
                let lp = as_loop(el)?;
                let axis = tp0.att * lp.axis();
                let value = fl
                    .samples
                    .iter()
                    .map(|f| {
                        let v = f.world_vel();
                        track_angle(v.dot(&axis), v.norm())
                    })
                    .collect();
                Measurement::build(fl, value, zeros(fl), vec![axis; fl.len()], vector_vis)
            }
            Measure::LoopRadialTrack => {
                let lp = as_loop(el)?;
                let axis = tp0.att * lp.axis();
                let (value, dirs): (Vec<f64>, Vec<Vec3>) = pairs()
                    .map(|(f, t)| {
                        let fv = vector_rejection(&f.world_vel(), &axis);
                        let tv = vector_rejection(&t.world_vel(), &axis);
                        let v = tv.cross(&fv).dot(&axis).atan2(tv.dot(&fv));
                        (v, unit_or(&axis.cross(&tv), pz()))
                    })
                    .unzip();
                Measurement::build(fl, value, zeros(fl), dirs, vector_vis)
            }
            Measure::Radius => {
                let lp = as_loop(el)?;
                let axis = tp0.att * lp.axis();
                let centre = tp0.transform().point(&lp.centre());
                let value = fl
                    .samples
                    .iter()
                    .map(|f| {
                        let r = vector_rejection(&(f.pos - centre), &axis).norm();
                        (r - lp.radius) / lp.radius
                    })
                    .collect();
                Measurement::build(fl, value, zeros(fl), vec![axis; fl.len()], rad_vis)
            }
            Measure::Curvature => {
                let lp = as_loop(el)?;
                let axis = tp0.att * lp.axis();
                let value = fl
                    .samples
                    .iter()
                    .map(|f| {
                        let v = f.world_vel();
                        let w = vector_rejection(&f.world_rvel(), &unit_or(&v, f.att * px()));
                        if v.norm() < 1e-6 {
                            0.0
                        } else {
                            w.norm() * lp.radius / v.norm()
                        }
                    })
                    .collect();
                Measurement::build(fl, value, vec![1.0; fl.len()], vec![axis; fl.len()], rad_vis)
            }
            Measure::RollRate | Measure::AbsRollRate | Measure::RollRateDelta => {
                let value = pairs()
                    .map(|(f, t)| match self {
                        Measure::RollRate => f.rvel.x,
                        Measure::AbsRollRate => f.rvel.x.abs(),
                        _ => f.rvel.x - t.rvel.x,
                    })
                    .collect();
                let expected = tp.samples.iter().map(|t| t.rvel.x).collect();
                let dirs = fl.samples.iter().map(|f| f.att * pz()).collect();
                Measurement::build(fl, value, expected, dirs, roll_vis)
            }
            Measure::PivotWidth => {
                let (value, dirs): (Vec<f64>, Vec<Vec3>) = fl
                    .samples
                    .iter()
                    .map(|f| {
                        let off = vector_rejection(&(f.pos - tp0.pos), &pz());
                        (off.norm(), unit_or(&off, px()))
                    })
                    .unzip();
                Measurement::build(fl, value, zeros(fl), dirs, vector_vis)
            }
            Measure::ReverseYaw => {
                let turn = sign(tp.samples.iter().map(|t| t.rvel.z).sum::<f64>());
                let value = fl.samples.iter().map(|f| -turn * f.rvel.z).collect();
                let dirs = fl.samples.iter().map(|f| f.att * py()).collect();
                Measurement::build(fl, value, zeros(fl), dirs, vector_vis)
            }
            Measure::YawAttitude | Measure::PitchAttitude => {
                let yaw = *self == Measure::YawAttitude;
                let (value, dirs): (Vec<f64>, Vec<Vec3>) = pairs()
                    .map(|(f, t)| {
                        let e = attitude_error(f, t);
                        if yaw {
                            (e.z, f.att * py())
                        } else {
                            (e.y, f.att * pz())
                        }
                    })
                    .unzip();
                Measurement::build(fl, value, zeros(fl), dirs, vector_vis)
            }
            Measure::AutorotationAlpha => {
                let value = pairs().map(|(f, t)| alpha(f) - alpha(t)).collect();
                let expected = tp.samples.iter().map(alpha).collect();
                full_visibility(fl, value, expected)
            }
            Measure::PitchRate => {
                let rates: Vec<f64> = tp.samples.iter().map(|t| t.rvel.y).collect();
                let abs: Vec<f64> = rates.iter().map(|r| r.abs()).collect();
                let peak = match argmax(&abs) {
                    Some(i) if abs[i] > 1e-6 => rates[i],
                    _ => {
                        return Err(ScoreError::degenerate(
                            el.uid(),
                            "template has no pitch rate to compare against",
                        ))
                    }
                };
                let value = fl.samples.iter().map(|f| f.rvel.y / peak).collect();
                let expected = rates.iter().map(|r| r / peak).collect();
                full_visibility(fl, value, expected)
            }
            Measure::Length => {
                let heading = tp0.att * px();
                let (value, expected): (Vec<f64>, Vec<f64>) = pairs()
                    .map(|(f, t)| {
                        let flown = (f.pos - tp0.pos).dot(&heading);
                        let templ = (t.pos - tp0.pos).dot(&heading);
                        (flown - templ, templ)
                    })
                    .unzip();
                Measurement::build(fl, value, expected, vec![heading; fl.len()], vector_vis)
            }
        };
        Ok(m)
    }
}

fn zeros(fl: &State) -> Vec<f64> {
    vec![0.0; fl.len()]
}

fn as_loop(el: &Element) -> FsResult<&Loop> {
    match el {
        Element::Loop(l) if l.radius > 0.0 => Ok(l),
        Element::Loop(l) => Err(ScoreError::degenerate(&l.uid, "loop radius must be positive")),
        other => Err(ScoreError::degenerate(
            other.uid(),
            format!("loop measures do not apply to a {}", other.kind()),
        )),
    }
}

/// Rotation taking the template attitude to the flown one, in the template
/// body frame.
fn attitude_error(f: &Sample, t: &Sample) -> Vec3 {
    let err: Quat = t.att.inverse() * f.att;
    err.scaled_axis()
}

fn projected_roll(fl: &State, tp: &State, axis: &Vec3) -> Vec<f64> {
    fl.samples
        .iter()
        .zip(tp.samples.iter())
        .map(|(f, t)| {
            let seen = f.att.inverse() * (t.att * axis);
            seen.cross(axis).x.clamp(-1.0, 1.0).asin()
        })
        .collect()
}

fn roll_measurement(fl: &State, value: Vec<f64>) -> Measurement {
    let dirs = fl.samples.iter().map(|f| f.att * pz()).collect();
    Measurement::build(fl, value, zeros(fl), dirs, roll_vis)
}

fn full_visibility(fl: &State, value: Vec<f64>, expected: Vec<f64>) -> Measurement {
    let dirs = fl.samples.iter().map(|f| f.att * px()).collect();
    Measurement::build(fl, value, expected, dirs, |_, _| 1.0)
}

fn track_angle(component: f64, speed: f64) -> f64 {
    if speed < 1e-6 {
        0.0
    } else {
        (component / speed).clamp(-1.0, 1.0).asin()
    }
}

fn alpha(s: &Sample) -> f64 {
    s.vel.z.atan2(s.vel.x)
}

fn gradient(vs: &[f64], dt: f64) -> Vec<f64> {
    if vs.len() < 2 {
        return vec![0.0; vs.len()];
    }
    let mut out: Vec<f64> = vs.windows(2).map(|w| (w[1] - w[0]) / dt).collect();
    out.push(out[out.len() - 1]);
    out
}
