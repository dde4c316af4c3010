//! Crops a measurement to the part of an element a downgrade looks at.
//!
//! Selectors are written as `name` or `name(key:value,...)`, for example
//! `after_slowdown(sp:13)` or `autorotation(brot:0.785,rrot:1.571)`.

use crate::error::{FsResult, ScoreError};
use crate::geometry::{px, unit_or};
use crate::state::State;
use crate::util::{argmax, argmin};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    Last,
    First,
    FirstAndLast,
    /// a single index, negative counts back from the end
    One { i: i64 },
    /// drops `fraction` of the samples at each end
    Middle { fraction: f64 },
    AfterSlowdown { sp: f64 },
    BeforeSlowdown { sp: f64 },
    AfterSpeedup { sp: f64 },
    BeforeSpeedup { sp: f64 },
    /// up to the point the autorotation has turned through `rot`
    AutorotBreak { rot: f64 },
    /// the last `rot` of the autorotation
    AutorotRecovery { rot: f64 },
    BeforeRecovery { rot: f64 },
    Autorotation { brot: f64, rrot: f64 },
    Maximum,
    Minimum,
    Absmax,
}

impl Selector {
    /// Indices into `fl` (and `vs`, the measured values over `fl`).
    pub fn select(&self, fl: &State, vs: &[f64]) -> Vec<usize> {
        let n = fl.len().min(vs.len());
        if n == 0 {
            return Vec::new();
        }
        let speeds = || fl.samples.iter().map(|s| s.vel.x.abs());
        match *self {
            Selector::Last => vec![n - 1],
            Selector::First => vec![0],
            Selector::FirstAndLast if n == 1 => vec![0],
            Selector::FirstAndLast => vec![0, n - 1],
            Selector::One { i } => {
                let ix = if i < 0 { n as i64 + i } else { i };
                if (0..n as i64).contains(&ix) {
                    vec![ix as usize]
                } else {
                    Vec::new()
                }
            }
            Selector::Middle { fraction } => {
                let cut = (n as f64 * fraction.clamp(0.0, 0.5)).floor() as usize;
                let (a, b) = (cut, n - cut);
                if b > a {
                    (a..b).collect()
                } else {
                    vec![n / 2]
                }
            }
            Selector::AfterSlowdown { sp } => {
                let id = speeds().position(|v| v < sp).filter(|i| *i > 0).unwrap_or(n);
                (id..n).collect()
            }
            Selector::BeforeSlowdown { sp } => {
                let id = speeds().position(|v| v < sp).filter(|i| *i > 0).unwrap_or(n);
                (0..id.min(n)).collect()
            }
            Selector::AfterSpeedup { sp } => {
                let id = speeds().position(|v| v > sp).unwrap_or(0);
                (id..n).collect()
            }
            Selector::BeforeSpeedup { sp } => {
                let id = speeds().position(|v| v > sp).filter(|i| *i > 0).unwrap_or(n);
                (0..id.min(n)).collect()
            }
            Selector::AutorotBreak { rot } => {
                let rots = rotation(fl);
                let id = rots.iter().position(|r| r.abs() > rot).unwrap_or(0);
                (0..=id.min(n - 1)).collect()
            }
            Selector::AutorotRecovery { rot } => {
                let start = last_before_recovery(&rotation(fl), rot).unwrap_or(0);
                (start..n).collect()
            }
            Selector::BeforeRecovery { rot } => {
                let stop = last_before_recovery(&rotation(fl), rot).unwrap_or(n - 1);
                (0..=stop.min(n - 1)).collect()
            }
            Selector::Autorotation { brot, rrot } => {
                let rots = rotation(fl);
                let start = rots.iter().position(|r| r.abs() > brot).unwrap_or(0);
                let stop = last_before_recovery(&rots, rrot).unwrap_or(n - 1).min(n - 1);
                if stop >= start {
                    (start..=stop).collect()
                } else {
                    Vec::new()
                }
            }
            Selector::Maximum => argmax(&vs[..n]).into_iter().collect(),
            Selector::Minimum => argmin(&vs[..n]).into_iter().collect(),
            Selector::Absmax => {
                let abs: Vec<f64> = vs[..n].iter().map(|v| v.abs()).collect();
                argmax(&abs).into_iter().collect()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Selector::Last => "last",
            Selector::First => "first",
            Selector::FirstAndLast => "first_and_last",
            Selector::One { .. } => "one",
            Selector::Middle { .. } => "middle",
            Selector::AfterSlowdown { .. } => "after_slowdown",
            Selector::BeforeSlowdown { .. } => "before_slowdown",
            Selector::AfterSpeedup { .. } => "after_speedup",
            Selector::BeforeSpeedup { .. } => "before_speedup",
            Selector::AutorotBreak { .. } => "autorot_break",
            Selector::AutorotRecovery { .. } => "autorot_recovery",
            Selector::BeforeRecovery { .. } => "before_recovery",
            Selector::Autorotation { .. } => "autorotation",
            Selector::Maximum => "maximum",
            Selector::Minimum => "minimum",
            Selector::Absmax => "absmax",
        }
    }

    fn args(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Selector::One { i } => vec![("i", i as f64)],
            Selector::Middle { fraction } => vec![("fraction", fraction)],
            Selector::AfterSlowdown { sp }
            | Selector::BeforeSlowdown { sp }
            | Selector::AfterSpeedup { sp }
            | Selector::BeforeSpeedup { sp } => vec![("sp", sp)],
            Selector::AutorotBreak { rot }
            | Selector::AutorotRecovery { rot }
            | Selector::BeforeRecovery { rot } => vec![("rot", rot)],
            Selector::Autorotation { brot, rrot } => vec![("brot", brot), ("rrot", rrot)],
            _ => Vec::new(),
        }
    }
}

/// Cumulative rotation about the velocity vector, body frame.
pub fn rotation(fl: &State) -> Vec<f64> {
    let dt = fl.dt();
    let mut acc = 0.0;
    fl.samples
        .iter()
        .map(|s| {
            acc += s.rvel.dot(&unit_or(&s.vel, px())) * dt;
            acc
        })
        .collect()
}

/// Last index still more than `rot` short of the final rotation.
fn last_before_recovery(rots: &[f64], rot: f64) -> Option<usize> {
    let end = rots.last()?.abs();
    rots.iter().rposition(|r| end - r.abs() > rot)
}

/// Runs `selectors` in turn, each on the samples the previous one kept.
/// Returns indices into the full `fl`.
pub fn select_all(selectors: &[Selector], fl: &State, vs: &[f64]) -> Vec<usize> {
    let mut keys: Vec<usize> = (0..fl.len().min(vs.len())).collect();
    for sel in selectors {
        let sub_fl = fl.pick(&keys);
        let sub_vs: Vec<f64> = keys.iter().map(|k| vs[*k]).collect();
        keys = sel
            .select(&sub_fl, &sub_vs)
            .into_iter()
            .filter_map(|i| keys.get(i).copied())
            .collect();
        if keys.is_empty() {
            break;
        }
    }
    keys
}

/// Splits `name(k:v,...)` into the name and its numeric arguments.
pub(crate) fn parse_call(s: &str) -> FsResult<(String, BTreeMap<String, f64>)> {
    let s = s.trim();
    let (name, body) = match s.find('(') {
        Some(open) if s.ends_with(')') => (&s[..open], &s[open + 1..s.len() - 1]),
        Some(_) => return Err(ScoreError::Config(format!("unclosed call {}", s))),
        None => (s, ""),
    };
    let mut args = BTreeMap::new();
    for part in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (k, v) = part
            .split_once(':')
            .ok_or_else(|| ScoreError::Config(format!("argument {} has no value", part)))?;
        let v: f64 = v
            .trim()
            .parse()
            .map_err(|_| ScoreError::Config(format!("argument {} is not a number", part)))?;
        args.insert(k.trim().to_string(), v);
    }
    Ok((name.trim().to_string(), args))
}

/// Writes `name(k:v,...)`, or just `name` without arguments.
pub(crate) fn format_call(f: &mut fmt::Formatter<'_>, name: &str, args: &[(&str, f64)]) -> fmt::Result {
    if args.is_empty() {
        return write!(f, "{}", name);
    }
    let inner: Vec<String> = args.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
    write!(f, "{}({})", name, inner.join(","))
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_call(f, self.name(), &self.args())
    }
}

impl FromStr for Selector {
    type Err = ScoreError;

    fn from_str(s: &str) -> FsResult<Self> {
        let (name, args) = parse_call(s)?;
        let name = name.as_str();
        let arg = |k: &str| {
            args.get(k)
                .copied()
                .ok_or_else(|| ScoreError::Config(format!("selector {} needs {}", name, k)))
        };
        Ok(match name {
            "last" => Selector::Last,
            "first" => Selector::First,
            "first_and_last" => Selector::FirstAndLast,
            "one" => Selector::One { i: arg("i")? as i64 },
            "middle" => Selector::Middle {
                fraction: arg("fraction")?,
            },
            "after_slowdown" => Selector::AfterSlowdown { sp: arg("sp")? },
            "before_slowdown" => Selector::BeforeSlowdown { sp: arg("sp")? },
            "after_speedup" => Selector::AfterSpeedup { sp: arg("sp")? },
            "before_speedup" => Selector::BeforeSpeedup { sp: arg("sp")? },
            "autorot_break" => Selector::AutorotBreak { rot: arg("rot")? },
            "autorot_recovery" => Selector::AutorotRecovery { rot: arg("rot")? },
            "before_recovery" => Selector::BeforeRecovery { rot: arg("rot")? },
            "autorotation" => Selector::Autorotation {
                brot: arg("brot")?,
                rrot: arg("rrot")?,
            },
            "maximum" => Selector::Maximum,
            "minimum" => Selector::Minimum,
            "absmax" => Selector::Absmax,
            other => return Err(ScoreError::Config(format!("unknown selector {}", other))),
        })
    }
}

impl TryFrom<String> for Selector {
    type Error = ScoreError;

    fn try_from(s: String) -> FsResult<Self> {
        s.parse()
    }
}

impl From<Selector> for String {
    fn from(s: Selector) -> String {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Quat, Vec3};

    fn slowing(n: usize) -> State {
        let t: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
        let pos = vec![Vec3::zeros(); n];
        let att = vec![Quat::identity(); n];
        let wvel: Vec<Vec3> = (0..n)
            .map(|i| Vec3::new(30.0 - 3.0 * i as f64, 0.0, 0.0))
            .collect();
        State::from_kinematics(&t, &pos, &att, &wvel)
    }

    #[test]
    fn slowdown_splits_the_element() {
        let fl = slowing(10);
        let vs = vec![0.0; 10];
        let before = Selector::BeforeSlowdown { sp: 13.0 }.select(&fl, &vs);
        let after = Selector::AfterSlowdown { sp: 13.0 }.select(&fl, &vs);
        assert_eq!(before, (0..6).collect::<Vec<_>>());
        assert_eq!(after, (6..10).collect::<Vec<_>>());
    }

    #[test]
    fn chained_selectors_index_the_full_element() {
        let fl = slowing(10);
        let vs: Vec<f64> = (0..10).map(|i| (i as f64 - 3.0).abs()).collect();
        let keys = select_all(&[Selector::BeforeSlowdown { sp: 13.0 }, Selector::Minimum], &fl, &vs);
        assert_eq!(keys, vec![3]);
        let keys = select_all(&[Selector::AfterSlowdown { sp: 13.0 }, Selector::First], &fl, &vs);
        assert_eq!(keys, vec![6]);
    }

    #[test]
    fn middle_and_one() {
        let fl = slowing(10);
        let vs = vec![0.0; 10];
        assert_eq!(Selector::Middle { fraction: 0.2 }.select(&fl, &vs), vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(Selector::One { i: -1 }.select(&fl, &vs), vec![9]);
        assert!(Selector::One { i: 12 }.select(&fl, &vs).is_empty());
    }

    #[test]
    fn text_form_round_trips() {
        for s in ["last", "after_slowdown(sp:13)", "autorotation(brot:0.5,rrot:1.5)"] {
            let sel: Selector = s.parse().unwrap();
            assert_eq!(sel.to_string(), s);
        }
        assert!("autorotation(brot:0.5)".parse::<Selector>().is_err());
        assert!("sideways".parse::<Selector>().is_err());
        let json = serde_json::to_string(&Selector::One { i: 2 }).unwrap();
        assert_eq!(json, "\"one(i:2)\"");
    }
}
