//! Element definition shorthands used when writing schedules.
//!
//! Arguments accept anything convertible to an `Expr`: a number is a
//! literal, a `&str` names a parameter.

use super::eldef::ElDef;
use super::expr::{Expr, Scope};
use crate::elements::ElementKind;
use crate::error::{FsResult, ScoreError};
use std::f64::consts::PI;
use typed_builder::TypedBuilder;

pub fn line(name: &str, speed: impl Into<Expr>, length: impl Into<Expr>) -> ElDef {
    ElDef::new(
        name,
        ElementKind::Line,
        vec![speed.into(), length.into(), Expr::lit(0.0)],
    )
}

/// A line just long enough to roll `rolls` radians at `rate`.
pub fn roll(name: &str, speed: impl Into<Expr>, rate: impl Into<Expr>, rolls: impl Into<Expr>) -> ElDef {
    let (speed, rate, rolls) = (speed.into(), rate.into(), rolls.into());
    ElDef::new(
        name,
        ElementKind::Line,
        vec![
            speed.clone(),
            rolls.clone().abs() * speed / rate.clone(),
            rolls,
        ],
    )
    .collecting(&rate, "rate")
}

pub fn loop_(
    name: &str,
    speed: impl Into<Expr>,
    radius: impl Into<Expr>,
    angle: impl Into<Expr>,
    ke: impl Into<Expr>,
) -> ElDef {
    rolling_loop(name, speed, radius, angle, 0.0, ke)
}

pub fn rolling_loop(
    name: &str,
    speed: impl Into<Expr>,
    radius: impl Into<Expr>,
    angle: impl Into<Expr>,
    roll: impl Into<Expr>,
    ke: impl Into<Expr>,
) -> ElDef {
    ElDef::new(
        name,
        ElementKind::Loop,
        vec![speed.into(), angle.into(), radius.into(), roll.into(), ke.into()],
    )
}

pub fn stallturn(name: &str, speed: impl Into<Expr>, yaw_rate: impl Into<Expr>) -> ElDef {
    ElDef::new(
        name,
        ElementKind::StallTurn,
        vec![speed.into(), yaw_rate.into()],
    )
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SnapArgs {
    #[builder(setter(into))]
    pub speed: Expr,
    #[builder(setter(into))]
    pub rate: Expr,
    #[builder(default = Expr::lit(PI / 4.0), setter(into))]
    pub break_angle: Expr,
    #[builder(default = Expr::lit(PI / 4.0), setter(into))]
    pub break_roll: Expr,
    #[builder(default = Expr::lit(PI / 2.0), setter(into))]
    pub recovery_roll: Expr,
}

/// A snap covering `rolls` radians at the autorotation `rate`.
pub fn snap(name: &str, rolls: impl Into<Expr>, args: &SnapArgs) -> ElDef {
    let rolls = rolls.into();
    ElDef::new(
        name,
        ElementKind::Snap,
        vec![
            args.speed.clone(),
            args.speed.clone() * rolls.clone().abs() / args.rate.clone(),
            rolls,
            args.break_angle.clone(),
            args.break_roll.clone(),
            args.recovery_roll.clone(),
        ],
    )
    .collecting(&args.rate, "rate")
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SpinArgs {
    #[builder(setter(into))]
    pub speed: Expr,
    #[builder(setter(into))]
    pub rate: Expr,
    #[builder(default = Expr::lit(PI / 4.0), setter(into))]
    pub break_angle: Expr,
    #[builder(default = PI / 4.0)]
    pub nd_turns: f64,
    #[builder(default = PI / 2.0)]
    pub recovery_turns: f64,
    /// rotation after a reversal, 0 for a plain spin
    #[builder(default = 0.0)]
    pub rturns: f64,
}

/// A spin of `turns` radians whose height follows from the rotation rate.
pub fn spin(name: &str, turns: impl Into<Expr>, args: &SpinArgs) -> ElDef {
    let turns = turns.into();
    let reversal = if args.rturns == 0.0 { 0.0 } else { PI / 2.0 };
    // height factor less the |turns| term, matching Spin::rate
    let mut k = args.nd_turns * (4.0 / PI - 1.0) + args.recovery_turns;
    if args.rturns != 0.0 {
        k += args.rturns.abs() + 2.0 * reversal;
    }
    let height = args.speed.clone() * (turns.clone().abs() + Expr::lit(k)) / args.rate.clone();
    ElDef::new(
        name,
        ElementKind::Spin,
        vec![
            args.speed.clone(),
            height,
            turns,
            Expr::lit(args.rturns),
            args.break_angle.clone(),
            Expr::lit(args.nd_turns),
            Expr::lit(args.recovery_turns),
            Expr::lit(reversal),
        ],
    )
    .collecting(&args.rate, "rate")
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct RollComboArgs {
    #[builder(setter(into))]
    pub speed: Expr,
    /// roll rate for rolls of less than a full turn
    #[builder(setter(into))]
    pub partial_rate: Expr,
    #[builder(setter(into))]
    pub full_rate: Expr,
    #[builder(setter(into))]
    pub pause_length: Expr,
    /// `r` for a roll, `s` for a snap, one per roll. Empty means all rolls.
    #[builder(default, setter(into))]
    pub rolltypes: String,
    #[builder(default, setter(strip_option))]
    pub snap: Option<SnapArgs>,
}

/// Consecutive rolls or snaps with a pause between rolls in the same
/// direction. `scope` resolves the roll values used to pick rates and
/// pauses.
pub fn roll_combo(
    name: &str,
    rolls: &[Expr],
    args: &RollComboArgs,
    scope: &dyn Scope,
) -> FsResult<Vec<ElDef>> {
    let values = rolls
        .iter()
        .map(|r| r.eval(scope))
        .collect::<FsResult<Vec<f64>>>()?;
    let types: Vec<char> = if args.rolltypes.is_empty() {
        vec!['r'; rolls.len()]
    } else {
        args.rolltypes.chars().collect()
    };
    if types.len() != rolls.len() {
        return Err(ScoreError::definition(
            name,
            format!("{} roll types for {} rolls", types.len(), rolls.len()),
        ));
    }

    let mut eds = Vec::new();
    for (i, (r, v)) in rolls.iter().zip(values.iter()).enumerate() {
        let uid = format!("{}_{}", name, i);
        match types[i] {
            'r' => {
                let rate = if v.abs() < 2.0 * PI {
                    args.partial_rate.clone()
                } else {
                    args.full_rate.clone()
                };
                eds.push(roll(&uid, args.speed.clone(), rate, r.clone()));
            }
            's' => {
                let sa = args.snap.as_ref().ok_or_else(|| {
                    ScoreError::definition(name, "snap requested without snap arguments")
                })?;
                eds.push(snap(&uid, r.clone(), sa));
            }
            other => {
                return Err(ScoreError::definition(
                    name,
                    format!("unknown roll type {}", other),
                ))
            }
        }
        if let Some(next) = values.get(i + 1) {
            if v.signum() == next.signum() {
                eds.push(line(
                    &format!("{}_{}_pause", name, i + 1),
                    args.speed.clone(),
                    args.pause_length.clone(),
                ));
            }
        }
    }
    Ok(eds)
}
