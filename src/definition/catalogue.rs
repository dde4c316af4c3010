//! Built-in schedules, written with the element builders.
//!
//! A built-in schedule can be named anywhere a schedule file is accepted.

use super::builders::{self, RollComboArgs, SnapArgs, SpinArgs};
use super::eldef::ElDef;
use super::expr::Expr;
use super::mandef::{ManDef, ManDefOrOption, ManOption, SchedDef};
use super::maninfo::{BoxLocation, Direction, Height, ManInfo, Orientation, Position};
use super::manparm::{ManParm, ManParms};
use crate::criteria::library::CriteriaLibrary;
use crate::error::{FsResult, ScoreError};
use crate::scoring::judging_box::JudgingBox;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::path::Path;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;
use Direction::{Downwind, Upwind};
use Height::{Btm, Top};
use Orientation::{Inverted, Upright};

const C45: f64 = FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, EnumIter, EnumString, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum KnownSchedule {
    F3aP23,
}

impl KnownSchedule {
    pub fn build(&self) -> FsResult<SchedDef> {
        match self {
            Self::F3aP23 => p23(),
        }
    }
}

/// A built-in schedule by name, otherwise the schedule file at that path.
pub fn load_schedule(name_or_path: &str) -> FsResult<SchedDef> {
    match KnownSchedule::from_str(name_or_path) {
        Ok(known) => {
            debug!(schedule = %known, "built-in schedule");
            known.build()
        }
        Err(_) => SchedDef::load_from_file(Path::new(name_or_path)),
    }
}

/// F3A parameter pool. `overrides` replace defaults by name.
fn f3a_parms(overrides: &[(&str, f64)]) -> FsResult<ManParms> {
    let lib = CriteriaLibrary::default();
    let mut mps = ManParms::new(vec![
        ManParm::new("speed", 30.0, "m/s", Some(lib.get("inter.speed")?)),
        ManParm::new("loop_radius", 55.0, "m", Some(lib.get("inter.radius")?)),
        ManParm::new("line_length", 130.0, "m", Some(lib.get("inter.length")?)),
        ManParm::new("point_length", 20.0, "m", Some(lib.get("inter.length")?)),
        ManParm::new("partial_roll_rate", PI, "rad/s", Some(lib.get("inter.roll_rate")?)),
        ManParm::new("full_roll_rate", 1.5 * PI, "rad/s", Some(lib.get("inter.roll_rate")?)),
        ManParm::new("snap_rate", 4.0 * PI, "rad/s", Some(lib.get("inter.free")?)),
        ManParm::new("stallturn_rate", PI, "rad/s", None),
        ManParm::new("spin_rate", 1.7 * PI, "rad/s", Some(lib.get("inter.free")?)),
    ]);
    for (name, value) in overrides {
        let base = mps.get(name)?.clone();
        mps.add(ManParm {
            default: *value,
            ..base
        });
    }
    Ok(mps)
}

/// Element definitions for one figure, named `e1`, `e2`... in order.
/// Box centring marks are recorded against element indices counted with
/// the entry line as element 0.
#[derive(Default)]
struct Figure {
    eds: Vec<ElDef>,
    centre_points: Vec<usize>,
    centred_els: Vec<(usize, f64)>,
    last: std::ops::Range<usize>,
    n: usize,
}

impl Figure {
    fn next_name(&mut self) -> String {
        self.n += 1;
        format!("e{}", self.n)
    }

    fn push(mut self, eds: Vec<ElDef>) -> Self {
        let start = self.eds.len();
        self.eds.extend(eds);
        self.last = start..self.eds.len();
        self
    }

    fn loop_(mut self, angle: f64) -> Self {
        let name = self.next_name();
        let ed = builders::loop_(&name, "speed", "loop_radius", angle, 0.0);
        self.push(vec![ed])
    }

    fn rolling_loop(mut self, angle: f64, roll: f64) -> Self {
        let name = self.next_name();
        let ed = builders::rolling_loop(&name, "speed", "loop_radius", angle, roll, 0.0);
        self.push(vec![ed])
    }

    fn line(mut self, length: impl Into<Expr>) -> Self {
        let name = self.next_name();
        let ed = builders::line(&name, "speed", length);
        self.push(vec![ed])
    }

    fn stallturn(mut self) -> Self {
        let name = self.next_name();
        let ed = builders::stallturn(&name, 0.0, "stallturn_rate");
        self.push(vec![ed])
    }

    fn spin(mut self, turns: f64) -> Self {
        let name = self.next_name();
        let args = SpinArgs::builder().speed(10.0).rate("spin_rate").build();
        let ed = builders::spin(&name, turns, &args);
        self.push(vec![ed])
    }

    /// Rolls (`r`) or snaps (`s`) with point pauses, centred in a line of
    /// `line_length` when one is given.
    fn rolls(
        mut self,
        mps: &ManParms,
        rolls: &[f64],
        rolltypes: &str,
        line_length: Option<Expr>,
    ) -> FsResult<Self> {
        let name = self.next_name();
        let args = RollComboArgs::builder()
            .speed("speed")
            .partial_rate("partial_roll_rate")
            .full_rate("full_roll_rate")
            .pause_length("point_length")
            .rolltypes(rolltypes)
            .snap(SnapArgs::builder().speed("speed").rate("snap_rate").build())
            .build();
        let rolls: Vec<Expr> = rolls.iter().map(|r| Expr::lit(*r)).collect();
        let combo = builders::roll_combo(&name, &rolls, &args, mps)?;
        let Some(line_length) = line_length else {
            return Ok(self.push(combo));
        };

        // each combo element carries its length as the second argument
        let rolling = combo
            .iter()
            .filter_map(|ed| ed.args.get(1).cloned())
            .reduce(|a, b| a + b)
            .unwrap_or(Expr::lit(0.0));
        let pad = (line_length - rolling) / Expr::lit(2.0);
        let mut eds = vec![builders::line(&format!("{}_pad1", name), "speed", pad.clone())];
        eds.extend(combo);
        eds.push(builders::line(&format!("{}_pad2", name), "speed", pad));
        Ok(self.push(eds))
    }

    fn roll(self, mps: &ManParms, rolls: &[f64]) -> FsResult<Self> {
        self.rolls(mps, rolls, "", Some(Expr::parm("line_length")))
    }

    /// Puts the point before the next element on the box centre.
    fn centre(mut self) -> Self {
        self.centre_points.push(self.eds.len() + 1);
        self
    }

    /// Centres the middle of whatever was added last.
    fn centred(mut self) -> Self {
        let n = self.last.len();
        if n % 2 == 1 {
            self.centred_els.push((self.last.start + n / 2 + 1, 0.5));
        } else if n > 0 {
            self.centre_points.push(self.last.start + n / 2 + 1);
        }
        self
    }

    fn create(self, info: ManInfo, mps: ManParms) -> FsResult<ManDef> {
        let info = ManInfo {
            centre_points: self.centre_points,
            centred_els: self.centred_els,
            ..info
        };
        ManDef::new(info, mps, self.eds, JudgingBox::triangular())
    }
}

fn info(
    name: &str,
    short_name: &str,
    k: f64,
    position: Position,
    start: (Height, Direction, Orientation),
    end: Height,
) -> ManInfo {
    ManInfo::new(
        name,
        short_name,
        k,
        position,
        BoxLocation::new(start.0, start.1, start.2),
        BoxLocation::new(end, start.1, start.2),
    )
}

/// One definition per roll option, scored as alternatives.
fn options<F>(choices: &[&[f64]], build: F) -> FsResult<ManDefOrOption>
where
    F: Fn(&[f64]) -> FsResult<ManDef>,
{
    let defs = choices
        .iter()
        .map(|c| build(c))
        .collect::<FsResult<Vec<_>>>()?;
    Ok(ManDefOrOption::Options(ManOption::new(defs)?))
}

fn p23() -> FsResult<SchedDef> {
    let half = [PI];
    let full = [2.0 * PI];
    let two_of_four = [PI / 2.0, PI / 2.0];

    let mut mans: Vec<ManDefOrOption> = Vec::new();

    let mps = f3a_parms(&[])?;
    mans.push(
        Figure::default()
            .loop_(PI / 2.0)
            .roll(&mps, &two_of_four)?
            .loop_(PI / 2.0)
            .rolls(&mps, &half, "", Some(Expr::lit(100.0)))?
            .centred()
            .loop_(-PI / 2.0)
            .roll(&mps, &two_of_four)?
            .loop_(-PI / 2.0)
            .create(info("Top Hat", "tHat", 4.0, Position::Centre, (Btm, Upwind, Upright), Btm), mps)?
            .into(),
    );

    let mps = f3a_parms(&[])?;
    mans.push(
        Figure::default()
            .loop_(-PI / 2.0)
            .roll(&mps, &half)?
            .loop_(PI / 2.0)
            .create(info("Half Square Loop", "hSqL", 2.0, Position::End, (Btm, Upwind, Inverted), Top), mps)?
            .into(),
    );

    let mps = f3a_parms(&[])?;
    mans.push(
        Figure::default()
            .centre()
            .loop_(PI / 2.0)
            .roll(&mps, &full)?
            .loop_(PI)
            .centred()
            .roll(&mps, &half)?
            .loop_(-PI / 2.0)
            .create(info("Humpty Bump", "hB", 4.0, Position::Centre, (Top, Downwind, Inverted), Top), mps)?
            .into(),
    );

    let mps = f3a_parms(&[("line_length", 130.0 * C45)])?;
    mans.push(
        Figure::default()
            .loop_(-PI / 4.0)
            .roll(&mps, &half)?
            .loop_(PI / 2.0)
            .roll(&mps, &half)?
            .loop_(-PI / 4.0)
            .create(info("Half Square on Corner", "hSqLC", 3.0, Position::End, (Top, Downwind, Upright), Btm), mps)?
            .into(),
    );

    let mps = f3a_parms(&[("line_length", 110.0 + 130.0 / C45)])?;
    mans.push(
        Figure::default()
            .loop_(-PI / 4.0)
            .rolls(&mps, &[3.0 * PI], "s", Some(Expr::parm("line_length")))?
            .centred()
            .loop_(-PI / 4.0)
            .create(info("45 Upline Snaps", "upL", 5.0, Position::Centre, (Btm, Upwind, Inverted), Top), mps)?
            .into(),
    );

    let mps = f3a_parms(&[("line_length", 50.0)])?;
    mans.push(
        Figure::default()
            .loop_(-PI / 4.0)
            .line("line_length")
            .loop_(-PI / 4.0)
            .line("line_length")
            .loop_(-PI / 4.0)
            .line("line_length")
            .loop_(-PI / 4.0)
            .create(info("Half 8 Sided Loop", "h8L", 3.0, Position::End, (Top, Upwind, Upright), Btm), mps)?
            .into(),
    );

    let mps = f3a_parms(&[])?;
    mans.push(
        Figure::default()
            .rolls(&mps, &[PI, PI, -PI, -PI], "", None)?
            .centred()
            .create(info("Roll Combo", "rollC", 4.0, Position::Centre, (Btm, Downwind, Inverted), Btm), mps)?
            .into(),
    );

    let mps = f3a_parms(&[("loop_radius", 100.0)])?;
    mans.push(
        Figure::default()
            .loop_(-PI)
            .rolls(&mps, &half, "", None)?
            .create(info("Immelman Turn", "pImm", 2.0, Position::End, (Btm, Downwind, Inverted), Top), mps)?
            .into(),
    );

    let mps = f3a_parms(&[])?;
    mans.push(
        Figure::default()
            .spin(5.0 * PI)
            .centred()
            .line("line_length")
            .loop_(PI / 2.0)
            .create(info("Inverted Spin", "iSp", 4.0, Position::Centre, (Top, Upwind, Inverted), Btm), mps)?
            .into(),
    );

    let humpty_options: [&[f64]; 6] = [
        &[PI, PI],
        &[PI, -PI],
        &[-PI, PI],
        &[-PI, -PI],
        &[1.5 * PI, -PI / 2.0],
        &[-1.5 * PI, PI / 2.0],
    ];
    mans.push(options(&humpty_options, |o| {
        let mps = f3a_parms(&[])?;
        Figure::default()
            .loop_(PI / 2.0)
            .roll(&mps, &o[..1])?
            .loop_(PI)
            .roll(&mps, &o[1..])?
            .loop_(-PI / 2.0)
            .create(info("Humpty Bump", "hB2", 3.0, Position::End, (Btm, Upwind, Upright), Btm), mps)
    })?);

    let mps = f3a_parms(&[("loop_radius", 70.0)])?;
    mans.push(
        Figure::default()
            .loop_(-PI / 4.0)
            .rolls(&mps, &[PI, -PI], "", Some(Expr::parm("loop_radius") * Expr::lit(2.0)))?
            .loop_(7.0 * PI / 4.0)
            .centre()
            .rolls(&mps, &two_of_four, "", Some(Expr::lit(100.0)))?
            .loop_(-PI / 2.0)
            .create(info("Reverse Figure Et", "rEt", 4.0, Position::Centre, (Btm, Downwind, Inverted), Top), mps)?
            .into(),
    );

    let mps = f3a_parms(&[])?;
    mans.push(
        Figure::default()
            .loop_(-PI / 2.0)
            .roll(&mps, &half)?
            .loop_(PI / 2.0)
            .create(info("Half Square Loop", "sqL", 2.0, Position::End, (Top, Downwind, Upright), Btm), mps)?
            .into(),
    );

    let m_options: [&[f64]; 2] = [&[1.5 * PI, 1.5 * PI], &[-1.5 * PI, -1.5 * PI]];
    mans.push(options(&m_options, |o| {
        let mps = f3a_parms(&[("line_length", 150.0)])?;
        Figure::default()
            .loop_(PI / 2.0)
            .roll(&mps, &o[..1])?
            .centre()
            .stallturn()
            .line("line_length")
            .loop_(-PI)
            .line("line_length")
            .stallturn()
            .roll(&mps, &o[1..])?
            .loop_(PI / 2.0)
            .create(info("Figure M", "M", 5.0, Position::Centre, (Btm, Upwind, Upright), Btm), mps)
    })?);

    let fighter_options: [&[f64]; 2] = [&[-PI / 2.0, PI / 2.0], &[PI / 2.0, -PI / 2.0]];
    mans.push(options(&fighter_options, |o| {
        let mps = f3a_parms(&[])?;
        Figure::default()
            .loop_(PI / 4.0)
            .roll(&mps, &o[..1])?
            .loop_(-PI)
            .roll(&mps, &o[1..])?
            .loop_(PI / 4.0)
            .create(info("Fighter Turn", "fTrn", 4.0, Position::End, (Btm, Upwind, Upright), Btm), mps)
    })?);

    let mps = f3a_parms(&[])?;
    let side = Expr::parm("line_length") * Expr::lit(C45)
        - Expr::lit(PI / 2.0) * Expr::parm("speed") / Expr::parm("partial_roll_rate");
    mans.push(
        Figure::default()
            .rolls(&mps, &half, "", None)?
            .line(side.clone())
            .loop_(-3.0 * PI / 4.0)
            .roll(&mps, &two_of_four)?
            .loop_(PI / 2.0)
            .centred()
            .roll(&mps, &two_of_four)?
            .loop_(-3.0 * PI / 4.0)
            .line(side)
            .rolls(&mps, &half, "", None)?
            .create(info("Triangular Loop", "trgle", 3.0, Position::Centre, (Btm, Downwind, Upright), Btm), mps)?
            .into(),
    );

    let mps = f3a_parms(&[("loop_radius", 30.0)])?;
    mans.push(
        Figure::default()
            .loop_(PI / 2.0)
            .rolls(&mps, &half, "", Some(Expr::lit(80.0)))?
            .loop_(-3.0 * PI / 4.0)
            .rolls(&mps, &two_of_four, "", Some(Expr::lit(80.0 / C45 + 60.0)))?
            .loop_(-PI / 4.0)
            .create(info("Shark Fin", "sFin", 3.0, Position::End, (Btm, Downwind, Upright), Btm), mps)?
            .into(),
    );

    let loop_options: [&[f64]; 2] = [&[PI], &[-PI]];
    mans.push(options(&loop_options, |o| {
        let mps = f3a_parms(&[("loop_radius", 80.0)])?;
        Figure::default()
            .loop_(-3.0 * PI / 4.0)
            .rolling_loop(-PI / 2.0, o[0])
            .centred()
            .loop_(3.0 * PI / 4.0)
            .create(info("Loop", "loop", 3.0, Position::Centre, (Btm, Upwind, Inverted), Btm), mps)
    })?);

    let sched = SchedDef::new("f3a_p23", mans);
    if let Some(dup) = duplicate_uid(&sched) {
        return Err(ScoreError::definition(&dup, "short name used twice in f3a_p23"));
    }
    Ok(sched)
}

fn duplicate_uid(sched: &SchedDef) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    sched
        .manoeuvres
        .iter()
        .map(|m| m.uid().to_string())
        .find(|uid| !seen.insert(uid.clone()))
}
