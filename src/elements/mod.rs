pub mod line;
pub mod looping;
pub mod snap;
pub mod spin;
pub mod stall_turn;
pub mod tags;

pub use self::line::Line;
pub use self::looping::Loop;
pub use self::snap::Snap;
pub use self::spin::Spin;
pub use self::stall_turn::StallTurn;
pub use self::tags::{check_tags, tag_elements, ElementTag};

use crate::error::{FsResult, ScoreError};
use crate::geometry::{Quat, Transform, Vec3};
use crate::state::State;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Samples per second and start time for a free running template, or a
/// flown segment whose timestamps the template should reuse.
#[derive(Debug, Clone, Copy)]
pub enum TimeBase<'a> {
    Freq { hz: f64, t0: f64 },
    Flown(&'a State),
}

impl<'a> TimeBase<'a> {
    pub fn freq(hz: f64) -> Self {
        TimeBase::Freq { hz, t0: 0.0 }
    }

    fn times(&self, duration: f64, min_points: usize) -> Vec<f64> {
        match self {
            TimeBase::Freq { hz, t0 } => {
                let n = ((duration * hz).ceil() as usize).max(min_points);
                (0..n)
                    .map(|i| t0 + duration * i as f64 / (n - 1) as f64)
                    .collect()
            }
            TimeBase::Flown(st) => st.times(),
        }
    }
}

/// World frame pose and velocity at one instant of a template.
#[derive(Debug, Clone, Copy)]
pub struct Kinematic {
    pub pos: Vec3,
    pub att: Quat,
    pub wvel: Vec3,
}

impl Kinematic {
    /// Maps a pose expressed in the entry frame into the world.
    pub fn from_local(entry: &Transform, pos: Vec3, att: Quat, vel: Vec3) -> Self {
        Self {
            pos: entry.point(&pos),
            att: entry.attitude(&att),
            wvel: entry.rotate(&vel),
        }
    }
}

/// Samples `kin` over the time base. `kin` receives the fraction of the
/// element completed, 0 at entry and 1 at exit.
pub(crate) fn build_template<F>(
    uid: &str,
    duration: f64,
    time: TimeBase,
    kin: F,
) -> FsResult<State>
where
    F: Fn(f64) -> Kinematic,
{
    let times = time.times(duration, 3);
    if times.len() < 2 {
        return Err(ScoreError::degenerate(
            uid,
            format!("template needs at least 2 samples, got {}", times.len()),
        ));
    }
    let t0 = times[0];
    let span = times[times.len() - 1] - t0;
    let frac = |t: f64| if span > 0.0 { (t - t0) / span } else { 0.0 };

    let ks: Vec<Kinematic> = times.iter().map(|t| kin(frac(*t))).collect();
    let pos: Vec<Vec3> = ks.iter().map(|k| k.pos).collect();
    let att: Vec<Quat> = ks.iter().map(|k| k.att).collect();
    let wvel: Vec<Vec3> = ks.iter().map(|k| k.wvel).collect();
    Ok(State::from_kinematics(&times, &pos, &att, &wvel).label_all(uid))
}

/// Total rotation about body X, integrated from the body rates.
pub(crate) fn integrated_roll(st: &State) -> f64 {
    st.samples
        .windows(2)
        .map(|w| w[0].rvel.x * (w[1].t - w[0].t))
        .sum()
}

pub(crate) fn mean_speed(uid: &str, st: &State) -> FsResult<f64> {
    if st.is_empty() {
        return Err(ScoreError::degenerate(uid, "no flown samples to match"));
    }
    Ok(crate::util::mean(&st.speeds()))
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
pub enum ElementKind {
    Line,
    Loop,
    Snap,
    Spin,
    StallTurn,
}

impl ElementKind {
    /// Constructor argument order used by element definitions.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            ElementKind::Line => Line::PARAMETERS,
            ElementKind::Loop => Loop::PARAMETERS,
            ElementKind::Snap => Snap::PARAMETERS,
            ElementKind::Spin => Spin::PARAMETERS,
            ElementKind::StallTurn => StallTurn::PARAMETERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Element {
    Line(Line),
    Loop(Loop),
    Snap(Snap),
    Spin(Spin),
    StallTurn(StallTurn),
}

impl Element {
    /// Builds an element from values given in `kind.parameter_names()` order.
    pub fn from_args(kind: ElementKind, uid: &str, args: &[f64]) -> FsResult<Element> {
        let expected = kind.parameter_names().len();
        if args.len() != expected {
            return Err(ScoreError::degenerate(
                uid,
                format!("{} takes {} arguments, got {}", kind, expected, args.len()),
            ));
        }
        let uid = uid.to_string();
        Ok(match kind {
            ElementKind::Line => Element::Line(Line {
                uid,
                speed: args[0],
                length: args[1],
                roll: args[2],
            }),
            ElementKind::Loop => Element::Loop(Loop {
                uid,
                speed: args[0],
                angle: args[1],
                radius: args[2],
                roll: args[3],
                ke: args[4],
            }),
            ElementKind::Snap => Element::Snap(Snap {
                uid,
                speed: args[0],
                length: args[1],
                roll: args[2],
                break_angle: args[3],
                break_roll: args[4],
                recovery_roll: args[5],
            }),
            ElementKind::Spin => Element::Spin(Spin {
                uid,
                speed: args[0],
                height: args[1],
                turns: args[2],
                rturns: -crate::util::sign_or_pos(args[2]) * args[3].abs(),
                break_angle: args[4],
                nd_turns: args[5],
                recovery_turns: args[6],
                reversal_turns: args[7],
            }),
            ElementKind::StallTurn => Element::StallTurn(StallTurn {
                uid,
                speed: args[0],
                yaw_rate: args[1],
            }),
        })
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Line(_) => ElementKind::Line,
            Element::Loop(_) => ElementKind::Loop,
            Element::Snap(_) => ElementKind::Snap,
            Element::Spin(_) => ElementKind::Spin,
            Element::StallTurn(_) => ElementKind::StallTurn,
        }
    }

    pub fn uid(&self) -> &str {
        match self {
            Element::Line(e) => &e.uid,
            Element::Loop(e) => &e.uid,
            Element::Snap(e) => &e.uid,
            Element::Spin(e) => &e.uid,
            Element::StallTurn(e) => &e.uid,
        }
    }

    pub fn with_uid(&self, uid: &str) -> Element {
        let mut out = self.clone();
        match &mut out {
            Element::Line(e) => e.uid = uid.to_string(),
            Element::Loop(e) => e.uid = uid.to_string(),
            Element::Snap(e) => e.uid = uid.to_string(),
            Element::Spin(e) => e.uid = uid.to_string(),
            Element::StallTurn(e) => e.uid = uid.to_string(),
        }
        out
    }

    pub fn speed(&self) -> f64 {
        match self {
            Element::Line(e) => e.speed,
            Element::Loop(e) => e.speed,
            Element::Snap(e) => e.speed,
            Element::Spin(e) => e.speed,
            Element::StallTurn(e) => e.speed,
        }
    }

    /// Named parameters, including derived values such as `rate`.
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        match self {
            Element::Line(e) => e.parameters(),
            Element::Loop(e) => e.parameters(),
            Element::Snap(e) => e.parameters(),
            Element::Spin(e) => e.parameters(),
            Element::StallTurn(e) => e.parameters(),
        }
    }

    pub fn get_parameter(&self, name: &str) -> FsResult<f64> {
        self.parameters()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| {
                ScoreError::degenerate(self.uid(), format!("{} has no parameter {}", self.kind(), name))
            })
    }

    pub fn duration(&self) -> FsResult<f64> {
        match self {
            Element::Line(e) => e.duration(),
            Element::Loop(e) => e.duration(),
            Element::Snap(e) => e.duration(),
            Element::Spin(e) => e.duration(),
            Element::StallTurn(e) => e.duration(),
        }
    }

    pub fn create_template(&self, entry: &Transform, time: TimeBase) -> FsResult<State> {
        match self {
            Element::Line(e) => e.create_template(entry, time),
            Element::Loop(e) => e.create_template(entry, time),
            Element::Snap(e) => e.create_template(entry, time),
            Element::Spin(e) => e.create_template(entry, time),
            Element::StallTurn(e) => e.create_template(entry, time),
        }
    }

    pub fn match_intention(&self, entry: &Transform, flown: &State) -> FsResult<Element> {
        Ok(match self {
            Element::Line(e) => Element::Line(e.match_intention(entry, flown)?),
            Element::Loop(e) => Element::Loop(e.match_intention(entry, flown)?),
            Element::Snap(e) => Element::Snap(e.match_intention(entry, flown)?),
            Element::Spin(e) => Element::Spin(e.match_intention(entry, flown)?),
            Element::StallTurn(e) => Element::StallTurn(e.match_intention(entry, flown)?),
        })
    }

    /// Pose at the end of the element when entered at `entry`.
    pub fn exit_transform(&self, entry: &Transform) -> FsResult<Transform> {
        let tp = self.create_template(entry, TimeBase::freq(25.0))?;
        tp.last()
            .map(|s| s.transform())
            .ok_or_else(|| ScoreError::degenerate(self.uid(), "empty template"))
    }

    /// Takes the rotation directions of `other`, keeping this element's magnitudes.
    pub fn copy_direction(&self, other: &Element) -> Element {
        use crate::util::sign_or_pos;
        let mut out = self.clone();
        match (&mut out, other) {
            (Element::Line(a), Element::Line(b)) => a.roll = a.roll.abs() * sign_or_pos(b.roll),
            (Element::Loop(a), Element::Loop(b)) => a.roll = a.roll.abs() * sign_or_pos(b.roll),
            (Element::Snap(a), Element::Snap(b)) => a.roll = a.roll.abs() * sign_or_pos(b.roll),
            (Element::Spin(a), Element::Spin(b)) => {
                a.turns = a.turns.abs() * sign_or_pos(b.turns);
                a.rturns = a.rturns.abs() * sign_or_pos(b.rturns);
            }
            (Element::StallTurn(a), Element::StallTurn(b)) => {
                a.yaw_rate = a.yaw_rate.abs() * sign_or_pos(b.yaw_rate)
            }
            _ => {}
        }
        out
    }

    /// Same kind and uid with every parameter within `tol`.
    pub fn approx_eq(&self, other: &Element, tol: f64) -> bool {
        self.kind() == other.kind()
            && self.uid() == other.uid()
            && self
                .parameters()
                .iter()
                .zip(other.parameters().iter())
                .all(|((_, a), (_, b))| (a - b).abs() <= tol)
    }

    pub fn roll(&self) -> f64 {
        match self {
            Element::Line(e) => e.roll,
            Element::Loop(e) => e.roll,
            Element::Snap(e) => e.roll,
            Element::Spin(e) => e.turns,
            Element::StallTurn(_) => 0.0,
        }
    }
}
