#![allow(dead_code)]

use flightscore::criteria::library::CriteriaLibrary;
use flightscore::definition::builders::{line, loop_, roll, stallturn};
use flightscore::definition::{
    BoxLocation, Direction, Heading, Height, ManDef, ManInfo, ManParm, ManParms, Orientation,
    Position, SchedDef,
};
use flightscore::geometry::{euler, Quat, Transform, Vec3};
use flightscore::scoring::JudgingBox;
use flightscore::state::{Sample, State};
use std::f64::consts::PI;

pub fn upright(height: Height) -> BoxLocation {
    BoxLocation::new(height, Direction::Upwind, Orientation::Upright)
}

/// Two loops of the same radius, joined by a half roll.
pub fn loops() -> ManDef {
    let lib = CriteriaLibrary::default();
    ManDef::new(
        ManInfo::new("Two Loops", "loops", 3.0, Position::Centre, upright(Height::Btm), upright(Height::Btm)),
        ManParms::new(vec![
            ManParm::new("speed", 30.0, "m/s", Some(lib.get("inter.speed").unwrap())),
            ManParm::new("loop_radius", 55.0, "m", Some(lib.get("inter.radius").unwrap())),
            ManParm::new("roll_rate", PI, "rad/s", Some(lib.get("inter.roll_rate").unwrap())),
        ]),
        vec![
            loop_("e1", "speed", "loop_radius", 2.0 * PI, 0.0),
            roll("e2", "speed", "roll_rate", PI),
            loop_("e3", "speed", "loop_radius", -2.0 * PI, 0.0),
            roll("e4", "speed", "roll_rate", PI),
        ],
        JudgingBox::triangular(),
    )
    .unwrap()
}

/// Pull to vertical, stall turn, push back to level.
pub fn stall_turn() -> ManDef {
    let lib = CriteriaLibrary::default();
    ManDef::new(
        ManInfo::new("Stall Turn", "stall", 2.0, Position::End, upright(Height::Btm), upright(Height::Btm)),
        ManParms::new(vec![
            ManParm::new("speed", 30.0, "m/s", Some(lib.get("inter.speed").unwrap())),
            ManParm::new("loop_radius", 40.0, "m", Some(lib.get("inter.radius").unwrap())),
            ManParm::new("line_length", 80.0, "m", Some(lib.get("inter.length").unwrap())),
        ]),
        vec![
            loop_("e1", "speed", "loop_radius", PI / 2.0, 0.0),
            line("e2", "speed", "line_length"),
            stallturn("e3", 0.0, PI),
            line("e4", "speed", "line_length"),
            loop_("e5", "speed", "loop_radius", PI / 2.0, 0.0),
        ],
        JudgingBox::triangular(),
    )
    .unwrap()
}

pub fn schedule() -> SchedDef {
    SchedDef::new("test", vec![loops().into(), stall_turn().into()])
}

pub fn itrans(mdef: &ManDef) -> Transform {
    mdef.initial_transform(Heading::Right, 150.0)
}

/// A labelled, perfectly flown manoeuvre.
pub fn perfect(mdef: &ManDef) -> State {
    let it = itrans(mdef);
    mdef.fit_box(&it).unwrap().create_template(&it, 25.0).unwrap().1
}

/// `flown` rolled by `by(i)` radians about the body X axis at sample `i`.
pub fn rolled(flown: &State, by: impl Fn(usize) -> f64) -> State {
    State {
        samples: flown
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| Sample {
                att: s.att * euler(by(i), 0.0, 0.0),
                ..*s
            })
            .collect(),
        labels: flown.labels.clone(),
    }
}

/// `flown` moved by `offset` metres.
pub fn shifted(flown: &State, offset: Vec3) -> State {
    flown.transformed(&Transform::new(offset, Quat::identity()))
}
