//! Which downgrades an element is judged on.
//!
//! Every element kind is matched explicitly so a new kind cannot be added
//! without deciding how it is judged.

use super::downgrade::{DownGrade, DownGrades};
use super::measurement::Measure;
use super::selectors::Selector;
use super::smoothing::Smoother;
use crate::criteria::library::CriteriaLibrary;
use crate::elements::{check_tags, Element, ElementKind, ElementTag};
use crate::error::FsResult;
use std::collections::BTreeSet;
use std::f64::consts::PI;

/// Speed below which the aircraft is treated as stalled.
const SLOWDOWN: f64 = 13.0;

fn lowpass(cutoff: f64, order: f64) -> Smoother {
    Smoother::Lowpass { cutoff, order }
}

struct Builder<'a> {
    lib: &'a CriteriaLibrary,
    dgs: DownGrades,
}

impl<'a> Builder<'a> {
    fn add(
        &mut self,
        name: &str,
        measure: Measure,
        criteria: &str,
        selectors: &[Selector],
        smoothers: &[Smoother],
    ) -> FsResult<()> {
        let mut dg = DownGrade::new(name, measure, self.lib.get(criteria)?);
        dg.selectors = selectors.to_vec();
        dg.smoothers = smoothers.to_vec();
        self.dgs.push(dg);
        Ok(())
    }
}

/// The downgrades for `el`, given its tags and the element before it.
pub fn element_downgrades(
    el: &Element,
    prev: Option<&Element>,
    tags: &BTreeSet<ElementTag>,
    lib: &CriteriaLibrary,
) -> FsResult<DownGrades> {
    let mut b = Builder {
        lib,
        dgs: DownGrades::default(),
    };
    match el {
        Element::Line(_) => {
            rolls(&mut b, tags)?;
            line_tracks(&mut b, tags)?;
            speed(&mut b, tags)?;
        }
        Element::Loop(_) => {
            b.add(
                "roundness",
                Measure::Radius,
                "intra.loopshape",
                &[],
                &[Smoother::CurvatureLowpass { cut: 4.0, order: 5.0 }],
            )?;
            b.add(
                "smoothness",
                Measure::Curvature,
                "intra.loopsmoothness",
                &[Selector::Middle { fraction: 0.25 }],
                &[lowpass(0.75, 3.0)],
            )?;
            b.add(
                "track_axial",
                Measure::LoopAxialTrack,
                "intra.track",
                &[],
                &[lowpass(2.0, 5.0)],
            )?;
            b.add(
                "end_track",
                Measure::LoopRadialTrack,
                "intra.end_track",
                &[Selector::Last],
                &[],
            )?;
            rolls(&mut b, tags)?;
            speed(&mut b, tags)?;
        }
        Element::StallTurn(_) => {
            b.add("width", Measure::PivotWidth, "intra.stallturn_width", &[], &[])?;
            b.add(
                "speed",
                Measure::Speed,
                "intra.stallturn_speed",
                &[Selector::FirstAndLast],
                &[],
            )?;
            b.add("roll", Measure::RollAngleZ, "intra.roll", &[], &[])?;
            b.add(
                "end_yaw",
                Measure::YawAttitude,
                "intra.end_track",
                &[Selector::Last],
                &[],
            )?;
            b.add(
                "direction",
                Measure::ReverseYaw,
                "intra.stallturn_direction",
                &[],
                &[],
            )?;
        }
        Element::Spin(_) => {
            b.add(
                "turns",
                Measure::RollAngleY,
                "intra.end_roll",
                &[Selector::Last],
                &[],
            )?;
            b.add(
                "alpha",
                Measure::AutorotationAlpha,
                "intra.autorotation_alpha",
                &[Selector::BeforeRecovery { rot: PI / 4.0 }],
                &[],
            )?;
            b.add(
                "drop_pitch_rate",
                Measure::PitchRate,
                "intra.drop_pitch_rate",
                &[Selector::AutorotBreak {
                    rot: 15f64.to_radians(),
                }],
                &[],
            )?;
            b.add(
                "exit_y_track",
                Measure::TrackY,
                "intra.end_track",
                &[Selector::Last],
                &[],
            )?;
            b.add(
                "recovery_rate_delta",
                Measure::RollRateDelta,
                "intra.recovery_roll_rate",
                &[Selector::AutorotRecovery { rot: PI / 24.0 }],
                &[],
            )?;
        }
        Element::Snap(_) => {
            b.add(
                "turns",
                Measure::RollAngleY,
                "intra.end_roll",
                &[Selector::Last],
                &[],
            )?;
            b.add(
                "recovery_rate_delta",
                Measure::RollRateDelta,
                "intra.recovery_roll_rate",
                &[Selector::AutorotRecovery { rot: PI / 4.0 }],
                &[],
            )?;
            b.add(
                "alpha",
                Measure::AutorotationAlpha,
                "intra.autorotation_alpha",
                &[Selector::Autorotation {
                    brot: PI / 4.0,
                    rrot: PI / 2.0,
                }],
                &[],
            )?;
            // consecutive snaps share one break
            if prev.map(|p| p.kind()) != Some(ElementKind::Snap) {
                b.add(
                    "peak_break_pitch_rate",
                    Measure::PitchRate,
                    "intra.peak_break_pitch_rate",
                    &[Selector::AutorotBreak { rot: PI / 4.0 }, Selector::Maximum],
                    &[],
                )?;
                b.add(
                    "break_pitch_rate",
                    Measure::PitchRate,
                    "intra.break_pitch_rate",
                    &[Selector::AutorotBreak { rot: PI / 4.0 }],
                    &[],
                )?;
            }
        }
    }
    Ok(b.dgs)
}

fn rolls(b: &mut Builder, tags: &BTreeSet<ElementTag>) -> FsResult<()> {
    if check_tags(tags, "roll") {
        b.add("end_roll", Measure::RollAngle, "intra.end_roll", &[Selector::Last], &[])?;
        b.add(
            "roll_rate",
            Measure::RollRate,
            "intra.rollrate",
            &[],
            &[Smoother::RollrateLowpass { order: 5.0 }],
        )?;
        b.add(
            "roll_smoothness",
            Measure::AbsRollRate,
            "intra.rollsmoothness",
            &[],
            &[lowpass(2.0, 5.0)],
        )?;
    } else {
        b.add("roll", Measure::RollAngle, "intra.roll", &[], &[lowpass(1.0, 5.0)])?;
        b.add(
            "roll_gradient",
            Measure::RollAngleGradient,
            "intra.roll_gradient",
            &[Selector::Middle { fraction: 0.2 }],
            &[lowpass(1.5, 5.0)],
        )?;
    }
    Ok(())
}

fn line_tracks(b: &mut Builder, tags: &BTreeSet<ElementTag>) -> FsResult<()> {
    let tracks = [("y", Measure::TrackY), ("z", Measure::TrackZ)];
    if check_tags(tags, "vertical,pre_stall_turn") {
        for (axis, m) in tracks {
            b.add(
                &format!("track_{}", axis),
                m,
                "intra.track",
                &[Selector::BeforeSlowdown { sp: SLOWDOWN }],
                &[lowpass(4.0, 5.0)],
            )?;
        }
        for (name, m) in [("pitch", Measure::PitchAttitude), ("yaw", Measure::YawAttitude)] {
            b.add(
                &format!("{}_attitude", name),
                m,
                "intra.track",
                &[Selector::AfterSlowdown { sp: SLOWDOWN }],
                &[],
            )?;
        }
    } else if check_tags(tags, "vertical,post_stall_turn") || check_tags(tags, "vertical,post_spin") {
        for (axis, m) in tracks {
            b.add(
                &format!("initial_track_{}", axis),
                m,
                "intra.end_track",
                &[Selector::AfterSpeedup { sp: SLOWDOWN }, Selector::First],
                &[],
            )?;
            b.add(
                &format!("track_{}", axis),
                m,
                "intra.track",
                &[Selector::AfterSpeedup { sp: SLOWDOWN }],
                &[],
            )?;
        }
    } else if check_tags(tags, "pre_spin") {
        for (axis, m) in tracks {
            b.add(
                &format!("track_{}", axis),
                m,
                "intra.track",
                &[Selector::BeforeSlowdown { sp: SLOWDOWN }],
                &[lowpass(2.0, 5.0)],
            )?;
        }
        b.add(
            "yaw_attitude",
            Measure::YawAttitude,
            "intra.track",
            &[Selector::AfterSlowdown { sp: SLOWDOWN }],
            &[],
        )?;
    } else if check_tags(tags, "entry_line") {
        for (axis, m) in tracks {
            b.add(
                &format!("end_track_{}", axis),
                m,
                "intra.end_track",
                &[Selector::Last],
                &[],
            )?;
        }
    } else {
        for (axis, m) in tracks {
            b.add(
                &format!("track_{}", axis),
                m,
                "intra.track",
                &[],
                &[lowpass(2.0, 5.0)],
            )?;
        }
    }
    Ok(())
}

fn speed(b: &mut Builder, tags: &BTreeSet<ElementTag>) -> FsResult<()> {
    if check_tags(tags, "!entry_line,!pre_stall_turn,!pre_spin") {
        b.add("speed", Measure::Speed, "intra.speed", &[], &[lowpass(0.5, 5.0)])?;
    }
    Ok(())
}
