//! Judging volume geometry and positioning downgrades.

use super::results::{Result, Results};
use crate::criteria::library::CriteriaLibrary;
use crate::definition::maninfo::{ManInfo, Position};
use crate::elements::tags::{ENTRY_LINE, EXIT_LINE};
use crate::error::{FsResult, ScoreError};
use crate::geometry::Vec3;
use crate::state::State;
use serde::{Deserialize, Serialize};

/// Box limits as seen from the pilot at the origin. Triangular boxes
/// are angular (radians), rectangular boxes are in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JudgingBox {
    Triangular {
        width: f64,
        height: f64,
        depth: f64,
        distance: f64,
        floor: f64,
    },
    Rectangular {
        width: f64,
        height: f64,
        depth: f64,
        distance: f64,
        floor: f64,
    },
}

impl Default for JudgingBox {
    fn default() -> Self {
        Self::triangular()
    }
}

impl JudgingBox {
    pub fn triangular() -> Self {
        JudgingBox::Triangular {
            width: 120f64.to_radians(),
            height: 60f64.to_radians(),
            depth: 25.0,
            distance: 150.0,
            floor: 15f64.to_radians(),
        }
    }

    pub fn rectangular() -> Self {
        JudgingBox::Rectangular {
            width: 1000.0,
            height: 1000.0,
            depth: 1000.0,
            distance: 200.0,
            floor: 100.0,
        }
    }

    /// Nominal flying distance from the pilot.
    pub fn distance(&self) -> f64 {
        match self {
            JudgingBox::Triangular { distance, .. } | JudgingBox::Rectangular { distance, .. } => {
                *distance
            }
        }
    }

    pub fn depth(&self) -> f64 {
        match self {
            JudgingBox::Triangular { depth, .. } | JudgingBox::Rectangular { depth, .. } => *depth,
        }
    }

    /// Distance from the centre line to either side at depth `y`.
    pub fn half_width(&self, y: f64) -> f64 {
        match self {
            JudgingBox::Triangular { width, .. } => y * (width / 2.0).tan(),
            JudgingBox::Rectangular { width, .. } => width / 2.0,
        }
    }

    pub fn top(&self, y: f64) -> f64 {
        match self {
            JudgingBox::Triangular { height, .. } => y * height.tan(),
            JudgingBox::Rectangular { height, floor, .. } => floor + height,
        }
    }

    pub fn bottom(&self, y: f64) -> f64 {
        match self {
            JudgingBox::Triangular { floor, .. } => y * floor.tan(),
            JudgingBox::Rectangular { floor, .. } => *floor,
        }
    }

    /// Altitude at `fraction` of the way from the floor to the top.
    pub fn height_at(&self, y: f64, fraction: f64) -> f64 {
        let lo = self.bottom(y);
        lo + (self.top(y) - lo) * fraction
    }

    /// Angle above the top of the box, negative inside.
    pub fn top_excess(&self, p: &Vec3) -> f64 {
        let y = p.y.max(1e-6);
        p.z.atan2(y) - self.top(y).atan2(y)
    }

    /// Angle beyond the nearer side of the box, negative inside.
    pub fn side_excess(&self, p: &Vec3) -> f64 {
        let y = p.y.max(1e-6);
        p.x.abs().atan2(y) - self.half_width(y).atan2(y)
    }

    /// Metres behind the back of the box, negative inside.
    pub fn depth_excess(&self, p: &Vec3) -> f64 {
        p.y - (self.distance() + self.depth())
    }

    /// Positioning downgrades for a labelled flight of the manoeuvre.
    pub fn score(
        &self,
        info: &ManInfo,
        flown: &State,
        lib: &CriteriaLibrary,
        limits: bool,
    ) -> FsResult<Results> {
        let mut out = Results::new("positioning");
        let inner = manoeuvre_body(flown);
        if inner.is_empty() {
            return Ok(out);
        }
        let positions = inner.positions();
        let keys: Vec<usize> = (0..positions.len()).collect();

        let tops: Vec<f64> = positions.iter().map(|p| self.top_excess(p)).collect();
        out.push(Result::evaluate(
            "top_box",
            tops.clone(),
            tops.clone(),
            tops,
            keys.clone(),
            lib.get("box.box")?,
            limits,
        ));

        let sides: Vec<f64> = positions.iter().map(|p| self.side_excess(p)).collect();
        out.push(Result::evaluate(
            "side_box",
            sides.clone(),
            sides.clone(),
            sides,
            keys.clone(),
            lib.get("box.box")?,
            limits,
        ));

        // the depth criteria scores values below zero
        let depths: Vec<f64> = positions.iter().map(|p| -self.depth_excess(p)).collect();
        out.push(Result::evaluate(
            "distance",
            depths.clone(),
            depths.clone(),
            depths,
            keys,
            lib.get("box.depth")?,
            limits,
        ));

        let centre = lib.get("box.centre")?;
        for (name, p) in centre_points(info, flown)? {
            let v = vec![p.x.atan2(p.y.max(1e-6))];
            out.push(Result::evaluate(
                &name,
                v.clone(),
                v.clone(),
                v,
                vec![0],
                centre.clone(),
                limits,
            ));
        }
        Ok(out)
    }
}

/// The flight without its entry and exit lines.
fn manoeuvre_body(flown: &State) -> State {
    let spans: Vec<_> = flown
        .labels
        .iter()
        .filter(|s| s.name != ENTRY_LINE && s.name != EXIT_LINE)
        .collect();
    match (spans.first(), spans.last()) {
        (Some(a), Some(b)) => flown.slice(a.start, b.stop),
        _ => flown.clone(),
    }
}

/// Positions that should sit on the box centre line. Indices refer to
/// the manoeuvre's elements with the entry line at 0; point `k` is the
/// start of element `k`, or the end of the last element.
fn centre_points(info: &ManInfo, flown: &State) -> FsResult<Vec<(String, Vec3)>> {
    let mut out = Vec::new();
    for &k in &info.centre_points {
        let sample = match flown.labels.get(k) {
            Some(span) => flown.samples.get(span.start),
            None if k == flown.labels.len() => flown.last(),
            None => None,
        }
        .ok_or_else(|| {
            ScoreError::definition(&info.short_name, format!("centre point {} is out of range", k))
        })?;
        out.push((format!("centre_point_{}", k), sample.pos));
    }

    for &(k, frac) in &info.centred_els {
        let span = flown.labels.get(k).ok_or_else(|| {
            ScoreError::definition(&info.short_name, format!("centred element {} is out of range", k))
        })?;
        let seg = flown.slice(span.start, span.stop);
        let mut travelled = Vec::with_capacity(seg.len());
        let mut acc = 0.0;
        for w in seg.samples.windows(2) {
            travelled.push(acc);
            acc += (w[1].pos - w[0].pos).norm();
        }
        travelled.push(acc);
        let target = acc * frac.clamp(0.0, 1.0);
        let i = travelled
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        if let Some(s) = seg.samples.get(i) {
            out.push((format!("centred_element_{}", k), s.pos));
        }
    }

    if out.is_empty() && info.position == Position::Centre {
        let body = manoeuvre_body(flown);
        let xs: Vec<f64> = body.samples.iter().map(|s| s.pos.x).collect();
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo.is_finite() && hi.is_finite() {
            let mid = (lo + hi) / 2.0;
            let y = body.samples.iter().map(|s| s.pos.y).sum::<f64>() / body.len() as f64;
            out.push(("centred_manoeuvre".to_string(), Vec3::new(mid, y, 0.0)));
        }
    }
    Ok(out)
}
