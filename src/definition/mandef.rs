use super::builders;
use super::eldef::ElDef;
use super::expr::{Expr, Scope};
use super::maninfo::{Direction, Heading, ManInfo, Position};
use super::manoeuvre::Manoeuvre;
use super::manparm::ManParms;
use crate::elements::tags::{ENTRY_LINE, EXIT_LINE};
use crate::elements::Element;
use crate::error::{FsResult, ScoreError};
use crate::geometry::{euler, px, Transform, Vec3};
use crate::scoring::judging_box::JudgingBox;
use crate::state::State;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Synthetic lines are this long until the box fit sets the entry line.
pub const DEFAULT_LINE_LENGTH: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ManDefData")]
pub struct ManDef {
    pub info: ManInfo,
    pub mps: ManParms,
    pub eds: Vec<ElDef>,
    #[serde(rename = "box")]
    pub judging_box: JudgingBox,
}

#[derive(Deserialize)]
struct ManDefData {
    info: ManInfo,
    mps: ManParms,
    eds: Vec<ElDef>,
    #[serde(rename = "box", default)]
    judging_box: JudgingBox,
}

impl TryFrom<ManDefData> for ManDef {
    type Error = ScoreError;

    fn try_from(d: ManDefData) -> FsResult<ManDef> {
        ManDef::new(d.info, d.mps, d.eds, d.judging_box)
    }
}

/// Parameter defaults plus the elements built so far.
struct BuildScope<'a> {
    mps: &'a ManParms,
    built: &'a [Element],
}

impl Scope for BuildScope<'_> {
    fn parameter(&self, name: &str) -> FsResult<f64> {
        self.mps.parameter(name)
    }

    fn element(&self, element: &str, parameter: &str) -> FsResult<f64> {
        self.built
            .iter()
            .find(|e| e.uid() == element)
            .ok_or_else(|| {
                ScoreError::Expression(format!(
                    "{}.{} refers to an element not built yet",
                    element, parameter
                ))
            })?
            .get_parameter(parameter)
    }
}

impl ManDef {
    /// Adds the entry and exit lines when missing, checks element names are
    /// unique and wires up the collector graph.
    pub fn new(info: ManInfo, mps: ManParms, eds: Vec<ElDef>, judging_box: JudgingBox) -> FsResult<ManDef> {
        let speed = if mps.index("speed").is_some() {
            Expr::parm("speed")
        } else {
            Expr::lit(30.0)
        };
        let mut eds = eds;
        if eds.first().map(|e| e.name.as_str()) != Some(ENTRY_LINE) {
            eds.insert(0, builders::line(ENTRY_LINE, speed.clone(), DEFAULT_LINE_LENGTH));
        }
        if eds.last().map(|e| e.name.as_str()) != Some(EXIT_LINE) {
            eds.push(builders::line(EXIT_LINE, speed, DEFAULT_LINE_LENGTH));
        }

        let mut seen = HashSet::new();
        for ed in &eds {
            if !seen.insert(ed.name.as_str()) {
                return Err(ScoreError::definition(
                    &info.short_name,
                    format!("element {} is defined twice", ed.name),
                ));
            }
            if ed.args.len() != ed.kind.parameter_names().len() {
                return Err(ScoreError::definition(
                    &info.short_name,
                    format!(
                        "{} has {} arguments, {} needs {}",
                        ed.name,
                        ed.args.len(),
                        ed.kind,
                        ed.kind.parameter_names().len()
                    ),
                ));
            }
        }

        let mut mps = mps;
        mps.graph = Default::default();
        for ed in &eds {
            mps.register(ed)
                .map_err(|e| ScoreError::definition(&info.short_name, e.to_string()))?;
        }

        Ok(ManDef {
            info,
            mps,
            eds,
            judging_box,
        })
    }

    pub fn uid(&self) -> &str {
        &self.info.short_name
    }

    /// The manoeuvre built from the current parameter defaults. Elements
    /// are built in order, so `e1.length` may refer to any earlier element.
    pub fn create(&self) -> FsResult<Manoeuvre> {
        let mut elements: Vec<Element> = Vec::with_capacity(self.eds.len());
        for ed in &self.eds {
            let scope = BuildScope {
                mps: &self.mps,
                built: &elements,
            };
            let el = ed
                .build(&scope)
                .map_err(|e| ScoreError::definition(&self.info.short_name, e.to_string()))?;
            elements.push(el);
        }
        Ok(Manoeuvre::new(&self.info.short_name, elements))
    }

    /// Start pose for a manoeuvre flown on `heading` at `depth` metres from
    /// the pilot.
    pub fn initial_transform(&self, heading: Heading, depth: f64) -> Transform {
        let x = match (self.info.position, heading) {
            (Position::Centre, Heading::Right) => -self.judging_box.half_width(depth),
            (Position::Centre, Heading::Left) => self.judging_box.half_width(depth),
            _ => 0.0,
        };
        let y = match heading {
            Heading::In => 0.0,
            Heading::Out => 2.0 * depth,
            Heading::Left | Heading::Right => depth,
        };
        let z = self
            .judging_box
            .height_at(depth, self.info.start.height.fraction());
        Transform::new(
            Vec3::new(x, y, z),
            euler(self.info.start.orientation.roll(), 0.0, heading.yaw()),
        )
    }

    /// Entry line length that puts the manoeuvre on the box centre, on the
    /// box edge or at the nominal distance, depending on its position.
    pub fn entry_line_length(&self, itrans: &Transform) -> FsResult<f64> {
        let dir = itrans.rotate(&px());
        let heading = Heading::infer(dir.y.atan2(dir.x));

        // the body of the manoeuvre drawn along +X from the origin
        let inner = self.create()?;
        let n = inner.len();
        let body = Manoeuvre::new(
            &self.info.short_name,
            inner.elements[1..n.saturating_sub(1).max(1)].to_vec(),
        );
        let local = Transform::new(
            Vec3::zeros(),
            euler(self.info.start.orientation.roll(), 0.0, 0.0),
        );
        let pieces = body.element_templates(&local, 25.0)?;
        let xs: Vec<f64> = pieces
            .iter()
            .flat_map(|p| p.samples.iter().map(|s| s.pos.x))
            .collect();
        let (lo, hi) = match xs.iter().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(x) => (x.min(0.0), x.max(0.0)),
            MinMaxResult::MinMax(lo, hi) => (lo.min(0.0), hi.max(0.0)),
        };

        let x0 = itrans.translation.x;
        let y0 = itrans.translation.y;

        let length = if self.info.start.direction == Direction::Cross
            || matches!(heading, Heading::In | Heading::Out)
        {
            let s = if heading == Heading::Out { -1.0 } else { 1.0 };
            let extent = pieces
                .last()
                .and_then(|p| p.last())
                .map(|l| l.pos.x)
                .unwrap_or(0.0);
            (s * (self.judging_box.distance() - y0) - extent).max(30.0)
        } else {
            let d = heading.x_sign();
            let along = match self.info.position {
                Position::Centre => -d * x0 - self.centre_offset(&pieces, lo, hi),
                Position::End => self.judging_box.half_width(y0) - d * x0 - hi,
            };
            along.max(10.0)
        };
        debug!(
            manoeuvre = %self.info.short_name,
            ?heading,
            x0,
            length,
            "entry line length"
        );
        Ok(length)
    }

    /// Position along the heading, relative to the end of the entry line,
    /// that should sit on the centre line.
    fn centre_offset(&self, pieces: &[State], lo: f64, hi: f64) -> f64 {
        let end_x = |i: usize| pieces.get(i).and_then(|p| p.last()).map(|s| s.pos.x);
        if let Some(&k) = self.info.centre_points.first() {
            // point k starts element k, the entry line is element 0
            return if k <= 1 {
                0.0
            } else {
                end_x(k - 2).unwrap_or((lo + hi) / 2.0)
            };
        }
        if let Some(&(k, frac)) = self.info.centred_els.first() {
            if let Some(p) = k.checked_sub(1).and_then(|i| pieces.get(i)) {
                let i = ((p.len() as f64 * frac) as usize).min(p.len().saturating_sub(1));
                if let Some(s) = p.samples.get(i) {
                    return s.pos.x;
                }
            }
        }
        (lo + hi) / 2.0
    }

    /// A copy whose entry line length fits the box when flown from `itrans`.
    pub fn fit_box(&self, itrans: &Transform) -> FsResult<ManDef> {
        let length = self.entry_line_length(itrans)?;
        let mut eds = self.eds.clone();
        if let Some(entry) = eds.first_mut() {
            entry.set_arg("length", Expr::lit(length))?;
        }
        ManDef::new(self.info.clone(), self.mps.clone(), eds, self.judging_box)
    }

    pub fn create_template(&self, itrans: &Transform, freq: f64) -> FsResult<(Manoeuvre, State)> {
        let man = self.create()?;
        let tp = man.create_template(itrans, freq)?;
        Ok((man, tp))
    }

    /// Box heading of the template's last sample when entered on `heading`.
    pub fn exit_heading(&self, heading: Heading) -> FsResult<Heading> {
        let itrans = self.initial_transform(heading, self.judging_box.distance());
        let (_, tp) = self.create_template(&itrans, 10.0)?;
        let v = tp
            .last()
            .map(|s| s.world_vel())
            .ok_or_else(|| ScoreError::definition(self.uid(), "empty template"))?;
        Ok(Heading::infer(v.y.atan2(v.x)))
    }

    /// A copy whose parameter defaults reflect what was flown in `man`.
    pub fn update_defaults(&self, man: &Manoeuvre) -> FsResult<ManDef> {
        Ok(ManDef {
            mps: self.mps.update_defaults(man)?,
            ..self.clone()
        })
    }
}

/// Geometrically different ways of flying the same manoeuvre. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ManOptionData")]
pub struct ManOption {
    options: Vec<ManDef>,
}

#[derive(Deserialize)]
struct ManOptionData {
    options: Vec<ManDef>,
}

impl TryFrom<ManOptionData> for ManOption {
    type Error = ScoreError;

    fn try_from(d: ManOptionData) -> FsResult<ManOption> {
        ManOption::new(d.options)
    }
}

impl ManOption {
    pub fn new(options: Vec<ManDef>) -> FsResult<ManOption> {
        let first = options
            .first()
            .ok_or_else(|| ScoreError::definition("?", "an option set needs at least one option"))?;
        if let Some(odd) = options.iter().find(|o| o.uid() != first.uid()) {
            return Err(ScoreError::definition(
                first.uid(),
                format!("option {} has a different short name", odd.uid()),
            ));
        }
        Ok(ManOption { options })
    }

    pub fn uid(&self) -> &str {
        self.primary().uid()
    }

    pub fn options(&self) -> &[ManDef] {
        &self.options
    }

    pub fn primary(&self) -> &ManDef {
        &self.options[0]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManDefOrOption {
    Options(ManOption),
    Single(ManDef),
}

impl ManDefOrOption {
    pub fn uid(&self) -> &str {
        match self {
            ManDefOrOption::Single(m) => m.uid(),
            ManDefOrOption::Options(o) => o.uid(),
        }
    }

    /// Every definition that may have been flown, the first one is the default.
    pub fn options(&self) -> &[ManDef] {
        match self {
            ManDefOrOption::Single(m) => std::slice::from_ref(m),
            ManDefOrOption::Options(o) => o.options(),
        }
    }

    pub fn primary(&self) -> &ManDef {
        match self {
            ManDefOrOption::Single(m) => m,
            ManDefOrOption::Options(o) => o.primary(),
        }
    }

    pub fn k(&self) -> f64 {
        self.primary().info.k
    }
}

impl From<ManDef> for ManDefOrOption {
    fn from(m: ManDef) -> Self {
        ManDefOrOption::Single(m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedDef {
    pub name: String,
    pub manoeuvres: Vec<ManDefOrOption>,
}

impl SchedDef {
    pub fn new(name: &str, manoeuvres: Vec<ManDefOrOption>) -> Self {
        Self {
            name: name.to_string(),
            manoeuvres,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> FsResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Option<&ManDefOrOption> {
        self.manoeuvres.iter().find(|m| m.uid() == uid)
    }

    pub fn len(&self) -> usize {
        self.manoeuvres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manoeuvres.is_empty()
    }
}
