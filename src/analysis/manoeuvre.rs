//! The per manoeuvre pipeline. Each stage owns everything the previous one
//! knew, so a partially analysed flight can be cached as JSON and resumed.

use super::alignment::align;
use super::optimisation::SplitSearch;
use crate::config::Config;
use crate::criteria::library::CriteriaLibrary;
use crate::definition::{Heading, ManDef, ManDefOrOption, Manoeuvre};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::elements::tag_elements;
use crate::error::{FsResult, ScoreError};
use crate::geometry::{euler, Transform};
use crate::scoring::{element_downgrades, ElementsResults, ManoeuvreResults};
use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Start pose taken from the first flown sample, levelled onto the nearest
/// box heading.
fn entry_transform(mdef: &ManDef, direction: Heading, flown: &State) -> FsResult<Transform> {
    let first = flown
        .first()
        .ok_or_else(|| ScoreError::Alignment(format!("no flight data for {}", mdef.uid())))?;
    Ok(Transform::new(
        first.pos,
        euler(mdef.info.start.orientation.roll(), 0.0, direction.yaw()),
    ))
}

/// Nearest box heading to the velocity at the first flown sample.
pub fn flown_heading(flown: &State) -> Option<Heading> {
    flown.first().map(|s| {
        let v = s.world_vel();
        Heading::infer(v.y.atan2(v.x))
    })
}

/// Intra downgrades of every element of `man` against its template.
pub fn score_elements(
    man: &Manoeuvre,
    flown: &State,
    template: &State,
    lib: &CriteriaLibrary,
    config: &Config,
) -> FsResult<ElementsResults> {
    man.check_sequence(flown)?;
    man.check_sequence(template)?;
    let pieces = man
        .elements
        .iter()
        .map(|el| template.segment(el.uid()))
        .collect::<FsResult<Vec<_>>>()?;
    let tags = tag_elements(&man.elements, &pieces);

    let mut elements = Vec::with_capacity(man.len());
    for (i, (el, tp)) in man.elements.iter().zip(pieces.iter()).enumerate() {
        let prev = i.checked_sub(1).and_then(|p| man.elements.get(p));
        let fl = flown.segment(el.uid())?;
        let dgs = element_downgrades(el, prev, &tags[i], lib)?;
        elements.push(dgs.apply(el, &fl, tp, &config.scoring)?);
    }
    Ok(ElementsResults { elements })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basic {
    pub id: usize,
    pub direction: Heading,
    pub flown: State,
    pub mdef: ManDef,
}

impl Basic {
    /// The heading is inferred from the velocity at the first sample.
    pub fn new(id: usize, mdef: ManDef, flown: State) -> FsResult<Basic> {
        let direction = flown_heading(&flown)
            .ok_or_else(|| ScoreError::Alignment(format!("no flight data for {}", mdef.uid())))?;
        Ok(Basic {
            id,
            direction,
            flown,
            mdef,
        })
    }

    /// Replaces the inferred heading with one resolved from the schedule.
    pub fn entering(self, heading: Option<Heading>) -> Basic {
        match heading {
            Some(direction) => Basic { direction, ..self },
            None => self,
        }
    }

    pub fn itrans(&self) -> FsResult<Transform> {
        entry_transform(&self.mdef, self.direction, &self.flown)
    }

    /// Fits the entry line to the box and labels the flight, from the
    /// template when it arrived unlabelled.
    pub fn proceed(self, config: &Config) -> FsResult<Aligned> {
        let itrans = self.itrans()?;
        let fitted = self.mdef.fit_box(&itrans)?;
        let manoeuvre = fitted.create()?;

        let (flown, cost) = if self.flown.is_labelled() {
            manoeuvre.check_sequence(&self.flown)?;
            (self.flown.clone(), 0.0)
        } else {
            let tp = manoeuvre.create_template(&itrans, config.scoring.template_freq)?;
            let al = align(&self.flown, &tp, &config.alignment)?;
            (al.flown, al.cost)
        };
        let template = manoeuvre.create_template_like(&itrans, &flown)?;
        Ok(Aligned {
            basic: Basic { flown, ..self },
            fitted,
            manoeuvre,
            template,
            cost,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aligned {
    pub basic: Basic,
    /// the definition with its entry line fitted to the box
    pub fitted: ManDef,
    pub manoeuvre: Manoeuvre,
    pub template: State,
    pub cost: f64,
}

impl Aligned {
    /// Optimises the splits, refits the elements to what was flown and
    /// builds the corrected manoeuvre from the refitted parameters.
    pub fn proceed(
        self,
        config: &Config,
        lib: &CriteriaLibrary,
        sink: &dyn DiagnosticSink,
    ) -> FsResult<Complete> {
        let itrans = self.basic.itrans()?;

        // 1. Boundaries
        let pieces = self
            .manoeuvre
            .element_templates(&itrans, config.scoring.template_freq)?;
        let tags = tag_elements(&self.manoeuvre.elements, &pieces);
        let flown = SplitSearch {
            mdef: &self.fitted,
            manoeuvre: &self.manoeuvre,
            itrans,
            tags: &tags,
            lib,
            config,
        }
        .optimise(self.basic.flown.clone(), sink)?;

        // 2. Intention
        let (intended, _) = self.manoeuvre.match_intention(&itrans, &flown)?;

        // 3. Correction
        let corrected = self
            .fitted
            .update_defaults(&intended)?
            .create()?
            .copy_directions(&intended);
        let corrected_template = corrected.create_template_like(&itrans, &flown)?;
        let template = self.manoeuvre.create_template_like(&itrans, &flown)?;

        Ok(Complete {
            aligned: Aligned {
                template,
                basic: Basic { flown, ..self.basic },
                ..self
            },
            intended,
            corrected,
            corrected_template,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complete {
    pub aligned: Aligned,
    pub intended: Manoeuvre,
    pub corrected: Manoeuvre,
    pub corrected_template: State,
}

impl Complete {
    pub fn proceed(self, config: &Config, lib: &CriteriaLibrary) -> FsResult<Scored> {
        let basic = &self.aligned.basic;
        let limits = config.scoring.apply_limits;
        let scores = ManoeuvreResults {
            inter: self.aligned.fitted.mps.inter_results(&self.intended, limits)?,
            intra: score_elements(
                &self.corrected,
                &basic.flown,
                &self.corrected_template,
                lib,
                config,
            )?,
            positioning: basic
                .mdef
                .judging_box
                .score(&basic.mdef.info, &basic.flown, lib, limits)?,
        };
        let p = &config.scoring;
        let score = scores.score(p.max_score, p.difficulty, p.truncate);
        Ok(Scored {
            complete: self,
            scores,
            score,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    pub complete: Complete,
    pub scores: ManoeuvreResults,
    pub score: f64,
}

impl Scored {
    pub fn basic(&self) -> &Basic {
        &self.complete.aligned.basic
    }
}

/// A manoeuvre analysis at whichever stage it has reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Analysis {
    Basic(Basic),
    Alignment(Aligned),
    Complete(Complete),
    Scored(Scored),
}

impl Analysis {
    pub fn stage(&self) -> &'static str {
        match self {
            Analysis::Basic(_) => "basic",
            Analysis::Alignment(_) => "alignment",
            Analysis::Complete(_) => "complete",
            Analysis::Scored(_) => "scored",
        }
    }

    pub fn basic(&self) -> &Basic {
        match self {
            Analysis::Basic(b) => b,
            Analysis::Alignment(a) => &a.basic,
            Analysis::Complete(c) => &c.aligned.basic,
            Analysis::Scored(s) => s.basic(),
        }
    }

    pub fn uid(&self) -> &str {
        self.basic().mdef.uid()
    }

    /// Advances one stage. A scored analysis is returned unchanged.
    pub fn proceed(
        self,
        config: &Config,
        lib: &CriteriaLibrary,
        sink: &dyn DiagnosticSink,
    ) -> FsResult<Analysis> {
        let next = match self {
            Analysis::Basic(b) => Analysis::Alignment(b.proceed(config)?),
            Analysis::Alignment(a) => Analysis::Complete(a.proceed(config, lib, sink)?),
            Analysis::Complete(c) => Analysis::Scored(c.proceed(config, lib)?),
            scored @ Analysis::Scored(_) => return Ok(scored),
        };
        info!(manoeuvre = %next.uid(), stage = next.stage(), "stage completed");
        sink.emit(DiagnosticEvent::StageCompleted {
            manoeuvre: next.uid().to_string(),
            stage: next.stage().to_string(),
        });
        Ok(next)
    }

    /// Advances through every remaining stage. The first failing stage
    /// aborts the run.
    pub fn run(
        self,
        config: &Config,
        lib: &CriteriaLibrary,
        sink: &dyn DiagnosticSink,
    ) -> FsResult<Scored> {
        let mut current = self;
        loop {
            current = match current {
                Analysis::Scored(s) => return Ok(s),
                other => other.proceed(config, lib, sink)?,
            };
        }
    }

    pub fn to_json(&self) -> FsResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Restores an analysis. With `fallback` set, a stage whose own fields
    /// no longer deserialize is dropped for the stage nested inside it.
    pub fn from_json(value: &Value, fallback: bool) -> FsResult<Analysis> {
        let stage = value
            .get("stage")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        match serde_json::from_value::<Analysis>(value.clone()) {
            Ok(a) => Ok(a),
            Err(e) if fallback => {
                let inner = match stage.as_str() {
                    "scored" => value.get("complete").map(|v| (v, "complete")),
                    "complete" => value.get("aligned").map(|v| (v, "alignment")),
                    "alignment" => value.get("basic").map(|v| (v, "basic")),
                    _ => None,
                };
                let Some((inner, lower)) = inner else {
                    return Err(ScoreError::Stage {
                        stage,
                        reason: e.to_string(),
                    });
                };
                warn!(stage = %stage, fallback = lower, "cannot restore stage: {}", e);
                let mut v = inner.clone();
                match &mut v {
                    Value::Object(map) => {
                        map.insert("stage".to_string(), Value::from(lower));
                    }
                    _ => {
                        return Err(ScoreError::Stage {
                            stage: lower.to_string(),
                            reason: "not an object".to_string(),
                        })
                    }
                }
                Analysis::from_json(&v, true)
            }
            Err(e) => Err(ScoreError::Stage {
                stage,
                reason: e.to_string(),
            }),
        }
    }
}

/// Indices of the options of `mdo` worth scoring, most likely first. A
/// labelled flight keeps the options whose elements match its labels, an
/// unlabelled one orders every option by its alignment cost.
pub fn select_option(
    mdo: &ManDefOrOption,
    flown: &State,
    entry: Option<Heading>,
    config: &Config,
) -> FsResult<Vec<usize>> {
    let options = mdo.options();
    if options.len() == 1 {
        return Ok(vec![0]);
    }

    if flown.is_labelled() {
        let names = flown.element_names();
        let matching: Vec<usize> = options
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                o.create()
                    .map(|m| m.element_names() == names)
                    .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            return Err(ScoreError::Sequence {
                manoeuvre: mdo.uid().to_string(),
                expected: options
                    .first()
                    .and_then(|o| o.create().ok())
                    .map(|m| m.element_names())
                    .unwrap_or_default(),
                actual: names,
            });
        }
        return Ok(matching);
    }

    let mut costs: Vec<(usize, f64)> = Vec::with_capacity(options.len());
    for (i, mdef) in options.iter().enumerate() {
        let aligned = Basic::new(i, mdef.clone(), flown.clone())
            .and_then(|b| b.entering(entry).proceed(config));
        match aligned {
            Ok(a) => costs.push((i, a.cost)),
            Err(e) => debug!(manoeuvre = %mdef.uid(), option = i, "option did not align: {}", e),
        }
    }
    if costs.is_empty() {
        return Err(ScoreError::Alignment(format!(
            "no option of {} could be aligned",
            mdo.uid()
        )));
    }
    costs.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(costs.into_iter().map(|(i, _)| i).collect())
}
