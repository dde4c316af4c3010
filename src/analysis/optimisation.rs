//! Local search over element boundaries.
//!
//! Each boundary is moved a sample at a time while the intra downgrades of
//! the two elements either side of it, plus the inter downgrades of the
//! manoeuvre, keep falling.

use crate::config::Config;
use crate::criteria::library::CriteriaLibrary;
use crate::definition::{ManDef, Manoeuvre};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::elements::{Element, ElementTag, TimeBase};
use crate::error::{FsResult, ScoreError};
use crate::geometry::Transform;
use crate::scoring::element_downgrades;
use crate::state::State;
use std::collections::BTreeSet;
use tracing::debug;

/// Everything a trial split needs that does not change between trials.
pub struct SplitSearch<'a> {
    pub mdef: &'a ManDef,
    pub manoeuvre: &'a Manoeuvre,
    pub itrans: Transform,
    pub tags: &'a [BTreeSet<ElementTag>],
    pub lib: &'a CriteriaLibrary,
    pub config: &'a Config,
}

struct Trial {
    steps: i64,
    cost: f64,
    flown: State,
}

impl<'a> SplitSearch<'a> {
    /// Entry transform of every element when the whole manoeuvre is fitted
    /// to `flown`, plus the fitted elements.
    fn chain(&self, flown: &State) -> FsResult<(Vec<Transform>, Vec<Element>)> {
        let (matched, tp) = self.manoeuvre.match_intention(&self.itrans, flown)?;
        let mut entries = Vec::with_capacity(matched.len());
        let mut entry = self.itrans;
        for span in &tp.labels {
            entries.push(entry);
            if let Some(last) = tp.samples.get(span.stop.saturating_sub(1)) {
                entry = last.transform();
            }
        }
        Ok((entries, matched.elements))
    }

    /// Downgrades of elements `k` and `k + 1` refitted to `flown`, plus the
    /// inter downgrades with those two elements replaced.
    fn pair_cost(&self, k: usize, entry: &Transform, matched: &[Element], flown: &State) -> FsResult<f64> {
        let mut elements = matched.to_vec();
        let mut entry = *entry;
        let mut total = 0.0;
        for e in k..=k + 1 {
            let el = self
                .manoeuvre
                .elements
                .get(e)
                .ok_or_else(|| ScoreError::Alignment(format!("no element {}", e)))?;
            let seg = flown.segment(el.uid())?;
            let fitted = el.match_intention(&entry, &seg)?;
            let tp = fitted.create_template(&entry, TimeBase::Flown(&seg))?;
            let prev = e.checked_sub(1).and_then(|p| elements.get(p));
            let tags = self.tags.get(e).cloned().unwrap_or_default();
            let dgs = element_downgrades(&fitted, prev, &tags, self.lib)?;
            total += dgs.apply(&fitted, &seg, &tp, &self.config.scoring)?.total();
            if let Some(last) = tp.last() {
                entry = last.transform();
            }
            elements[e] = fitted;
        }
        let inter = self.mdef.mps.inter_results(
            &Manoeuvre::new(&self.manoeuvre.uid, elements),
            self.config.scoring.apply_limits,
        )?;
        Ok(total + inter.total())
    }

    /// Moves every boundary of `flown` to where the downgrades are lowest.
    /// Stops after `max_passes` passes, on a pass that moved nothing, or
    /// when the iteration ceiling is hit, keeping the best split so far.
    pub fn optimise(&self, flown: State, sink: &dyn DiagnosticSink) -> FsResult<State> {
        let params = &self.config.alignment;
        let names = self.manoeuvre.element_names();
        let mut flown = flown;
        let mut iterations = 0usize;

        for pass in 0..params.max_passes {
            let mut adjusted = 0;
            for k in 0..names.len().saturating_sub(1) {
                if iterations >= params.max_iterations {
                    break;
                }
                let (entries, matched) = self.chain(&flown)?;
                let base = match self.pair_cost(k, &entries[k], &matched, &flown) {
                    Ok(c) => c,
                    Err(e) => {
                        debug!(boundary = %names[k], "unscorable split: {}", e);
                        continue;
                    }
                };
                let mut best = Trial {
                    steps: 0,
                    cost: base,
                    flown: flown.clone(),
                };

                for dir in [1i64, -1] {
                    loop {
                        if iterations >= params.max_iterations {
                            break;
                        }
                        let steps = best.steps + dir;
                        if steps.unsigned_abs() as usize > params.max_split_steps {
                            break;
                        }
                        let Ok(trial) = flown.step_label(&names[k], steps, params.min_element_len) else {
                            break;
                        };
                        iterations += 1;
                        match self.pair_cost(k, &entries[k], &matched, &trial) {
                            Ok(cost) if cost < best.cost - 1e-9 => {
                                best = Trial {
                                    steps,
                                    cost,
                                    flown: trial,
                                };
                            }
                            _ => break,
                        }
                    }
                    if best.steps != 0 {
                        break;
                    }
                }

                if best.steps != 0 {
                    debug!(
                        manoeuvre = %self.manoeuvre.uid,
                        first = %names[k],
                        second = %names[k + 1],
                        steps = best.steps,
                        from = base,
                        to = best.cost,
                        "split moved"
                    );
                    sink.emit(DiagnosticEvent::SplitAdjusted {
                        manoeuvre: self.manoeuvre.uid.clone(),
                        first: names[k].clone(),
                        second: names[k + 1].clone(),
                        steps: best.steps,
                    });
                    flown = best.flown;
                    adjusted += 1;
                }
            }

            sink.emit(DiagnosticEvent::AlignmentPass {
                manoeuvre: self.manoeuvre.uid.clone(),
                pass,
                adjusted,
            });
            if adjusted == 0 || iterations >= params.max_iterations {
                break;
            }
        }
        debug!(manoeuvre = %self.manoeuvre.uid, iterations, "split search finished");
        Ok(flown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::builders::{line, loop_};
    use crate::definition::{BoxLocation, Direction, Heading, Height, ManInfo, ManParm, ManParms, Orientation, Position};
    use crate::diagnostics::ChannelSink;
    use crate::elements::tag_elements;
    use crate::scoring::JudgingBox;
    use std::f64::consts::PI;
    use std::sync::mpsc::channel;

    fn mdef() -> ManDef {
        let loc = BoxLocation::new(Height::Btm, Direction::Upwind, Orientation::Upright);
        ManDef::new(
            ManInfo::new("Loop", "loop", 2.0, Position::Centre, loc, loc),
            ManParms::new(vec![
                ManParm::new("speed", 30.0, "m/s", None),
                ManParm::new("loop_radius", 55.0, "m", None),
            ]),
            vec![
                loop_("e1", "speed", "loop_radius", 2.0 * PI, 0.0),
                line("e2", "speed", 60.0),
            ],
            JudgingBox::triangular(),
        )
        .unwrap()
    }

    fn search<'a>(
        md: &'a ManDef,
        man: &'a Manoeuvre,
        tags: &'a [BTreeSet<ElementTag>],
        lib: &'a CriteriaLibrary,
        config: &'a Config,
    ) -> SplitSearch<'a> {
        SplitSearch {
            mdef: md,
            manoeuvre: man,
            itrans: md.initial_transform(Heading::Right, 150.0),
            tags,
            lib,
            config,
        }
    }

    #[test]
    fn displaced_boundary_moves_back() {
        let md = mdef();
        let man = md.create().unwrap();
        let itrans = md.initial_transform(Heading::Right, 150.0);
        let tp = man.create_template(&itrans, 25.0).unwrap();
        let pieces = man.element_templates(&itrans, 25.0).unwrap();
        let tags = tag_elements(&man.elements, &pieces);
        let lib = CriteriaLibrary::default();
        let config = Config::default();

        let shifted = tp.step_label("e1", -4, 3).unwrap();
        let (tx, rx) = channel();
        let out = search(&md, &man, &tags, &lib, &config)
            .optimise(shifted.clone(), &ChannelSink::new(tx))
            .unwrap();

        let moved = out.span("e1").unwrap().stop as i64 - shifted.span("e1").unwrap().stop as i64;
        assert!(moved > 0, "boundary did not move back");
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, DiagnosticEvent::SplitAdjusted { ref first, .. } if first == "e1")));
    }

    #[test]
    fn iteration_ceiling_keeps_the_input() {
        let md = mdef();
        let man = md.create().unwrap();
        let itrans = md.initial_transform(Heading::Right, 150.0);
        let tp = man.create_template(&itrans, 25.0).unwrap();
        let pieces = man.element_templates(&itrans, 25.0).unwrap();
        let tags = tag_elements(&man.elements, &pieces);
        let lib = CriteriaLibrary::default();
        let mut config = Config::default();
        config.alignment.max_iterations = 0;

        let shifted = tp.step_label("e1", -4, 3).unwrap();
        let out = search(&md, &man, &tags, &lib, &config)
            .optimise(shifted.clone(), &crate::diagnostics::NullSink)
            .unwrap();
        assert_eq!(out.labels, shifted.labels);
    }
}
