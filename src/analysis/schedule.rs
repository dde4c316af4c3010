//! Scores every manoeuvre of a schedule in parallel. A manoeuvre that
//! fails is reported and counts zero, the rest of the schedule still
//! scores.

use super::manoeuvre::{flown_heading, select_option, Analysis, Basic, Scored};
use crate::config::Config;
use crate::criteria::library::CriteriaLibrary;
use crate::definition::{Heading, ManDefOrOption, SchedDef};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::error::{FsResult, ScoreError};
use crate::scoring::ManoeuvreResults;
use crate::state::State;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ManoeuvreOutcome {
    Scored {
        name: String,
        k: f64,
        option: usize,
        results: ManoeuvreResults,
        score: f64,
    },
    Failed {
        name: String,
        k: f64,
        error: String,
    },
}

impl ManoeuvreOutcome {
    pub fn name(&self) -> &str {
        match self {
            ManoeuvreOutcome::Scored { name, .. } | ManoeuvreOutcome::Failed { name, .. } => name,
        }
    }

    pub fn k(&self) -> f64 {
        match self {
            ManoeuvreOutcome::Scored { k, .. } | ManoeuvreOutcome::Failed { k, .. } => *k,
        }
    }

    /// Points before the k factor, zero when the manoeuvre failed.
    pub fn score(&self) -> f64 {
        match self {
            ManoeuvreOutcome::Scored { score, .. } => *score,
            ManoeuvreOutcome::Failed { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResults {
    pub manoeuvres: Vec<ManoeuvreOutcome>,
    pub total: f64,
}

impl ScheduleResults {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> FsResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn failed(&self) -> usize {
        self.manoeuvres
            .iter()
            .filter(|m| matches!(m, ManoeuvreOutcome::Failed { .. }))
            .count()
    }
}

/// Flight data on disk: either one state per manoeuvre, in schedule order,
/// or one state whose labels are the manoeuvre short names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlightData {
    Manoeuvres(Vec<State>),
    Whole(State),
}

impl FlightData {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// One unlabelled or element labelled state per manoeuvre of `sched`.
    /// Manoeuvres without data get an empty state.
    pub fn into_manoeuvres(self, sched: &SchedDef) -> Vec<State> {
        match self {
            FlightData::Manoeuvres(states) => states,
            FlightData::Whole(flight) => sched
                .manoeuvres
                .iter()
                .map(|m| {
                    flight
                        .segment(m.uid())
                        .map(State::remove_labels)
                        .unwrap_or_default()
                })
                .collect(),
        }
    }
}

/// Runs every option worth trying and keeps the one with the fewest
/// downgrades. Options that fail are skipped.
fn best_option(
    id: usize,
    mdo: &ManDefOrOption,
    flown: State,
    entry: Option<Heading>,
    config: &Config,
    lib: &CriteriaLibrary,
    sink: &dyn DiagnosticSink,
) -> FsResult<(usize, Scored)> {
    let candidates = select_option(mdo, &flown, entry, config)?;
    let p = &config.scoring;
    let mut best: Option<(usize, Scored)> = None;
    let mut last_error = None;
    for i in candidates {
        let mdef = mdo.options()[i].clone();
        let run = Basic::new(id, mdef, flown.clone())
            .and_then(|b| Analysis::Basic(b.entering(entry)).run(config, lib, sink));
        match run {
            Ok(scored) => {
                let dg = scored.scores.downgrade(p.difficulty, p.truncate);
                debug!(manoeuvre = %mdo.uid(), option = i, downgrade = dg, "option scored");
                let better = best
                    .as_ref()
                    .map(|(_, b)| dg < b.scores.downgrade(p.difficulty, p.truncate))
                    .unwrap_or(true);
                if better {
                    best = Some((i, scored));
                }
            }
            Err(e) => {
                debug!(manoeuvre = %mdo.uid(), option = i, "option failed: {}", e);
                last_error = Some(e);
            }
        }
    }
    best.ok_or_else(|| {
        last_error.unwrap_or_else(|| ScoreError::Alignment(format!("no option of {} to score", mdo.uid())))
    })
}

fn score_one(
    id: usize,
    mdo: &ManDefOrOption,
    flown: State,
    entry: Option<Heading>,
    config: &Config,
    lib: &CriteriaLibrary,
    sink: &dyn DiagnosticSink,
) -> ManoeuvreOutcome {
    let name = mdo.uid().to_string();
    let k = mdo.k();
    match best_option(id, mdo, flown, entry, config, lib, sink) {
        Ok((option, scored)) => ManoeuvreOutcome::Scored {
            name,
            k,
            option,
            score: scored.score,
            results: scored.scores,
        },
        Err(e) => {
            warn!(manoeuvre = %name, "manoeuvre not scored: {}", e);
            sink.emit(DiagnosticEvent::ManoeuvreFailed {
                manoeuvre: name.clone(),
                error: e.to_string(),
            });
            ManoeuvreOutcome::Failed {
                name,
                k,
                error: e.to_string(),
            }
        }
    }
}

/// Entry heading of each manoeuvre, chained from the exit of the one
/// before. The first manoeuvre, and any that follows one whose template
/// cannot be built, keeps the heading inferred from its own flight.
pub fn entry_headings(sched: &SchedDef, flights: &[State]) -> Vec<Option<Heading>> {
    let mut out = Vec::with_capacity(sched.len());
    let mut previous_exit: Option<Heading> = None;
    for (i, mdo) in sched.manoeuvres.iter().enumerate() {
        out.push(previous_exit);
        let entry = previous_exit.or_else(|| flights.get(i).and_then(flown_heading));
        previous_exit = entry.and_then(|h| match mdo.primary().exit_heading(h) {
            Ok(exit) => Some(exit),
            Err(e) => {
                debug!(manoeuvre = %mdo.uid(), "exit heading unknown: {}", e);
                None
            }
        });
    }
    out
}

/// Scores `flights[i]` against `sched.manoeuvres[i]`. Missing flights are
/// reported as failed manoeuvres.
pub fn score_schedule(
    sched: &SchedDef,
    flights: Vec<State>,
    config: &Config,
    lib: &CriteriaLibrary,
    sink: &dyn DiagnosticSink,
) -> ScheduleResults {
    info!(schedule = %sched.name, manoeuvres = sched.len(), "scoring schedule");
    let headings = entry_headings(sched, &flights);
    let mut flights = flights.into_iter();
    let inputs: Vec<(usize, ManDefOrOption, State, Option<Heading>)> = sched
        .manoeuvres
        .iter()
        .cloned()
        .zip(headings)
        .enumerate()
        .map(|(i, (m, h))| (i, m, flights.next().unwrap_or_default(), h))
        .collect();

    let manoeuvres: Vec<ManoeuvreOutcome> = inputs
        .into_par_iter()
        .map(|(id, mdo, flown, entry)| score_one(id, &mdo, flown, entry, config, lib, sink))
        .collect();

    let total = manoeuvres.iter().map(|m| m.k() * m.score()).sum();
    info!(schedule = %sched.name, total, "schedule scored");
    sink.emit(DiagnosticEvent::ScheduleScored { total });
    ScheduleResults { manoeuvres, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::builders::{line, loop_};
    use crate::definition::{
        BoxLocation, Direction, Heading, Height, ManDef, ManInfo, ManParm, ManParms, Orientation,
        Position,
    };
    use crate::diagnostics::NullSink;
    use crate::scoring::JudgingBox;
    use std::f64::consts::PI;

    fn mdef(name: &str, k: f64) -> ManDef {
        let loc = BoxLocation::new(Height::Btm, Direction::Upwind, Orientation::Upright);
        ManDef::new(
            ManInfo::new(name, name, k, Position::Centre, loc, loc),
            ManParms::new(vec![
                ManParm::new("speed", 30.0, "m/s", None),
                ManParm::new("loop_radius", 55.0, "m", None),
            ]),
            vec![
                loop_("e1", "speed", "loop_radius", 2.0 * PI, 0.0),
                line("e2", "speed", 30.0),
            ],
            JudgingBox::triangular(),
        )
        .unwrap()
    }

    fn flight(md: &ManDef) -> State {
        let itrans = md.initial_transform(Heading::Right, 150.0);
        md.fit_box(&itrans)
            .unwrap()
            .create_template(&itrans, 25.0)
            .unwrap()
            .1
    }

    #[test]
    fn failures_are_isolated() {
        let a = mdef("a", 2.0);
        let b = mdef("b", 3.0);
        let sched = SchedDef::new("test", vec![a.clone().into(), b.into()]);
        let res = score_schedule(
            &sched,
            vec![flight(&a)],
            &Config::default(),
            &CriteriaLibrary::default(),
            &NullSink,
        );
        assert_eq!(res.manoeuvres.len(), 2);
        assert_eq!(res.manoeuvres[0].name(), "a");
        assert!(matches!(res.manoeuvres[0], ManoeuvreOutcome::Scored { .. }));
        assert!(matches!(res.manoeuvres[1], ManoeuvreOutcome::Failed { .. }));
        assert_eq!(res.failed(), 1);
        assert!((res.total - 2.0 * res.manoeuvres[0].score()).abs() < 1e-9);
    }

    #[test]
    fn whole_flight_splits_by_manoeuvre() {
        let a = mdef("a", 2.0);
        let b = mdef("b", 3.0);
        let sched = SchedDef::new("test", vec![a.clone().into(), b.clone().into()]);
        let whole = State::stack(&[
            ("a".to_string(), flight(&a)),
            ("b".to_string(), flight(&b)),
        ]);
        let parts = FlightData::Whole(whole).into_manoeuvres(&sched);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| !p.is_empty() && !p.is_labelled()));
    }
}
