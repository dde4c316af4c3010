//! A downgrade is a measure, a crop, a filter and a criteria. Applying one
//! to an element gives a single `Result`.

use super::measurement::Measure;
use super::results::{Result, Results};
use super::selectors::{select_all, Selector};
use super::smoothing::Smoother;
use super::visibility::VisibilityKind;
use crate::config::ScoringParams;
use crate::criteria::Criteria;
use crate::elements::Element;
use crate::error::FsResult;
use crate::state::State;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownGrade {
    pub name: String,
    pub measure: Measure,
    #[serde(default)]
    pub selectors: Vec<Selector>,
    #[serde(default)]
    pub smoothers: Vec<Smoother>,
    pub criteria: Criteria,
}

impl DownGrade {
    pub fn new(name: &str, measure: Measure, criteria: Criteria) -> Self {
        Self {
            name: name.to_string(),
            measure,
            selectors: Vec::new(),
            smoothers: Vec::new(),
            criteria,
        }
    }

    pub fn select(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn smooth(mut self, smoother: Smoother) -> Self {
        self.smoothers.push(smoother);
        self
    }

    /// select, measure, weight by visibility, smooth, then score.
    pub fn apply(
        &self,
        el: &Element,
        fl: &State,
        tp: &State,
        params: &ScoringParams,
    ) -> FsResult<Result> {
        let m = self.measure.measure(el, fl, tp)?;
        let keys = select_all(&self.selectors, fl, &m.value);
        let selected = m.select(&keys);

        let raw_sample = match params.visibility() {
            Some(vis) => {
                let kind = if self.criteria.uses_deviation_visibility() {
                    VisibilityKind::Deviation
                } else {
                    VisibilityKind::Value
                };
                vis.apply(
                    &selected.value,
                    &selected.visibility,
                    self.criteria.lookup.error_limit(),
                    kind,
                )
            }
            None => selected.value.clone(),
        };
        let sample = Smoother::apply_all(&self.smoothers, &raw_sample, fl.freq(), el);
        trace!(
            element = el.uid(),
            downgrade = %self.name,
            selected = keys.len(),
            "downgrade sampled"
        );
        Ok(Result::evaluate(
            &self.name,
            m.value,
            raw_sample,
            sample,
            keys,
            self.criteria.clone(),
            params.apply_limits,
        ))
    }
}

/// The downgrades that apply to one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownGrades(pub Vec<DownGrade>);

impl DownGrades {
    pub fn push(&mut self, dg: DownGrade) {
        self.0.push(dg);
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DownGrade> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scores the element, the `Results` is named after it.
    pub fn apply(
        &self,
        el: &Element,
        fl: &State,
        tp: &State,
        params: &ScoringParams,
    ) -> FsResult<Results> {
        let mut results = Results::new(el.uid());
        for dg in &self.0 {
            results.push(dg.apply(el, fl, tp, params)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::library::CriteriaLibrary;
    use crate::elements::{Line, TimeBase};
    use crate::geometry::{euler, Transform, Vec3};
    use crate::state::Sample;
    use std::f64::consts::PI;

    fn line() -> (Element, State) {
        let el = Element::Line(Line::new("e1", 30.0, 90.0, 0.0));
        let tp = el
            .create_template(
                &Transform::new(Vec3::new(-45.0, 150.0, 150.0), euler(PI, 0.0, 0.0)),
                TimeBase::freq(25.0),
            )
            .unwrap();
        (el, tp)
    }

    fn rolled(tp: &State, by: impl Fn(usize) -> f64) -> State {
        State::new(
            tp.samples
                .iter()
                .enumerate()
                .map(|(i, s)| Sample {
                    att: s.att * euler(by(i), 0.0, 0.0),
                    ..*s
                })
                .collect(),
        )
    }

    #[test]
    fn perfect_flight_is_free() {
        let lib = CriteriaLibrary::default();
        let (el, tp) = line();
        let dg = DownGrade::new("roll", Measure::RollAngle, lib.get("intra.roll").unwrap())
            .smooth(Smoother::Lowpass { cutoff: 1.0, order: 5.0 });
        let r = dg.apply(&el, &tp, &tp, &ScoringParams::default()).unwrap();
        assert!(r.total() < 1e-6);
    }

    #[test]
    fn final_roll_error_is_downgraded_once() {
        let lib = CriteriaLibrary::default();
        let (el, tp) = line();
        let fl = rolled(&tp, |_| 30f64.to_radians());
        let dg = DownGrade::new("end_roll", Measure::RollAngle, lib.get("intra.end_roll").unwrap())
            .select(Selector::Last);
        let params = ScoringParams {
            visibility_enabled: false,
            ..ScoringParams::default()
        };
        let r = dg.apply(&el, &fl, &tp, &params).unwrap();
        assert_eq!(r.sample_keys, vec![tp.len() - 1]);
        assert_eq!(r.dgs.len(), 1);
        assert!((r.total() - 1.0).abs() < 1e-6, "{}", r.total());
    }

    #[test]
    fn downgrades_serialise_with_text_selectors() {
        let lib = CriteriaLibrary::default();
        let dg = DownGrade::new("track", Measure::TrackY, lib.get("intra.track").unwrap())
            .select(Selector::BeforeSlowdown { sp: 13.0 })
            .smooth(Smoother::Lowpass { cutoff: 2.0, order: 5.0 });
        let json = serde_json::to_value(&dg).unwrap();
        assert_eq!(json["measure"], "track_y");
        assert_eq!(json["selectors"][0], "before_slowdown(sp:13)");
        let back: DownGrade = serde_json::from_value(json).unwrap();
        assert_eq!(back, dg);
    }
}
