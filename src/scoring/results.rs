//! Score trees. Every level's total is the sum of its children; trees are
//! rebuilt rather than edited.

use crate::criteria::Criteria;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps a downgrade through the difficulty curve. Difficulty 3 is the
/// identity, lower difficulties soften small downgrades; every curve
/// passes through (6, 6).
pub fn difficulty_fun(v: f64, difficulty: u8) -> f64 {
    let b = 1.3 - 0.1 * f64::from(difficulty);
    let m = 6.0 / 6.0f64.powf(b);
    m * v.max(0.0).powf(b)
}

/// Rounds down to the nearest half point.
pub fn trunc(v: f64) -> f64 {
    (v * 2.0).floor() / 2.0
}

/// One downgrade applied to one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Result {
    pub name: String,
    /// raw measured values over the whole element
    pub measurement: Vec<f64>,
    /// selected, visibility weighted values
    pub raw_sample: Vec<f64>,
    /// smoothed values the criteria scored
    pub sample: Vec<f64>,
    /// index into `measurement` of every sample value
    pub sample_keys: Vec<usize>,
    pub errors: Vec<f64>,
    pub dgs: Vec<f64>,
    /// index into `sample` of every downgrade
    pub keys: Vec<usize>,
    pub criteria: Criteria,
}

impl Result {
    pub fn evaluate(
        name: &str,
        measurement: Vec<f64>,
        raw_sample: Vec<f64>,
        sample: Vec<f64>,
        sample_keys: Vec<usize>,
        criteria: Criteria,
        limits: bool,
    ) -> Self {
        let out = criteria.evaluate(&criteria.prepare(&sample), limits);
        Self {
            name: name.to_string(),
            measurement,
            raw_sample,
            sample,
            sample_keys,
            errors: out.errors,
            dgs: out.dgs,
            keys: out.keys,
            criteria,
        }
    }

    pub fn total(&self) -> f64 {
        self.dgs.iter().sum()
    }

    pub fn score(&self, difficulty: u8, truncate: bool) -> f64 {
        let v: f64 = self.dgs.iter().map(|d| difficulty_fun(*d, difficulty)).sum();
        if truncate {
            trunc(v)
        } else {
            v
        }
    }

    /// The same sample scored with another criteria.
    pub fn replace_criteria(&self, criteria: Criteria, limits: bool) -> Self {
        Self::evaluate(
            &self.name,
            self.measurement.clone(),
            self.raw_sample.clone(),
            self.sample.clone(),
            self.sample_keys.clone(),
            criteria,
            limits,
        )
    }

    /// Indices into `measurement` where each downgrade was found.
    pub fn measurement_keys(&self) -> Vec<usize> {
        self.keys
            .iter()
            .filter_map(|k| self.sample_keys.get(*k).copied())
            .collect()
    }
}

/// The downgrades of one element, or one group such as `inter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub name: String,
    pub results: Vec<Result>,
}

impl Results {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: Result) {
        self.results.push(result);
    }

    pub fn get(&self, name: &str) -> Option<&Result> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.results.iter().map(|r| r.total()).sum()
    }

    pub fn score(&self, difficulty: u8, truncate: bool) -> f64 {
        self.results.iter().map(|r| r.score(difficulty, truncate)).sum()
    }

    pub fn downgrade_summary(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for r in &self.results {
            *out.entry(r.name.clone()).or_insert(0.0) += r.total();
        }
        out
    }

    pub fn replace_criteria(&self, name: &str, criteria: &Criteria, limits: bool) -> Self {
        Self {
            name: self.name.clone(),
            results: self
                .results
                .iter()
                .map(|r| {
                    if r.name == name {
                        r.replace_criteria(criteria.clone(), limits)
                    } else {
                        r.clone()
                    }
                })
                .collect(),
        }
    }
}

/// One `Results` per element of a manoeuvre.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementsResults {
    pub elements: Vec<Results>,
}

impl ElementsResults {
    pub fn total(&self) -> f64 {
        self.elements.iter().map(|r| r.total()).sum()
    }

    pub fn score(&self, difficulty: u8, truncate: bool) -> f64 {
        self.elements.iter().map(|r| r.score(difficulty, truncate)).sum()
    }

    pub fn get(&self, element: &str) -> Option<&Results> {
        self.elements.iter().find(|r| r.name == element)
    }

    /// Downgrade totals by downgrade name, summed over elements.
    pub fn downgrade_summary(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for el in &self.elements {
            for (k, v) in el.downgrade_summary() {
                *out.entry(k).or_insert(0.0) += v;
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub inter: f64,
    pub intra: f64,
    pub positioning: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManoeuvreResults {
    pub inter: Results,
    pub intra: ElementsResults,
    pub positioning: Results,
}

impl ManoeuvreResults {
    pub fn total(&self) -> f64 {
        self.inter.total() + self.intra.total() + self.positioning.total()
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            inter: self.inter.total(),
            intra: self.intra.total(),
            positioning: self.positioning.total(),
            total: self.total(),
        }
    }

    /// Downgrades after the difficulty curve.
    pub fn downgrade(&self, difficulty: u8, truncate: bool) -> f64 {
        self.inter.score(difficulty, truncate)
            + self.intra.score(difficulty, truncate)
            + self.positioning.score(difficulty, truncate)
    }

    /// Points left from `max_score`, never negative.
    pub fn score(&self, max_score: f64, difficulty: u8, truncate: bool) -> f64 {
        (max_score - self.downgrade(difficulty, truncate)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Exponential;

    fn single(name: &str, sample: Vec<f64>) -> Result {
        let keys = (0..sample.len()).collect();
        Result::evaluate(
            name,
            sample.clone(),
            sample.clone(),
            sample,
            keys,
            Criteria::single(name, Exponential::linear(1.0)),
            true,
        )
    }

    #[test]
    fn difficulty_three_is_identity() {
        for v in [0.0, 0.5, 1.0, 3.0, 6.0] {
            assert!((difficulty_fun(v, 3) - v).abs() < 1e-12);
        }
        assert!((difficulty_fun(6.0, 1) - 6.0).abs() < 1e-12);
        assert!(difficulty_fun(0.5, 1) < 0.5);
    }

    #[test]
    fn totals_sum_children() {
        let mut el = Results::new("e1");
        el.push(single("a", vec![0.5, 1.0]));
        el.push(single("b", vec![0.25]));
        let man = ManoeuvreResults {
            inter: Results::new("inter"),
            intra: ElementsResults { elements: vec![el] },
            positioning: Results::new("positioning"),
        };
        assert!((man.total() - 1.75).abs() < 1e-12);
        assert!((man.score(10.0, 3, false) - 8.25).abs() < 1e-12);
        assert!((man.score(10.0, 3, true) - 8.0).abs() < 1e-12);
        assert!((man.summary().intra - 1.75).abs() < 1e-12);
    }

    #[test]
    fn replace_criteria_rescores() {
        let r = single("a", vec![2.0]);
        let r2 = r.replace_criteria(Criteria::single("a", Exponential::linear(3.0)), true);
        assert_eq!(r2.total(), 6.0);
        assert_eq!(r.total(), 2.0);
    }

    #[test]
    fn trunc_rounds_down_to_half_points() {
        assert_eq!(trunc(1.74), 1.5);
        assert_eq!(trunc(2.0), 2.0);
    }
}
