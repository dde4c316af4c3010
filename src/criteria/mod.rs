pub mod exponential;
pub mod library;

pub use self::exponential::Exponential;

use crate::util::argmax;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The errors found in a sample, the downgrade for each, and the sample
/// index each downgrade is attributed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaOutput {
    pub errors: Vec<f64>,
    pub dgs: Vec<f64>,
    pub keys: Vec<usize>,
}

impl CriteriaOutput {
    pub fn total(&self) -> f64 {
        self.dgs.iter().sum()
    }
}

/// How a sample is reduced to errors before the lookup curve is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display, EnumIter)]
#[serde(tag = "kind")]
pub enum CriteriaKind {
    /// every sample, by its absolute value
    Single,
    /// every sample, by its distance above `limit`
    Limit { limit: f64 },
    /// every sample, by its distance below `limit`
    Threshold { limit: f64 },
    /// the largest value above `limit`
    Peak { limit: f64 },
    /// the smallest value below `limit`
    Trough { limit: f64 },
    AbsPeak { limit: f64 },
    AbsTrough { limit: f64 },
    /// each increase of the absolute value
    Continuous,
    /// each change between extremes
    ContinuousValue,
    /// each excursion outside `[min, max]`
    Bounded { min: Option<f64>, max: Option<f64> },
    /// ratio between consecutive values
    Comparison,
    /// standard deviation over mean
    Deviation,
    /// mean absolute value
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub name: String,
    pub lookup: Exponential,
    #[serde(flatten)]
    pub kind: CriteriaKind,
}

impl Criteria {
    pub fn new(name: &str, lookup: Exponential, kind: CriteriaKind) -> Self {
        Self {
            name: name.to_string(),
            lookup,
            kind,
        }
    }

    pub fn single(name: &str, lookup: Exponential) -> Self {
        Self::new(name, lookup, CriteriaKind::Single)
    }

    pub fn continuous(name: &str, lookup: Exponential) -> Self {
        Self::new(name, lookup, CriteriaKind::Continuous)
    }

    pub fn continuous_value(name: &str, lookup: Exponential) -> Self {
        Self::new(name, lookup, CriteriaKind::ContinuousValue)
    }

    pub fn comparison(name: &str, lookup: Exponential) -> Self {
        Self::new(name, lookup, CriteriaKind::Comparison)
    }

    pub fn bounded(name: &str, lookup: Exponential, min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(name, lookup, CriteriaKind::Bounded { min, max })
    }

    pub fn with_lookup(&self, lookup: Exponential) -> Self {
        Self {
            lookup,
            ..self.clone()
        }
    }

    /// Maps raw measured values onto the quantity the criteria scores.
    pub fn prepare(&self, vs: &[f64]) -> Vec<f64> {
        use CriteriaKind::*;
        match self.kind {
            Limit { limit } | AbsPeak { limit } => {
                vs.iter().map(|v| (v.abs() - limit).max(0.0)).collect()
            }
            Threshold { limit } | AbsTrough { limit } => {
                vs.iter().map(|v| (limit - v.abs()).max(0.0)).collect()
            }
            Peak { limit } => vs.iter().map(|v| (v - limit).max(0.0)).collect(),
            Trough { limit } => vs.iter().map(|v| (limit - v).max(0.0)).collect(),
            Bounded { min, max } => vs
                .iter()
                .map(|&v| match (min, max) {
                    (_, Some(hi)) if v > hi => v - hi,
                    (Some(lo), _) if v < lo => lo - v,
                    _ => 0.0,
                })
                .collect(),
            Single | Continuous | ContinuousValue | Comparison | Deviation | Total => vs.to_vec(),
        }
    }

    pub fn uses_deviation_visibility(&self) -> bool {
        matches!(self.kind, CriteriaKind::ContinuousValue)
    }

    /// Scores an already prepared sample.
    pub fn evaluate(&self, sample: &[f64], limits: bool) -> CriteriaOutput {
        use CriteriaKind::*;
        let (errors, keys) = match self.kind {
            Single | Limit { .. } | Threshold { .. } => (
                sample.iter().map(|v| v.abs()).collect(),
                (0..sample.len()).collect(),
            ),
            Peak { .. } | Trough { .. } | AbsPeak { .. } | AbsTrough { .. } => {
                match argmax(sample) {
                    Some(i) if sample[i] > 0.0 => (vec![sample[i]], vec![i]),
                    _ => (vec![], vec![]),
                }
            }
            Continuous => continuous_errors(sample, false),
            ContinuousValue => continuous_errors(sample, true),
            Bounded { .. } => excursions(sample),
            Comparison => comparison_errors(sample),
            Deviation => deviation_error(sample),
            Total => {
                if sample.is_empty() {
                    (vec![], vec![])
                } else {
                    let m = sample.iter().map(|v| v.abs()).sum::<f64>() / sample.len() as f64;
                    (vec![m], vec![0])
                }
            }
        };
        let dgs = self.lookup.lookup_all(&errors, limits);
        CriteriaOutput { errors, dgs, keys }
    }

    pub fn describe(&self, unit: &str) -> String {
        let deg = |v: f64| {
            if unit == "rad" {
                format!("{:.1}°", v.to_degrees())
            } else {
                format!("{:.2} {}", v, unit)
            }
        };
        let base = format!(
            "{} ({}): {:.3}·x^{:.2}",
            self.name, self.kind, self.lookup.factor, self.lookup.exponent
        );
        match self.kind {
            CriteriaKind::Limit { limit } | CriteriaKind::Peak { limit } => {
                format!("{}, above {}", base, deg(limit))
            }
            CriteriaKind::Threshold { limit } | CriteriaKind::Trough { limit } => {
                format!("{}, below {}", base, deg(limit))
            }
            _ => base,
        }
    }
}

/// Splits a sequence into maximal monotonic runs. Flat steps extend the
/// current run. Returns `(start, end, rising)` for every run.
pub fn monotone_runs(vs: &[f64]) -> Vec<(usize, usize, bool)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut dir = 0i8;
    for i in 1..vs.len() {
        let d = if vs[i] > vs[i - 1] {
            1
        } else if vs[i] < vs[i - 1] {
            -1
        } else {
            0
        };
        if d == 0 {
            continue;
        }
        if dir == 0 {
            dir = d;
        } else if d != dir {
            // the run ends at the last sample before the turn
            runs.push((start, i - 1, dir > 0));
            start = i - 1;
            dir = d;
        }
    }
    if dir != 0 {
        runs.push((start, vs.len() - 1, dir > 0));
    }
    runs
}

fn continuous_errors(sample: &[f64], all_changes: bool) -> (Vec<f64>, Vec<usize>) {
    if sample.len() <= 1 {
        return (vec![], vec![]);
    }
    let vs: Vec<f64> = sample.iter().map(|v| v.abs()).collect();
    monotone_runs(&vs)
        .into_iter()
        .filter(|(_, _, rising)| all_changes || *rising)
        .map(|(a, b, _)| (vs[b] - vs[a], b))
        .unzip()
}

fn excursions(sample: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut errors = Vec::new();
    let mut keys = Vec::new();
    let mut current: Option<(f64, usize)> = None;
    for (i, &v) in sample.iter().enumerate() {
        let v = v.abs();
        if v > 0.0 {
            current = match current {
                Some((m, k)) if m >= v => Some((m, k)),
                _ => Some((v, i)),
            };
        } else if let Some((m, k)) = current.take() {
            errors.push(m);
            keys.push(k);
        }
    }
    if let Some((m, k)) = current {
        errors.push(m);
        keys.push(k);
    }
    (errors, keys)
}

fn comparison_errors(sample: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let vs: Vec<f64> = sample.iter().map(|v| v.abs()).collect();
    let mut errors = Vec::with_capacity(vs.len());
    for i in 0..vs.len() {
        if i == 0 {
            errors.push(0.0);
            continue;
        }
        let nom = vs[i].max(vs[i - 1]);
        let denom = vs[i].min(vs[i - 1]).max(nom / 10.0);
        errors.push(if denom > 0.0 { nom / denom - 1.0 } else { 0.0 });
    }
    let keys = (0..errors.len()).collect();
    (errors, keys)
}

fn deviation_error(sample: &[f64]) -> (Vec<f64>, Vec<usize>) {
    if sample.len() < 2 {
        return (vec![], vec![]);
    }
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    if mean.abs() < 1e-12 {
        return (vec![], vec![]);
    }
    let var = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (vec![(var.sqrt() / mean).abs()], vec![0])
}
