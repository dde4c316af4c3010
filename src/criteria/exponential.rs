use crate::error::{FsResult, ScoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Lookup curve mapping an error magnitude to a downgrade:
/// `factor * |error|^exponent`, optionally capped at `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exponential {
    pub factor: f64,
    pub exponent: f64,
    #[serde(default)]
    pub limit: Option<f64>,
}

impl Exponential {
    pub fn new(factor: f64, exponent: f64, limit: Option<f64>) -> Self {
        Self {
            factor,
            exponent,
            limit,
        }
    }

    /// Curve passing through (`error`, `downgrade`) with the given exponent,
    /// capped at `downgrade` when `has_limit` is set.
    pub fn simple(exponent: f64, error: f64, downgrade: f64, has_limit: bool) -> Self {
        Self::new(
            downgrade / error.powf(exponent),
            exponent,
            has_limit.then_some(downgrade),
        )
    }

    pub fn linear(factor: f64) -> Self {
        Self::new(factor, 1.0, None)
    }

    /// A curve that never downgrades.
    pub fn free() -> Self {
        Self::new(0.0, 1.0, None)
    }

    /// Least squares fit of `factor * x^exponent` in log space. Exact when
    /// given two points.
    pub fn fit_points(xs: &[f64], ys: &[f64], limit: Option<f64>) -> FsResult<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return Err(ScoreError::Config(format!(
                "fit_points needs at least two matching points, got {} and {}",
                xs.len(),
                ys.len()
            )));
        }
        if xs.iter().chain(ys.iter()).any(|v| *v <= 0.0 || !v.is_finite()) {
            return Err(ScoreError::Config(
                "fit_points requires positive finite calibration points".to_string(),
            ));
        }
        let lx: Vec<f64> = xs.iter().map(|x| x.ln()).collect();
        let ly: Vec<f64> = ys.iter().map(|y| y.ln()).collect();
        let n = lx.len() as f64;
        let mx = lx.iter().sum::<f64>() / n;
        let my = ly.iter().sum::<f64>() / n;
        let sxx: f64 = lx.iter().map(|x| (x - mx).powi(2)).sum();
        if sxx < 1e-12 {
            return Err(ScoreError::Config(
                "fit_points needs at least two distinct errors".to_string(),
            ));
        }
        let sxy: f64 = lx.iter().zip(&ly).map(|(x, y)| (x - mx) * (y - my)).sum();
        let exponent = sxy / sxx;
        let factor = (my - exponent * mx).exp();
        Ok(Self::new(factor, exponent, limit))
    }

    pub fn lookup(&self, error: f64, limits: bool) -> f64 {
        let v = self.factor * error.abs().powf(self.exponent);
        let v = match (limits, self.limit) {
            (true, Some(lim)) => v.min(lim),
            _ => v,
        };
        if v.is_finite() {
            v.max(0.0)
        } else {
            0.0
        }
    }

    pub fn lookup_all(&self, errors: &[f64], limits: bool) -> Vec<f64> {
        errors.iter().map(|e| self.lookup(*e, limits)).collect()
    }

    /// The error at which the curve reaches its limit, 1.0 when uncapped.
    pub fn error_limit(&self) -> f64 {
        match self.limit {
            Some(lim) if self.factor != 0.0 && self.exponent != 0.0 => {
                (lim / self.factor).powf(1.0 / self.exponent)
            }
            _ => 1.0,
        }
    }

    pub fn approx_eq(&self, other: &Exponential, tol: f64) -> bool {
        (self.factor - other.factor).abs() <= tol
            && (self.exponent - other.exponent).abs() <= tol
            && match (self.limit, other.limit) {
                (None, None) => true,
                (Some(a), Some(b)) => (a - b).abs() <= tol,
                _ => false,
            }
    }
}

#[derive(Debug, serde::Deserialize)]
struct LookupRow {
    group: String,
    name: String,
    exponent: f64,
    error: f64,
    downgrade: f64,
    haslimit: bool,
}

/// Reads `group;name;exponent;error;downgrade;haslimit` rows into curves
/// keyed by `group.name`. Malformed rows are skipped and counted.
pub fn load_lookup_table<R: Read>(reader: R) -> FsResult<HashMap<String, Exponential>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut out = HashMap::new();
    let mut skipped = 0;
    for row in rdr.deserialize::<LookupRow>() {
        match row {
            Ok(r) if r.error > 0.0 => {
                out.insert(
                    format!("{}.{}", r.group, r.name),
                    Exponential::simple(r.exponent, r.error, r.downgrade, r.haslimit),
                );
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("skipped {} invalid lookup rows", skipped);
    }
    Ok(out)
}

pub fn load_lookup_file<P: AsRef<Path>>(path: P) -> FsResult<HashMap<String, Exponential>> {
    load_lookup_table(File::open(path)?)
}
