//! Default judging criteria, keyed `group.name`.

use super::{Criteria, CriteriaKind, Exponential};
use crate::error::{FsResult, ScoreError};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

/// Two point power law fit, `(x1, y1)` and `(x2, y2)` must be positive.
fn fit(x1: f64, x2: f64, y1: f64, y2: f64, limit: f64) -> Exponential {
    let exponent = (y2 / y1).ln() / (x2 / x1).ln();
    Exponential::new(y1 / x1.powf(exponent), exponent, Some(limit))
}

fn deg(v: f64) -> f64 {
    v.to_radians()
}

#[derive(Debug, Clone)]
pub struct CriteriaLibrary {
    entries: BTreeMap<String, Criteria>,
}

impl Default for CriteriaLibrary {
    fn default() -> Self {
        Self::f3a()
    }
}

impl CriteriaLibrary {
    pub fn f3a() -> Self {
        use CriteriaKind::*;
        let mut lib = Self {
            entries: BTreeMap::new(),
        };

        let angle = fit(deg(30.0), deg(90.0), 2.0, 6.0, 6.0);
        lib.add("intra", "angle", angle, Single);
        lib.add("intra", "end_track", angle, Single);
        lib.add("intra", "end_roll", fit(deg(30.0), deg(90.0), 1.0, 6.0, 6.0), Single);
        lib.add("intra", "track", fit(deg(30.0), deg(90.0), 1.75, 6.0, 6.0), Continuous);
        lib.add("intra", "roll", fit(deg(30.0), deg(90.0), 1.25, 6.0, 6.0), Continuous);
        lib.add("intra", "speed", fit(5.0, 15.0, 0.1, 0.3, 0.5), ContinuousValue);
        lib.add("intra", "roll_gradient", fit(0.5, 1.0, 0.1, 0.2, 1.0), ContinuousValue);
        lib.add("intra", "loopshape", fit(1.5, 3.0, 0.5, 1.0, 3.0), Continuous);
        lib.add("intra", "loopsmoothness", fit(0.5, 1.0, 0.025, 0.05, 3.0), ContinuousValue);
        lib.add("intra", "rollrate", fit(1.0, 3.0, 0.2, 0.6, 3.0), Continuous);
        lib.add("intra", "rollsmoothness", fit(1.0, 2.0, 0.25, 0.7, 3.0), ContinuousValue);
        lib.add(
            "intra",
            "stallturn_speed",
            fit(2.0, 4.0, 0.5, 1.0, 1.0),
            Limit { limit: 8.0 },
        );
        lib.add(
            "intra",
            "stallturn_width",
            fit(2.0, 5.0, 0.25, 1.25, 6.0),
            Peak { limit: 2.0 },
        );
        lib.add(
            "intra",
            "stallturn_direction",
            Exponential::new(1.0, 1.0, Some(1.0)),
            Peak { limit: 0.2 },
        );
        lib.add(
            "intra",
            "break_pitch_rate",
            Exponential::new(10.0, 1.0, Some(0.1)),
            Bounded {
                min: None,
                max: Some(1.6),
            },
        );
        lib.add(
            "intra",
            "peak_break_pitch_rate",
            Exponential::new(10.0, 1.0, Some(6.0)),
            Trough { limit: 0.6 },
        );
        lib.add(
            "intra",
            "autorotation_alpha",
            Exponential::new(20.0, 1.0, Some(6.0)),
            Bounded {
                min: Some(-deg(7.5)),
                max: Some(deg(7.5)),
            },
        );
        lib.add(
            "intra",
            "drop_pitch_rate",
            Exponential::new(10.0, 1.0, Some(0.1)),
            Bounded {
                min: None,
                max: Some(2.0),
            },
        );
        lib.add(
            "intra",
            "recovery_roll_rate",
            Exponential::new(1.0, 1.0, Some(0.01)),
            Bounded {
                min: Some(-2.0 * PI),
                max: Some(2.0 * PI),
            },
        );
        lib.add(
            "box",
            "box",
            Exponential::new(10.0 / deg(7.5), 1.0, Some(2.0)),
            Bounded {
                min: None,
                max: Some(0.0),
            },
        );
        lib.add(
            "box",
            "depth",
            fit(20.0, 40.0, 0.5, 1.0, 4.0),
            Bounded {
                min: Some(0.0),
                max: None,
            },
        );
        lib.add("box", "centre", angle, Single);

        lib.add("inter", "radius", fit(2.0, 4.0, 0.3, 0.6, 2.0), Comparison);
        lib.add("inter", "speed", Exponential::free(), Comparison);
        lib.add("inter", "roll_rate", fit(2.0, 4.0, 0.25, 0.5, 1.0), Comparison);
        lib.add("inter", "length", fit(1.0, 2.0, 0.6, 1.2, 2.0), Comparison);
        lib.add("inter", "free", Exponential::free(), Comparison);
        lib
    }

    fn add(&mut self, group: &str, name: &str, lookup: Exponential, kind: CriteriaKind) {
        let key = format!("{}.{}", group, name);
        self.entries
            .insert(key.clone(), Criteria::new(&key, lookup, kind));
    }

    pub fn get(&self, key: &str) -> FsResult<Criteria> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| ScoreError::Config(format!("unknown criteria {}", key)))
    }

    pub fn insert(&mut self, criteria: Criteria) {
        self.entries.insert(criteria.name.clone(), criteria);
    }

    /// Replaces the lookup curves of known entries with loaded ones.
    /// Unknown keys are returned so the caller can report them.
    pub fn apply_lookups(&mut self, table: &HashMap<String, Exponential>) -> Vec<String> {
        let mut unknown = Vec::new();
        for (key, lookup) in table {
            match self.entries.get_mut(key) {
                Some(c) => c.lookup = *lookup,
                None => unknown.push(key.clone()),
            }
        }
        unknown.sort();
        unknown
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Criteria)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_reproduces_calibration() {
        let e = fit(deg(30.0), deg(90.0), 2.0, 6.0, 6.0);
        assert!((e.lookup(deg(30.0), true) - 2.0).abs() < 1e-9);
        assert!((e.lookup(deg(90.0), true) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_lookup_keys_are_reported() {
        let mut lib = CriteriaLibrary::f3a();
        let mut table = HashMap::new();
        table.insert("intra.angle".to_string(), Exponential::linear(3.0));
        table.insert("intra.nope".to_string(), Exponential::linear(3.0));
        assert_eq!(lib.apply_lookups(&table), vec!["intra.nope".to_string()]);
        assert_eq!(lib.get("intra.angle").unwrap().lookup.factor, 3.0);
    }
}
