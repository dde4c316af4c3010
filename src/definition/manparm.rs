use super::eldef::ElDef;
use super::expr::Scope;
use super::manoeuvre::Manoeuvre;
use crate::criteria::Criteria;
use crate::error::{FsResult, ScoreError};
use crate::scoring::results::{self, Results};
use crate::util::{mean, sign};
use serde::{Deserialize, Serialize};

/// A named value shared by several element fields. When it carries a
/// criteria the collected values are compared against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManParm {
    pub name: String,
    pub default: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub criteria: Option<Criteria>,
}

impl ManParm {
    pub fn new(name: &str, default: f64, unit: &str, criteria: Option<Criteria>) -> Self {
        Self {
            name: name.to_string(),
            default,
            unit: unit.to_string(),
            criteria,
        }
    }
}

/// One element field a parameter can be read back from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSlot {
    pub element: String,
    pub parameter: String,
}

/// Parameters on one side, element fields on the other. Each edge says
/// the field was built from, and can be collected into, the parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorGraph {
    pub slots: Vec<FieldSlot>,
    pub edges: Vec<(usize, usize)>,
}

impl CollectorGraph {
    fn slot_index(&mut self, element: &str, parameter: &str) -> usize {
        match self
            .slots
            .iter()
            .position(|s| s.element == element && s.parameter == parameter)
        {
            Some(i) => i,
            None => {
                self.slots.push(FieldSlot {
                    element: element.to_string(),
                    parameter: parameter.to_string(),
                });
                self.slots.len() - 1
            }
        }
    }

    pub fn connect(&mut self, parm: usize, element: &str, parameter: &str) {
        let slot = self.slot_index(element, parameter);
        if !self.edges.contains(&(parm, slot)) {
            self.edges.push((parm, slot));
        }
    }

    pub fn slots_of(&self, parm: usize) -> Vec<&FieldSlot> {
        self.edges
            .iter()
            .filter(|(p, _)| *p == parm)
            .filter_map(|(_, s)| self.slots.get(*s))
            .collect()
    }

    /// Parameters feeding the field, in edge order.
    pub fn parms_of(&self, element: &str, parameter: &str) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|(_, s)| {
                self.slots
                    .get(*s)
                    .is_some_and(|f| f.element == element && f.parameter == parameter)
            })
            .map(|(p, _)| *p)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManParms {
    pub parms: Vec<ManParm>,
    #[serde(default)]
    pub graph: CollectorGraph,
}

impl Scope for ManParms {
    fn parameter(&self, name: &str) -> FsResult<f64> {
        self.get(name).map(|p| p.default)
    }
}

impl ManParms {
    pub fn new(parms: Vec<ManParm>) -> Self {
        Self {
            parms,
            graph: CollectorGraph::default(),
        }
    }

    /// Adds or replaces a parameter, returning its index.
    pub fn add(&mut self, parm: ManParm) -> usize {
        match self.index(&parm.name) {
            Some(i) => {
                self.parms[i] = parm;
                i
            }
            None => {
                self.parms.push(parm);
                self.parms.len() - 1
            }
        }
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.parms.iter().position(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> FsResult<&ManParm> {
        self.parms
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ScoreError::Expression(format!("unknown parameter {}", name)))
    }

    pub fn value(&self, name: &str) -> FsResult<f64> {
        self.get(name).map(|p| p.default)
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManParm> {
        self.parms.iter()
    }

    /// Wires up the collectors of an element definition. Arguments that
    /// are bare parameter references collect into that parameter, explicit
    /// collectors map a parameter to a derived element value.
    pub fn register(&mut self, ed: &ElDef) -> FsResult<()> {
        let names = ed.kind.parameter_names();
        for (arg, pname) in ed.args.iter().zip(names.iter()) {
            if let Some(parm) = arg.collectable_parameter() {
                if let Some(i) = self.index(parm) {
                    self.graph.connect(i, &ed.name, pname);
                }
            }
            for p in arg.parameters() {
                if self.index(&p).is_none() {
                    return Err(ScoreError::Expression(format!(
                        "{} refers to unknown parameter {}",
                        ed.name, p
                    )));
                }
            }
        }
        for (parm, field) in &ed.collectors {
            let i = self.index(parm).ok_or_else(|| {
                ScoreError::Expression(format!("{} collects unknown parameter {}", ed.name, parm))
            })?;
            self.graph.connect(i, &ed.name, field);
        }
        Ok(())
    }

    /// Values of every parameter read back from the elements of `man`,
    /// in parameter order. Fields of elements not in `man` are skipped.
    pub fn collect(&self, man: &Manoeuvre) -> FsResult<Vec<Vec<f64>>> {
        (0..self.parms.len())
            .map(|i| {
                self.graph
                    .slots_of(i)
                    .into_iter()
                    .filter_map(|slot| man.element(&slot.element).map(|e| (e, slot)))
                    .map(|(e, slot)| e.get_parameter(&slot.parameter))
                    .collect::<FsResult<Vec<f64>>>()
            })
            .collect()
    }

    /// A copy whose defaults are the mean magnitude of the collected
    /// values, keeping the sign of the old default.
    pub fn update_defaults(&self, man: &Manoeuvre) -> FsResult<ManParms> {
        let collected = self.collect(man)?;
        let mut out = self.clone();
        for (parm, values) in out.parms.iter_mut().zip(collected) {
            if values.is_empty() {
                continue;
            }
            parm.default = if parm.default == 0.0 {
                mean(&values)
            } else {
                let mags: Vec<f64> = values.iter().map(|v| v.abs()).collect();
                sign(parm.default) * mean(&mags)
            };
        }
        Ok(out)
    }

    /// Compares the repeated instances of every parameter with a criteria.
    pub fn inter_results(&self, man: &Manoeuvre, limits: bool) -> FsResult<Results> {
        let collected = self.collect(man)?;
        let mut out = Results::new("inter");
        for (parm, values) in self.parms.iter().zip(collected) {
            let Some(criteria) = &parm.criteria else {
                continue;
            };
            if values.is_empty() {
                continue;
            }
            let mags: Vec<f64> = values.iter().map(|v| v.abs()).collect();
            out.push(results::Result::evaluate(
                &parm.name,
                mags.clone(),
                mags.clone(),
                mags,
                (0..values.len()).collect(),
                criteria.clone(),
                limits,
            ));
        }
        Ok(out)
    }
}
