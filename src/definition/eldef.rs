use super::expr::{Expr, Scope};
use crate::elements::{Element, ElementKind};
use crate::error::{FsResult, ScoreError};
use serde::{Deserialize, Serialize};

/// Recipe for one element: its kind and an expression per constructor
/// argument, in `kind.parameter_names()` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElDef {
    pub name: String,
    pub kind: ElementKind,
    pub args: Vec<Expr>,
    /// `(parameter, element field)` pairs for derived values such as rates
    #[serde(default)]
    pub collectors: Vec<(String, String)>,
}

impl ElDef {
    pub fn new(name: &str, kind: ElementKind, args: Vec<Expr>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            args,
            collectors: Vec::new(),
        }
    }

    pub fn collecting(mut self, parm: &Expr, field: &str) -> Self {
        if let Some(p) = parm.collectable_parameter() {
            self.collectors.push((p.to_string(), field.to_string()));
        }
        self
    }

    pub fn build(&self, scope: &dyn Scope) -> FsResult<Element> {
        let values = self
            .args
            .iter()
            .map(|a| a.eval(scope))
            .collect::<FsResult<Vec<f64>>>()
            .map_err(|e| ScoreError::Expression(format!("{}: {}", self.name, e)))?;
        Element::from_args(self.kind, &self.name, &values)
    }

    /// Overrides one argument by constructor name.
    pub fn set_arg(&mut self, parameter: &str, value: Expr) -> FsResult<()> {
        let i = self
            .kind
            .parameter_names()
            .iter()
            .position(|p| *p == parameter)
            .ok_or_else(|| {
                ScoreError::Expression(format!("{} has no argument {}", self.kind, parameter))
            })?;
        match self.args.get_mut(i) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ScoreError::Expression(format!(
                "{} has {} arguments",
                self.name,
                self.args.len()
            ))),
        }
    }
}
