use crate::elements::{Element, TimeBase};
use crate::error::{FsResult, ScoreError};
use crate::geometry::Transform;
use crate::state::State;
use serde::{Deserialize, Serialize};

/// An ordered set of concrete elements, starting with the entry line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manoeuvre {
    pub uid: String,
    pub elements: Vec<Element>,
}

impl Manoeuvre {
    pub fn new(uid: &str, elements: Vec<Element>) -> Self {
        Self {
            uid: uid.to_string(),
            elements,
        }
    }

    pub fn element(&self, uid: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.uid() == uid)
    }

    pub fn element_names(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.uid().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Fails when the labels of `flown` are not this manoeuvre's elements
    /// in order.
    pub fn check_sequence(&self, flown: &State) -> FsResult<()> {
        let expected = self.element_names();
        let actual = flown.element_names();
        if expected != actual {
            return Err(ScoreError::Sequence {
                manoeuvre: self.uid.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Per element templates, each entered where the previous one ended.
    pub fn element_templates(&self, itrans: &Transform, freq: f64) -> FsResult<Vec<State>> {
        let mut entry = *itrans;
        let mut t0 = 0.0;
        let mut out = Vec::with_capacity(self.elements.len());
        for el in &self.elements {
            let tp = el.create_template(&entry, TimeBase::Freq { hz: freq, t0 })?;
            let last = tp
                .last()
                .ok_or_else(|| ScoreError::degenerate(el.uid(), "empty template"))?;
            entry = last.transform();
            t0 = last.t + 1.0 / freq;
            out.push(tp);
        }
        Ok(out)
    }

    /// The labelled template of the whole manoeuvre.
    pub fn create_template(&self, itrans: &Transform, freq: f64) -> FsResult<State> {
        let pieces: Vec<(String, State)> = self
            .element_names()
            .into_iter()
            .zip(self.element_templates(itrans, freq)?)
            .collect();
        Ok(State::stack(&pieces))
    }

    /// Template that reuses the timestamps of a labelled flight.
    pub fn create_template_like(&self, itrans: &Transform, flown: &State) -> FsResult<State> {
        self.check_sequence(flown)?;
        let mut entry = *itrans;
        let mut pieces = Vec::with_capacity(self.elements.len());
        for el in &self.elements {
            let seg = flown.segment(el.uid())?;
            let tp = el.create_template(&entry, TimeBase::Flown(&seg))?;
            if let Some(last) = tp.last() {
                entry = last.transform();
            }
            pieces.push((el.uid().to_string(), tp));
        }
        Ok(State::stack(&pieces))
    }

    /// Refits every element to the labelled flight, chaining each template
    /// from the end of the previous one.
    pub fn match_intention(&self, itrans: &Transform, flown: &State) -> FsResult<(Manoeuvre, State)> {
        self.check_sequence(flown)?;
        let mut entry = *itrans;
        let mut elements = Vec::with_capacity(self.elements.len());
        let mut pieces = Vec::with_capacity(self.elements.len());
        for el in &self.elements {
            let seg = flown.segment(el.uid())?;
            let matched = el.match_intention(&entry, &seg)?;
            let tp = matched.create_template(&entry, TimeBase::Flown(&seg))?;
            if let Some(last) = tp.last() {
                entry = last.transform();
            }
            pieces.push((el.uid().to_string(), tp));
            elements.push(matched);
        }
        Ok((Manoeuvre::new(&self.uid, elements), State::stack(&pieces)))
    }

    pub fn copy_directions(&self, other: &Manoeuvre) -> Manoeuvre {
        let elements = self
            .elements
            .iter()
            .map(|e| match other.element(e.uid()) {
                Some(o) => e.copy_direction(o),
                None => e.clone(),
            })
            .collect();
        Manoeuvre::new(&self.uid, elements)
    }

    pub fn approx_eq(&self, other: &Manoeuvre, tol: f64) -> bool {
        self.uid == other.uid
            && self.len() == other.len()
            && self
                .elements
                .iter()
                .zip(other.elements.iter())
                .all(|(a, b)| a.approx_eq(b, tol))
    }
}
