//! Time ordered pose and velocity samples with named, contiguous labels.

use crate::error::{FsResult, ScoreError};
use crate::geometry::{Quat, Transform, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    /// world position
    pub pos: Vec3,
    /// body to world
    pub att: Quat,
    /// body frame velocity
    pub vel: Vec3,
    /// body frame rotation rate
    pub rvel: Vec3,
}

impl Sample {
    pub fn world_vel(&self) -> Vec3 {
        self.att * self.vel
    }

    pub fn world_rvel(&self) -> Vec3 {
        self.att * self.rvel
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.pos, self.att)
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }
}

/// Half open range `[start, stop)` of samples belonging to one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub name: String,
    pub start: usize,
    pub stop: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub labels: Vec<Span>,
}

impl State {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.samples.iter().map(|s| s.pos).collect()
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.speed()).collect()
    }

    pub fn duration(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => b.t - a.t,
            _ => 0.0,
        }
    }

    /// Mean sample interval, 1/25 s when it cannot be measured.
    pub fn dt(&self) -> f64 {
        if self.len() < 2 {
            return 1.0 / 25.0;
        }
        let d = self.duration() / (self.len() - 1) as f64;
        if d > 0.0 {
            d
        } else {
            1.0 / 25.0
        }
    }

    pub fn freq(&self) -> f64 {
        1.0 / self.dt()
    }

    /// Builds samples from world frame kinematics. Body velocity comes from
    /// the attitude, body rates from finite differences of consecutive
    /// attitudes.
    pub fn from_kinematics(t: &[f64], pos: &[Vec3], att: &[Quat], wvel: &[Vec3]) -> State {
        let n = t.len().min(pos.len()).min(att.len()).min(wvel.len());
        let mut rates = vec![Vec3::zeros(); n];
        for i in 0..n.saturating_sub(1) {
            let dt = t[i + 1] - t[i];
            if dt > 0.0 {
                rates[i] = (att[i].inverse() * att[i + 1]).scaled_axis() / dt;
            }
        }
        if n > 1 {
            rates[n - 1] = rates[n - 2];
        }
        let samples = (0..n)
            .map(|i| Sample {
                t: t[i],
                pos: pos[i],
                att: att[i],
                vel: att[i].inverse() * wvel[i],
                rvel: rates[i],
            })
            .collect();
        State::new(samples)
    }

    pub fn slice(&self, start: usize, stop: usize) -> State {
        let stop = stop.min(self.len());
        let start = start.min(stop);
        let labels = self
            .labels
            .iter()
            .filter_map(|s| {
                let a = s.start.max(start);
                let b = s.stop.min(stop);
                (b > a).then(|| Span {
                    name: s.name.clone(),
                    start: a - start,
                    stop: b - start,
                })
            })
            .collect();
        State {
            samples: self.samples[start..stop].to_vec(),
            labels,
        }
    }

    /// The samples at `indices`, unlabelled.
    pub fn pick(&self, indices: &[usize]) -> State {
        State::new(
            indices
                .iter()
                .filter_map(|i| self.samples.get(*i).copied())
                .collect(),
        )
    }

    pub fn span(&self, name: &str) -> Option<&Span> {
        self.labels.iter().find(|s| s.name == name)
    }

    pub fn element_names(&self) -> Vec<String> {
        self.labels.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_labelled(&self) -> bool {
        !self.labels.is_empty()
    }

    /// The samples labelled `name`.
    pub fn segment(&self, name: &str) -> FsResult<State> {
        let span = self
            .span(name)
            .ok_or_else(|| ScoreError::Alignment(format!("no samples labelled {}", name)))?;
        Ok(self.slice(span.start, span.stop))
    }

    pub fn label_all(mut self, name: &str) -> State {
        self.labels = vec![Span {
            name: name.to_string(),
            start: 0,
            stop: self.len(),
        }];
        self
    }

    pub fn remove_labels(mut self) -> State {
        self.labels.clear();
        self
    }

    /// Replaces the labels, checking they tile the whole state in order.
    pub fn relabel(mut self, spans: Vec<Span>) -> FsResult<State> {
        let mut expected = 0;
        for s in &spans {
            if s.start != expected || s.stop < s.start {
                return Err(ScoreError::Alignment(format!(
                    "label {} is not contiguous ({}..{})",
                    s.name, s.start, s.stop
                )));
            }
            expected = s.stop;
        }
        if expected != self.len() {
            return Err(ScoreError::Alignment(format!(
                "labels cover {} of {} samples",
                expected,
                self.len()
            )));
        }
        self.labels = spans;
        Ok(self)
    }

    /// Turns a per-sample element index into contiguous spans.
    pub fn spans_from_indices(names: &[String], indices: &[usize]) -> Vec<Span> {
        let mut spans: Vec<Span> = Vec::new();
        for (i, &ix) in indices.iter().enumerate() {
            let name = names.get(ix).cloned().unwrap_or_default();
            match spans.last_mut() {
                Some(s) if s.name == name => s.stop = i + 1,
                _ => spans.push(Span {
                    name,
                    start: i,
                    stop: i + 1,
                }),
            }
        }
        spans
    }

    /// Concatenates named pieces, labelling each with its name.
    pub fn stack(pieces: &[(String, State)]) -> State {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for (name, st) in pieces {
            let start = samples.len();
            samples.extend_from_slice(&st.samples);
            labels.push(Span {
                name: name.clone(),
                start,
                stop: samples.len(),
            });
        }
        State { samples, labels }
    }

    /// Moves the boundary at the end of `name` by `steps` samples. Positive
    /// steps grow `name` into the following element.
    pub fn step_label(&self, name: &str, steps: i64, min_len: usize) -> FsResult<State> {
        let i = self
            .labels
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ScoreError::Alignment(format!("no samples labelled {}", name)))?;
        if i + 1 >= self.labels.len() {
            return Err(ScoreError::Alignment(format!(
                "{} is the last element, it has no following boundary",
                name
            )));
        }
        let boundary = self.labels[i].stop as i64 + steps;
        let first_len = boundary - self.labels[i].start as i64;
        let second_len = self.labels[i + 1].stop as i64 - boundary;
        if first_len < min_len as i64 || second_len < min_len as i64 {
            return Err(ScoreError::Alignment(format!(
                "moving {} by {} leaves fewer than {} samples",
                name, steps, min_len
            )));
        }
        let mut out = self.clone();
        out.labels[i].stop = boundary as usize;
        out.labels[i + 1].start = boundary as usize;
        Ok(out)
    }

    /// Applies a rigid transform to every pose. Body frame values are unchanged.
    pub fn transformed(&self, t: &Transform) -> State {
        let samples = self
            .samples
            .iter()
            .map(|s| Sample {
                pos: t.point(&s.pos),
                att: t.attitude(&s.att),
                ..*s
            })
            .collect();
        State {
            samples,
            labels: self.labels.clone(),
        }
    }

    /// Integrated rotation about world Z between consecutive samples.
    pub fn yaw_increments(&self) -> Vec<f64> {
        self.samples
            .windows(2)
            .map(|w| (w[1].att * w[0].att.inverse()).scaled_axis().z)
            .collect()
    }
}
