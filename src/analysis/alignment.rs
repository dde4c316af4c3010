//! Dynamic time warping of a flown manoeuvre onto its labelled template.

use crate::config::AlignmentParams;
use crate::error::{FsResult, ScoreError};
use crate::geometry::Vec3;
use crate::state::{Sample, Span, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A flight labelled with the element names of the template it was warped
/// onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub flown: State,
    pub cost: f64,
    /// `(flown index, template index)` pairs from start to end.
    pub path: Vec<(usize, usize)>,
}

#[derive(Clone, Copy)]
enum Step {
    Diag,
    Up,
    Left,
}

/// Per sample features: position scaled by the template extent and body
/// rates scaled by the template's peak rate.
struct Features {
    centre: Vec3,
    extent: f64,
    rate: f64,
}

impl Features {
    fn of_template(tp: &State) -> Features {
        let n = tp.len().max(1) as f64;
        let centre = tp.samples.iter().fold(Vec3::zeros(), |acc, s| acc + s.pos) / n;
        let extent = tp
            .samples
            .iter()
            .map(|s| (s.pos - centre).norm())
            .fold(0.0f64, f64::max)
            .max(1.0);
        let rate = tp
            .samples
            .iter()
            .map(|s| s.rvel.norm())
            .fold(0.0f64, f64::max)
            .max(1.0);
        Features {
            centre,
            extent,
            rate,
        }
    }

    fn point(&self, s: &Sample) -> [f64; 6] {
        let p = (s.pos - self.centre) / self.extent;
        let r = s.rvel / self.rate;
        [p.x, p.y, p.z, r.x, r.y, r.z]
    }
}

fn distance(a: &[f64; 6], b: &[f64; 6]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Half width of the band about the scaled diagonal, `None` for unbounded.
fn band(n: usize, m: usize, radius: usize) -> Option<usize> {
    (radius > 0).then(|| radius.max(n.abs_diff(m)))
}

/// Warps `flown` onto `template` and labels it with the template's
/// element names.
pub fn align(flown: &State, template: &State, params: &AlignmentParams) -> FsResult<Alignment> {
    let n = flown.len();
    let m = template.len();
    if n == 0 || m == 0 {
        return Err(ScoreError::Alignment("cannot align an empty state".to_string()));
    }
    if !template.is_labelled() {
        return Err(ScoreError::Alignment("template has no element labels".to_string()));
    }

    // 1. Features
    let feats = Features::of_template(template);
    let fl: Vec<[f64; 6]> = flown.samples.iter().map(|s| feats.point(s)).collect();
    let tp: Vec<[f64; 6]> = template.samples.iter().map(|s| feats.point(s)).collect();

    // 2. Cumulative cost inside the band
    let width = band(n, m, params.dtw_radius);
    let slope = if n > 1 {
        (m - 1) as f64 / (n - 1) as f64
    } else {
        0.0
    };
    let in_band = |i: usize, j: usize| match width {
        Some(w) => (j as f64 - i as f64 * slope).abs() <= w as f64,
        None => true,
    };

    let mut cost = vec![f64::INFINITY; n * m];
    let mut from = vec![Step::Diag; n * m];
    let ix = |i: usize, j: usize| i * m + j;
    for i in 0..n {
        for j in 0..m {
            if !in_band(i, j) && !(i == 0 && j == 0) && !(i == n - 1 && j == m - 1) {
                continue;
            }
            let d = distance(&fl[i], &tp[j]);
            if i == 0 && j == 0 {
                cost[0] = d;
                continue;
            }
            let diag = if i > 0 && j > 0 { cost[ix(i - 1, j - 1)] } else { f64::INFINITY };
            let up = if i > 0 { cost[ix(i - 1, j)] } else { f64::INFINITY };
            let left = if j > 0 { cost[ix(i, j - 1)] } else { f64::INFINITY };
            // ties go to the diagonal, then up, then left
            let (best, step) = if diag <= up && diag <= left {
                (diag, Step::Diag)
            } else if up <= left {
                (up, Step::Up)
            } else {
                (left, Step::Left)
            };
            cost[ix(i, j)] = best + d;
            from[ix(i, j)] = step;
        }
    }
    let total = cost[ix(n - 1, m - 1)];
    if !total.is_finite() {
        return Err(ScoreError::Alignment(format!(
            "no warping path within a band of {:?} samples",
            width
        )));
    }

    // 3. Backtrack
    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    path.push((i, j));
    while i > 0 || j > 0 {
        match from[ix(i, j)] {
            Step::Diag => {
                i -= 1;
                j -= 1;
            }
            Step::Up => i -= 1,
            Step::Left => j -= 1,
        }
        path.push((i, j));
    }
    path.reverse();

    // 4. Labels from the matched template samples
    let names = template.element_names();
    let element_of = element_index(template);
    let mut per_sample = vec![0usize; n];
    for &(i, j) in &path {
        per_sample[i] = element_of[j];
    }
    let spans = repair(&names, &per_sample, params.min_element_len)?;
    debug!(
        samples = n,
        template = m,
        cost = total,
        band = ?width,
        "global alignment"
    );

    Ok(Alignment {
        flown: flown.clone().relabel(spans)?,
        cost: total,
        path,
    })
}

fn element_index(template: &State) -> Vec<usize> {
    let mut out = vec![0usize; template.len()];
    for (k, span) in template.labels.iter().enumerate() {
        for v in out.iter_mut().take(span.stop).skip(span.start) {
            *v = k;
        }
    }
    out
}

/// Turns a monotone per sample element index into contiguous spans where
/// every element is present and at least `min_len` long.
fn repair(names: &[String], per_sample: &[usize], min_len: usize) -> FsResult<Vec<Span>> {
    let n = per_sample.len();
    let k = names.len();
    let min_len = min_len.max(1);
    if n < k * min_len {
        return Err(ScoreError::Alignment(format!(
            "{} samples cannot hold {} elements of {} samples",
            n, k, min_len
        )));
    }

    // starts[e] is the first sample of element e
    let mut starts = vec![0usize; k];
    for (e, start) in starts.iter_mut().enumerate().skip(1) {
        *start = per_sample.iter().position(|&x| x >= e).unwrap_or(n);
    }
    for e in 1..k {
        starts[e] = starts[e].max(starts[e - 1] + min_len);
    }
    for e in (1..k).rev() {
        starts[e] = starts[e].min(n - (k - e) * min_len);
        starts[e - 1] = starts[e - 1].min(starts[e].saturating_sub(min_len));
    }
    starts[0] = 0;

    let spans = names
        .iter()
        .enumerate()
        .map(|(e, name)| Span {
            name: name.clone(),
            start: starts[e],
            stop: if e + 1 < k { starts[e + 1] } else { n },
        })
        .collect();
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Manoeuvre;
    use crate::elements::{Element, Line, Loop};
    use crate::geometry::{euler, Transform};
    use std::f64::consts::PI;

    fn man() -> Manoeuvre {
        Manoeuvre::new(
            "m",
            vec![
                Element::Line(Line::new("entry_line", 30.0, 30.0, 0.0)),
                Element::Loop(Loop::new("e1", 30.0, 2.0 * PI, 50.0, 0.0, 0.0)),
                Element::Line(Line::new("e2", 30.0, 40.0, PI)),
            ],
        )
    }

    fn itrans() -> Transform {
        Transform::new(Vec3::new(-100.0, 150.0, 100.0), euler(PI, 0.0, 0.0))
    }

    #[test]
    fn template_aligns_onto_itself() {
        let tp = man().create_template(&itrans(), 25.0).unwrap();
        let al = align(&tp.clone().remove_labels(), &tp, &AlignmentParams::default()).unwrap();
        assert!(al.cost < 1e-9);
        assert_eq!(al.flown.labels, tp.labels);
        assert!(al.path.iter().all(|(i, j)| i == j));
    }

    #[test]
    fn slower_flight_keeps_element_order() {
        let m = man();
        let tp = m.create_template(&itrans(), 25.0).unwrap();
        let slow = m.create_template(&itrans(), 30.0).unwrap();
        let al = align(&slow.clone().remove_labels(), &tp, &AlignmentParams::default()).unwrap();
        assert_eq!(al.flown.element_names(), tp.element_names());
        for (a, b) in al.flown.labels.iter().zip(slow.labels.iter()) {
            assert!(
                (a.stop as i64 - b.stop as i64).abs() <= 4,
                "{} ends at {}, expected {}",
                a.name,
                a.stop,
                b.stop
            );
        }
    }

    #[test]
    fn path_is_monotone() {
        let m = man();
        let tp = m.create_template(&itrans(), 25.0).unwrap();
        let fl = m.create_template(&itrans(), 20.0).unwrap();
        let al = align(&fl, &tp, &AlignmentParams::default()).unwrap();
        assert_eq!(al.path.first(), Some(&(0, 0)));
        assert_eq!(al.path.last(), Some(&(fl.len() - 1, tp.len() - 1)));
        assert!(al
            .path
            .windows(2)
            .all(|w| w[1].0 >= w[0].0 && w[1].1 >= w[0].1));
    }

    #[test]
    fn repair_enforces_minimum_lengths() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let spans = repair(&names, &[0, 0, 0, 0, 0, 0, 0, 2, 2, 2], 2).unwrap();
        assert_eq!(spans.len(), 3);
        assert!(spans.iter().all(|s| s.len() >= 2));
        assert_eq!(spans[2].stop, 10);
        assert!(repair(&names, &[0, 1, 2], 2).is_err());
    }
}
