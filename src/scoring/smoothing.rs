//! Filters applied to a selected sample before it is scored.

use super::selectors::{format_call, parse_call};
use crate::elements::Element;
use crate::error::{FsResult, ScoreError};
use crate::util::mean;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Smoother {
    None,
    /// moving average over `len / window_ratio` samples, at most `max_window`
    Convolve { window_ratio: f64, max_window: f64 },
    /// zero phase Butterworth, `cutoff` in Hz
    Lowpass { cutoff: f64, order: f64 },
    /// lowpass with the cutoff scaled to the loop angle
    CurvatureLowpass { cut: f64, order: f64 },
    /// lowpass with the cutoff scaled to the roll angle
    RollrateLowpass { order: f64 },
    /// ramps the first `width` seconds to their mean
    SoftStart { width: f64 },
    SoftEnd { width: f64 },
    SoftEnds { width: f64 },
}

impl Smoother {
    pub fn apply(&self, data: &[f64], freq: f64, el: &Element) -> Vec<f64> {
        if data.len() < 2 {
            return data.to_vec();
        }
        let n = data.len() as f64;
        match *self {
            Smoother::None => data.to_vec(),
            Smoother::Convolve {
                window_ratio,
                max_window,
            } => {
                let window = (n / window_ratio).floor().min(max_window) as usize;
                if window < 2 || window > data.len() {
                    return data.to_vec();
                }
                let sample = convolve(data, window);
                let m = mean(&sample);
                let scale = window as f64 / max_window;
                sample.iter().map(|v| (v - m) * scale + m).collect()
            }
            Smoother::Lowpass { cutoff, order } => filtfilt(data, cutoff, freq, order),
            Smoother::CurvatureLowpass { cut, order } => {
                let angle = el.get_parameter("angle").unwrap_or(2.0 * PI);
                let cutoff = freq * angle.abs() * cut / (2.0 * PI * n);
                filtfilt(data, cutoff, freq, order)
            }
            Smoother::RollrateLowpass { order } => {
                let cutoff = 100.0 * el.roll().abs() / (PI * n);
                filtfilt(data, cutoff, freq, order)
            }
            Smoother::SoftStart { width } => soft_start(data, width * freq),
            Smoother::SoftEnd { width } => soft_end(data, width * freq),
            Smoother::SoftEnds { width } => soft_start(&soft_end(data, width * freq), width * freq),
        }
    }

    pub fn apply_all(smoothers: &[Smoother], data: &[f64], freq: f64, el: &Element) -> Vec<f64> {
        smoothers
            .iter()
            .fold(data.to_vec(), |d, s| s.apply(&d, freq, el))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Smoother::None => "none",
            Smoother::Convolve { .. } => "convolve",
            Smoother::Lowpass { .. } => "lowpass",
            Smoother::CurvatureLowpass { .. } => "curvature_lowpass",
            Smoother::RollrateLowpass { .. } => "rollrate_lowpass",
            Smoother::SoftStart { .. } => "soft_start",
            Smoother::SoftEnd { .. } => "soft_end",
            Smoother::SoftEnds { .. } => "soft_ends",
        }
    }

    fn args(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Smoother::None => Vec::new(),
            Smoother::Convolve {
                window_ratio,
                max_window,
            } => vec![("window_ratio", window_ratio), ("max_window", max_window)],
            Smoother::Lowpass { cutoff, order } => vec![("cutoff", cutoff), ("order", order)],
            Smoother::CurvatureLowpass { cut, order } => vec![("cut", cut), ("order", order)],
            Smoother::RollrateLowpass { order } => vec![("order", order)],
            Smoother::SoftStart { width } | Smoother::SoftEnd { width } | Smoother::SoftEnds { width } => {
                vec![("width", width)]
            }
        }
    }
}

/// Moving average, the ends ramp linearly from the mean of the uncovered
/// samples to the first and last full window.
fn convolve(data: &[f64], window: usize) -> Vec<f64> {
    let n = data.len();
    let conv: Vec<f64> = data
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect();
    let pad = n - conv.len();
    let lead = pad / 2;
    let trail = pad - lead;
    let mut out = Vec::with_capacity(n);
    if lead > 0 {
        let start = mean(&data[..lead]);
        out.extend((0..lead).map(|i| start + (conv[0] - start) * i as f64 / lead as f64));
    }
    out.extend_from_slice(&conv);
    if trail > 0 {
        let end = mean(&data[n - trail..]);
        let last = conv[conv.len() - 1];
        out.extend((1..=trail).map(|i| last + (end - last) * i as f64 / trail as f64));
    }
    out
}

fn ramp_width(len: usize, width: f64) -> usize {
    ((len as f64 / 4.0).ceil().min(width).max(0.0) as usize).min(len.saturating_sub(1))
}

fn soft_end(data: &[f64], width: f64) -> Vec<f64> {
    let mut out = data.to_vec();
    let w = ramp_width(data.len(), width);
    if w == 0 {
        return out;
    }
    let n = data.len();
    let from = data[n - w];
    let to = mean(&data[n - w..]);
    for i in 0..w {
        out[n - w + i] = from + (to - from) * (i + 1) as f64 / w as f64;
    }
    out
}

fn soft_start(data: &[f64], width: f64) -> Vec<f64> {
    let mut out = data.to_vec();
    let w = ramp_width(data.len(), width);
    if w == 0 {
        return out;
    }
    let from = mean(&data[..w]);
    let to = data[w];
    for (i, v) in out.iter_mut().take(w).enumerate() {
        *v = from + (to - from) * i as f64 / w as f64;
    }
    out
}

/// Direct form II transposed second order section.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    fn run(&self, data: &mut [f64]) {
        let Some(&x0) = data.first() else {
            return;
        };
        // start in the steady state for the first input
        let mut z1 = (1.0 - self.b[0]) * x0;
        let mut z2 = (self.b[2] - self.a[1]) * x0;
        for v in data.iter_mut() {
            let x = *v;
            let y = self.b[0] * x + z1;
            z1 = self.b[1] * x - self.a[0] * y + z2;
            z2 = self.b[2] * x - self.a[1] * y;
            *v = y;
        }
    }
}

/// Butterworth lowpass as second order sections, bilinear transform with
/// the cutoff prewarped. Odd orders end with a first order section.
fn butterworth(order: usize, cutoff: f64, freq: f64) -> Vec<Biquad> {
    let k = (PI * cutoff / freq).tan();
    let mut sections = Vec::new();
    for i in 0..order / 2 {
        let q = 1.0 / (2.0 * ((2 * i + 1) as f64 * PI / (2 * order) as f64).sin());
        let norm = 1.0 / (1.0 + k / q + k * k);
        let b0 = k * k * norm;
        sections.push(Biquad {
            b: [b0, 2.0 * b0, b0],
            a: [2.0 * (k * k - 1.0) * norm, (1.0 - k / q + k * k) * norm],
        });
    }
    if order % 2 == 1 {
        let norm = 1.0 / (1.0 + k);
        sections.push(Biquad {
            b: [k * norm, k * norm, 0.0],
            a: [(k - 1.0) * norm, 0.0],
        });
    }
    sections
}

/// Forward-backward filtering with odd extension at both ends.
fn filtfilt(data: &[f64], cutoff: f64, freq: f64, order: f64) -> Vec<f64> {
    let n = data.len();
    let order = order.round().max(1.0) as usize;
    if n < 3 || !(cutoff > 0.0) || !(freq > 0.0) {
        return data.to_vec();
    }
    let cutoff = cutoff.min(0.49 * freq);
    let sections = butterworth(order, cutoff, freq);

    let pad = n - 1;
    let mut ext = Vec::with_capacity(n + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * data[0] - data[i]));
    ext.extend_from_slice(data);
    ext.extend((1..=pad).map(|i| 2.0 * data[n - 1] - data[n - 1 - i]));

    for s in &sections {
        s.run(&mut ext);
    }
    ext.reverse();
    for s in &sections {
        s.run(&mut ext);
    }
    ext.reverse();
    ext[pad..pad + n].to_vec()
}

impl fmt::Display for Smoother {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_call(f, self.name(), &self.args())
    }
}

impl FromStr for Smoother {
    type Err = ScoreError;

    fn from_str(s: &str) -> FsResult<Self> {
        let (name, args) = parse_call(s)?;
        let arg = |k: &str| {
            args.get(k)
                .copied()
                .ok_or_else(|| ScoreError::Config(format!("smoother {} needs {}", name, k)))
        };
        Ok(match name.as_str() {
            "none" => Smoother::None,
            "convolve" => Smoother::Convolve {
                window_ratio: arg("window_ratio")?,
                max_window: arg("max_window")?,
            },
            "lowpass" => Smoother::Lowpass {
                cutoff: arg("cutoff")?,
                order: arg("order")?,
            },
            "curvature_lowpass" => Smoother::CurvatureLowpass {
                cut: arg("cut")?,
                order: arg("order")?,
            },
            "rollrate_lowpass" => Smoother::RollrateLowpass {
                order: arg("order")?,
            },
            "soft_start" => Smoother::SoftStart { width: arg("width")? },
            "soft_end" => Smoother::SoftEnd { width: arg("width")? },
            "soft_ends" => Smoother::SoftEnds { width: arg("width")? },
            other => return Err(ScoreError::Config(format!("unknown smoother {}", other))),
        })
    }
}

impl TryFrom<String> for Smoother {
    type Error = ScoreError;

    fn try_from(s: String) -> FsResult<Self> {
        s.parse()
    }
}

impl From<Smoother> for String {
    fn from(s: Smoother) -> String {
        s.to_string()
    }
}
