// Small numeric helpers over f64 slices.

pub fn mean(vs: &[f64]) -> f64 {
    if vs.is_empty() {
        0.0
    } else {
        vs.iter().sum::<f64>() / vs.len() as f64
    }
}

pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Sign that treats zero as positive, for copying directions.
pub fn sign_or_pos(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

pub fn cumsum(vs: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    vs.iter()
        .map(|v| {
            acc += v;
            acc
        })
        .collect()
}

/// Removes 2π jumps between consecutive angles.
pub fn unwrap_angles(vs: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(vs.len());
    let mut offset = 0.0;
    for (i, &v) in vs.iter().enumerate() {
        if i > 0 {
            let d = v - vs[i - 1];
            if d > std::f64::consts::PI {
                offset -= 2.0 * std::f64::consts::PI;
            } else if d < -std::f64::consts::PI {
                offset += 2.0 * std::f64::consts::PI;
            }
        }
        out.push(v + offset);
    }
    out
}

pub fn argmax(vs: &[f64]) -> Option<usize> {
    vs.iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

pub fn argmin(vs: &[f64]) -> Option<usize> {
    vs.iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_removes_jumps() {
        let out = unwrap_angles(&[3.0, -3.0, -2.9]);
        assert!((out[1] - (2.0 * std::f64::consts::PI - 3.0)).abs() < 1e-12);
        assert!(out[2] > out[1]);
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[1.0, f64::NAN, 3.0, 2.0]), Some(2));
        assert_eq!(argmin(&[]), None);
    }
}
