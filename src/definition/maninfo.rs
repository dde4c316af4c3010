use crate::geometry::wrap_pi;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum_macros::{Display, EnumIter};

/// Attitude about the heading at the start of a manoeuvre. The value is
/// the roll angle applied to a level, identity-attitude aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Orientation {
    Upright,
    Inverted,
}

impl Orientation {
    pub fn roll(&self) -> f64 {
        match self {
            Orientation::Upright => PI,
            Orientation::Inverted => 0.0,
        }
    }
}

/// Flight direction in the box frame. The value is the yaw from +X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Heading {
    Right,
    Left,
    In,
    Out,
}

impl Heading {
    pub fn yaw(&self) -> f64 {
        match self {
            Heading::Right => 0.0,
            Heading::Left => PI,
            Heading::In => PI / 2.0,
            Heading::Out => 3.0 * PI / 2.0,
        }
    }

    /// Nearest heading to a yaw angle.
    pub fn infer(bearing: f64) -> Heading {
        let mut best = Heading::Right;
        let mut best_d = f64::INFINITY;
        for h in [Heading::Right, Heading::Left, Heading::In, Heading::Out] {
            let d = wrap_pi(bearing - h.yaw()).abs();
            if d < best_d {
                best = h;
                best_d = d;
            }
        }
        best
    }

    pub fn reverse(&self) -> Heading {
        match self {
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
            Heading::In => Heading::Out,
            Heading::Out => Heading::In,
        }
    }

    /// +1 or -1 along the box X axis, 0 for cross box headings.
    pub fn x_sign(&self) -> f64 {
        match self {
            Heading::Right => 1.0,
            Heading::Left => -1.0,
            Heading::In | Heading::Out => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Direction {
    Upwind,
    Downwind,
    Cross,
}

impl Direction {
    /// The heading to fly given the downwind heading.
    pub fn wind_swap_heading(&self, downwind: Heading) -> Heading {
        match self {
            Direction::Upwind => downwind.reverse(),
            Direction::Downwind | Direction::Cross => downwind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Height {
    Btm,
    Mid,
    Top,
}

impl Height {
    /// Fraction of the way from the box floor to its top.
    pub fn fraction(&self) -> f64 {
        match self {
            Height::Btm => 0.2,
            Height::Mid => 0.6,
            Height::Top => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Position {
    Centre,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxLocation {
    pub height: Height,
    pub direction: Direction,
    pub orientation: Orientation,
}

impl BoxLocation {
    pub fn new(height: Height, direction: Direction, orientation: Orientation) -> Self {
        Self {
            height,
            direction,
            orientation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManInfo {
    pub name: String,
    pub short_name: String,
    /// difficulty factor
    pub k: f64,
    pub position: Position,
    pub start: BoxLocation,
    pub end: BoxLocation,
    /// element indices whose exit point should be on the box centre
    #[serde(default)]
    pub centre_points: Vec<usize>,
    /// `(element index, fraction)` of element samples that should be centred
    #[serde(default)]
    pub centred_els: Vec<(usize, f64)>,
}

impl ManInfo {
    pub fn new(name: &str, short_name: &str, k: f64, position: Position, start: BoxLocation, end: BoxLocation) -> Self {
        Self {
            name: name.to_string(),
            short_name: short_name.to_string(),
            k,
            position,
            start,
            end,
            centre_points: Vec::new(),
            centred_els: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn infer_recovers_every_heading() {
        for h in Heading::iter() {
            assert_eq!(Heading::infer(h.yaw() + 0.3), h);
            assert_eq!(Heading::infer(h.yaw() - 0.3), h);
            assert_eq!(h.reverse().reverse(), h);
        }
        assert_eq!(Heading::infer(-0.1), Heading::Right);
    }
}
