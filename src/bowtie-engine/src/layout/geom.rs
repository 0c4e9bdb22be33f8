// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::ops::{Add, Sub};

/// Centre of a node card, in layout units.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Mean of `positions`, or `None` for an empty slice.
    pub fn mean(positions: &[Position]) -> Option<Position> {
        if positions.is_empty() {
            return None;
        }
        let n = positions.len() as f64;
        let sum = positions
            .iter()
            .fold(Position::default(), |acc, &p| acc + p);
        Some(Position::new(sum.x / n, sum.y / n))
    }
}

impl Add for Position {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Position {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Vertical band occupied by a group of cards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub top: f64,
    pub bottom: f64,
}

impl Span {
    pub fn around(y: f64, height: f64) -> Self {
        Span {
            top: y - height / 2.0,
            bottom: y + height / 2.0,
        }
    }

    pub fn union(self, other: Span) -> Span {
        Span {
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn shifted(self, dy: f64) -> Span {
        Span {
            top: self.top + dy,
            bottom: self.bottom + dy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_arithmetic() {
        let a = Position::new(1.0, 2.0);
        let b = Position::new(0.5, -1.0);
        assert_eq!(a + b, Position::new(1.5, 1.0));
        assert_eq!(a - b, Position::new(0.5, 3.0));
        assert_eq!(format!("{a:?}"), "(1.00, 2.00)");
    }

    #[test]
    fn test_position_mean() {
        assert_eq!(Position::mean(&[]), None);
        let mean = Position::mean(&[Position::new(0.0, 0.0), Position::new(4.0, 2.0)]);
        assert_eq!(mean, Some(Position::new(2.0, 1.0)));
    }

    #[test]
    fn test_span() {
        let s = Span::around(100.0, 60.0);
        assert!((s.top - 70.0).abs() < f64::EPSILON);
        assert!((s.bottom - 130.0).abs() < f64::EPSILON);
        let u = s.union(Span::around(200.0, 20.0));
        assert!((u.bottom - 210.0).abs() < f64::EPSILON);
        assert!((u.shifted(10.0).top - 80.0).abs() < f64::EPSILON);
    }
}
