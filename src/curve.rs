//! Gosper (flowsnake) curve generation.
//!
//! The curve is drawn by a turtle following two mutually recursive
//! productions. The turtle pose is an immutable value threaded through the
//! recursion; the only mutable state is the per-call point buffer.

use glam::Vec3;

use crate::color::Color;

/// Highest order the generator will expand. `7^6` segments is already
/// over 200k points.
pub const MAX_ORDER: u32 = 6;

/// Length divisor per recursion level (approximately sqrt 7).
const SHRINK: f32 = 2.6457;

/// Depth amplitude applied to the otherwise planar curve.
const DEPTH: f32 = 5.0;

/// Turtle pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Turtle {
    pub x: f32,
    pub y: f32,
    pub heading_deg: f32,
    /// Forward moves made so far.
    pub steps: u32,
}

impl Turtle {
    pub const ORIGIN: Turtle = Turtle {
        x: 0.0,
        y: 0.0,
        heading_deg: 0.0,
        steps: 0,
    };

    /// Turn clockwise (towards positive heading).
    pub fn right(self, degrees: f32) -> Self {
        Self {
            heading_deg: self.heading_deg + degrees,
            ..self
        }
    }

    pub fn left(self, degrees: f32) -> Self {
        self.right(-degrees)
    }

    /// Move forward by `distance`, emitting the segment's start and end.
    pub fn forward(self, distance: f32, out: &mut Vec<Vec3>) -> Self {
        let z = (self.steps as f32).sin() * DEPTH;
        let dir = self.heading_deg.to_radians();
        let next = Self {
            x: self.x + dir.cos() * distance,
            y: self.y + dir.sin() * distance,
            steps: self.steps + 1,
            ..self
        };
        out.push(Vec3::new(self.x, self.y, z));
        out.push(Vec3::new(next.x, next.y, z));
        next
    }
}

/// Generate the Gosper curve of `order` with overall `size`.
///
/// Order 0 is the bare origin. Order `n >= 1` produces `7^n` segments, each
/// contributing its start and end point. Orders above [`MAX_ORDER`] are
/// clamped.
pub fn gosper(order: u32, size: f32) -> Vec<Vec3> {
    let order = order.min(MAX_ORDER);
    if order == 0 {
        return vec![Vec3::ZERO];
    }
    let mut points = Vec::with_capacity(2 * 7usize.pow(order));
    rg(order, size, Turtle::ORIGIN, &mut points);
    points
}

fn rg(order: u32, len: f32, t: Turtle, out: &mut Vec<Vec3>) -> Turtle {
    let order = order - 1;
    let len = len / SHRINK;
    if order > 0 {
        let t = rg(order, len, t, out).right(60.0);
        let t = gl(order, len, t, out).right(120.0);
        let t = gl(order, len, t, out).left(60.0);
        let t = rg(order, len, t, out).left(120.0);
        let t = rg(order, len, t, out);
        let t = rg(order, len, t, out).left(60.0);
        gl(order, len, t, out).right(60.0)
    } else {
        let t = t.forward(len, out).right(60.0);
        let t = t.forward(len, out).right(120.0);
        let t = t.forward(len, out).left(60.0);
        let t = t.forward(len, out).left(120.0);
        let t = t.forward(len, out);
        let t = t.forward(len, out).left(60.0);
        t.forward(len, out).right(60.0)
    }
}

fn gl(order: u32, len: f32, t: Turtle, out: &mut Vec<Vec3>) -> Turtle {
    let order = order - 1;
    let len = len / SHRINK;
    if order > 0 {
        let t = rg(order, len, t.left(60.0), out).right(60.0);
        let t = gl(order, len, t, out);
        let t = gl(order, len, t, out).right(120.0);
        let t = gl(order, len, t, out).right(60.0);
        let t = rg(order, len, t, out).left(120.0);
        let t = rg(order, len, t, out).left(60.0);
        gl(order, len, t, out)
    } else {
        let t = t.left(60.0).forward(len, out).right(60.0);
        let t = t.forward(len, out);
        let t = t.forward(len, out).right(120.0);
        let t = t.forward(len, out).right(60.0);
        let t = t.forward(len, out).left(120.0);
        let t = t.forward(len, out).left(60.0);
        t.forward(len, out)
    }
}

/// Per-vertex colors for the curve: hue follows x, saturation follows y.
pub fn curve_colors(points: &[Vec3]) -> Vec<Color> {
    points
        .iter()
        .map(|p| Color::from_hsl(p.x / 100.0 + 0.5, p.y * 20.0 / 300.0, 0.8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_one_is_deterministic() {
        let a = gosper(1, 60.0);
        let b = gosper(1, 60.0);
        assert!(!a.is_empty());
        assert_eq!(a, b);
        assert_eq!(a[0], Vec3::ZERO);
    }

    #[test]
    fn test_point_counts() {
        assert_eq!(gosper(0, 60.0), vec![Vec3::ZERO]);
        assert_eq!(gosper(1, 60.0).len(), 14);
        assert_eq!(gosper(2, 60.0).len(), 98);
        assert_eq!(gosper(3, 60.0).len(), 686);
    }

    #[test]
    fn test_count_is_monotonic_in_order() {
        let counts: Vec<usize> = (0..=5).map(|order| gosper(order, 60.0).len()).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{:?}", counts);
    }

    #[test]
    fn test_order_is_clamped() {
        assert_eq!(gosper(MAX_ORDER + 3, 1.0).len(), gosper(MAX_ORDER, 1.0).len());
    }

    #[test]
    fn test_segments_are_connected() {
        let points = gosper(2, 60.0);
        for pair in points.chunks_exact(2).collect::<Vec<_>>().windows(2) {
            let end = pair[0][1];
            let start = pair[1][0];
            assert!((end.x - start.x).abs() < 1e-4 && (end.y - start.y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_segment_length_shrinks_per_order() {
        let points = gosper(1, 60.0);
        let len = (points[1] - points[0]).truncate().length();
        assert!((len - 60.0 / SHRINK).abs() < 1e-3);
    }

    #[test]
    fn test_turtle_is_a_value() {
        let mut out = Vec::new();
        let start = Turtle::ORIGIN;
        let moved = start.forward(10.0, &mut out);
        assert_eq!(start, Turtle::ORIGIN);
        assert_eq!(moved.steps, 1);
        assert!((moved.x - 10.0).abs() < 1e-6);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_curve_colors_match_points() {
        let points = gosper(2, 60.0);
        assert_eq!(curve_colors(&points).len(), points.len());
    }
}
