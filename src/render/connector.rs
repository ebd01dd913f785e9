//! Curved parent-child connectors.

use crate::layout::{Point, Rect};

/// A cubic Bézier curve in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    /// S-curve between two anchors with both control points on the
    /// horizontal midpoint.
    pub fn horizontal(start: Point, end: Point) -> Self {
        let mid_x = f32::midpoint(start.x, end.x);
        Self {
            start,
            control1: Point::new(mid_x, start.y),
            control2: Point::new(mid_x, end.y),
            end,
        }
    }

    /// Connector from a parent's right edge to a child's left edge.
    pub fn between(parent: &Rect, child: &Rect) -> Self {
        Self::horizontal(parent.right_mid(), child.left_mid())
    }

    pub fn point_at(&self, t: f32) -> Point {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point::new(
            b0 * self.start.x + b1 * self.control1.x + b2 * self.control2.x + b3 * self.end.x,
            b0 * self.start.y + b1 * self.control1.y + b2 * self.control2.y + b3 * self.end.y,
        )
    }

    /// `segments + 1` points along the curve, endpoints included.
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }
}
