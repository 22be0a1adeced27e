//! Geometric measures of closed boundary polygons.

use nalgebra::Point2;

use crate::image::PixelRect;

/// Added to the zeroth moment before dividing, so degenerate (zero-area)
/// contours still produce a finite centroid.
pub const CENTROID_EPSILON: f64 = 0.1;

/// Spatial moments up to first order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Centroid `(m10, m01) / (m00 + CENTROID_EPSILON)`.
    pub fn centroid(&self) -> Point2<f64> {
        let mass = self.m00 + CENTROID_EPSILON;
        Point2::new(self.m10 / mass, self.m01 / mass)
    }
}

/// Iterate over the edges of a closed polygon, starting with `last -> first`.
fn closed_edges(points: &[Point2<i32>]) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
    let prev = points.iter().cycle().skip(points.len().saturating_sub(1));
    prev.zip(points.iter())
        .map(|(a, b)| (a.cast::<f64>(), b.cast::<f64>()))
}

/// Absolute polygon area (shoelace formula).
pub fn contour_area(points: &[Point2<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = closed_edges(points)
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() * 0.5
}

/// Length of the closed polyline through `points`.
pub fn arc_length(points: &[Point2<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    closed_edges(points).map(|(a, b)| (b - a).norm()).sum()
}

/// Polygon moments via Green's theorem, normalised to a positive `m00`.
///
/// Polygons with (near) zero area return all-zero moments.
pub fn polygon_moments(points: &[Point2<i32>]) -> Moments {
    if points.len() < 3 {
        return Moments::default();
    }
    let (mut a00, mut a10, mut a01) = (0f64, 0f64, 0f64);
    for (a, b) in closed_edges(points) {
        let cross = a.x * b.y - b.x * a.y;
        a00 += cross;
        a10 += cross * (a.x + b.x);
        a01 += cross * (a.y + b.y);
    }
    if a00.abs() <= f64::from(f32::EPSILON) {
        return Moments::default();
    }
    let sign = a00.signum();
    Moments {
        m00: sign * a00 / 2.0,
        m10: sign * a10 / 6.0,
        m01: sign * a01 / 6.0,
    }
}

/// Tight integer bounding box of the points (inclusive pixels).
pub fn bounding_rect(points: &[Point2<i32>]) -> PixelRect {
    let Some(first) = points.first() else {
        return PixelRect::new(0, 0, 0, 0);
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    PixelRect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: i32, y0: i32, side: i32) -> Vec<Point2<i32>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0, y0 + side),
            Point2::new(x0 + side, y0 + side),
            Point2::new(x0 + side, y0),
        ]
    }

    #[test]
    fn square_area_perimeter_and_centroid() {
        let pts = square(10, 20, 10);
        assert_relative_eq!(contour_area(&pts), 100.0);
        assert_relative_eq!(arc_length(&pts), 40.0);

        let m = polygon_moments(&pts);
        assert_relative_eq!(m.m00, 100.0);
        assert_relative_eq!(m.m10 / m.m00, 15.0, epsilon = 1e-12);
        assert_relative_eq!(m.m01 / m.m00, 25.0, epsilon = 1e-12);
    }

    #[test]
    fn orientation_does_not_change_measures() {
        let cw = square(0, 0, 4);
        let ccw: Vec<_> = cw.iter().rev().copied().collect();
        assert_eq!(contour_area(&cw), contour_area(&ccw));
        assert_eq!(polygon_moments(&cw), polygon_moments(&ccw));
    }

    #[test]
    fn centroid_is_damped_by_epsilon() {
        let m = polygon_moments(&square(0, 0, 10));
        let c = m.centroid();
        assert_relative_eq!(c.x, 500.0 / 100.1, epsilon = 1e-12);
        assert!(c.x < 5.0);
    }

    #[test]
    fn centroid_is_deterministic() {
        let pts = square(3, 7, 9);
        let a = polygon_moments(&pts).centroid();
        let b = polygon_moments(&pts).centroid();
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_polygons_have_zero_mass() {
        let line = vec![Point2::new(0, 0), Point2::new(5, 0), Point2::new(10, 0)];
        assert_eq!(contour_area(&line), 0.0);
        let m = polygon_moments(&line);
        assert_eq!(m, Moments::default());
        let c = m.centroid();
        assert!(c.x.is_finite() && c.y.is_finite());
        assert_relative_eq!(arc_length(&line), 20.0);
    }

    #[test]
    fn bounding_rect_counts_inclusive_pixels() {
        let pts = vec![Point2::new(3, 4), Point2::new(7, 4), Point2::new(5, 9)];
        assert_eq!(bounding_rect(&pts), PixelRect::new(3, 4, 5, 6));
        assert_eq!(bounding_rect(&[]), PixelRect::new(0, 0, 0, 0));
    }
}
