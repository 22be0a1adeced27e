//! Contour measurement and classification against a calibrated
//! area/perimeter window.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::contour::find_contours;
use crate::image::{GrayImageView, PixelRect, RgbFrame};
use crate::preprocess::{binarize, PreprocessParams};
use crate::shape::{arc_length, bounding_rect, contour_area, polygon_moments};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Area and perimeter of one contour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourMetrics {
    pub area: f64,
    pub perimeter: f64,
}

/// A measured closed contour.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    pub metrics: ContourMetrics,
    /// Moment centroid (epsilon-guarded), in the coordinates of the traced image.
    pub centroid: Point2<f64>,
    pub bounds: PixelRect,
}

impl Contour {
    pub fn from_points(points: &[Point2<i32>]) -> Self {
        Self {
            metrics: ContourMetrics {
                area: contour_area(points),
                perimeter: arc_length(points),
            },
            centroid: polygon_moments(points).centroid(),
            bounds: bounding_rect(points),
        }
    }
}

/// Acceptance window for marker contours: `baseline ± tolerance` on both
/// area and perimeter, bounds excluded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContourWindow {
    pub area_baseline: f64,
    pub area_tolerance: f64,
    pub perimeter_baseline: f64,
    pub perimeter_tolerance: f64,
}

impl ContourWindow {
    pub fn accepts(&self, metrics: &ContourMetrics) -> bool {
        let in_open = |v: f64, center: f64, tol: f64| center - tol < v && v < center + tol;
        in_open(metrics.area, self.area_baseline, self.area_tolerance)
            && in_open(
                metrics.perimeter,
                self.perimeter_baseline,
                self.perimeter_tolerance,
            )
    }
}

/// Trace and measure every contour of a binary image.
pub fn extract_contours(binary: &GrayImageView<'_>) -> Vec<Contour> {
    find_contours(binary)
        .iter()
        .map(|t| Contour::from_points(&t.points))
        .collect()
}

/// Keep only the contours accepted by `window`, preserving order.
pub fn classify(contours: Vec<Contour>, window: &ContourWindow) -> Vec<Contour> {
    contours
        .into_iter()
        .filter(|c| window.accepts(&c.metrics))
        .collect()
}

/// Per-frame marker contour detector.
///
/// Calibration and runtime both go through this type so that a frame is
/// classified identically in either path.
#[derive(Clone, Debug, Default)]
pub struct ContourDetector {
    params: PreprocessParams,
}

impl ContourDetector {
    pub fn new(params: PreprocessParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PreprocessParams {
        &self.params
    }

    /// All contours of the frame, unfiltered.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn detect_all(&self, frame: &RgbFrame) -> Vec<Contour> {
        let binary = binarize(frame, &self.params);
        let contours = extract_contours(&binary.view());
        log::trace!("traced {} contours", contours.len());
        contours
    }

    /// Contours of the frame accepted by `window`.
    pub fn detect_qualifying(&self, frame: &RgbFrame, window: &ContourWindow) -> Vec<Contour> {
        classify(self.detect_all(frame), window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> ContourWindow {
        ContourWindow {
            area_baseline: 1000.0,
            area_tolerance: 100.0,
            perimeter_baseline: 120.0,
            perimeter_tolerance: 10.0,
        }
    }

    fn metrics(area: f64, perimeter: f64) -> ContourMetrics {
        ContourMetrics { area, perimeter }
    }

    #[test]
    fn window_is_open_on_both_metrics() {
        let w = window();
        assert!(w.accepts(&metrics(1000.0, 120.0)));
        assert!(w.accepts(&metrics(900.5, 129.9)));
        assert!(!w.accepts(&metrics(900.0, 120.0)));
        assert!(!w.accepts(&metrics(1100.0, 120.0)));
        assert!(!w.accepts(&metrics(1000.0, 110.0)));
        assert!(!w.accepts(&metrics(1000.0, 130.0)));
        assert!(!w.accepts(&metrics(1000.0, 200.0)));
    }

    #[test]
    fn zero_tolerance_accepts_nothing() {
        let w = ContourWindow {
            area_tolerance: 0.0,
            ..window()
        };
        assert!(!w.accepts(&metrics(1000.0, 120.0)));
    }

    #[test]
    fn detector_finds_dark_squares() {
        let mut frame = RgbFrame::filled(120, 60, [230, 230, 230]);
        frame.fill_rect(PixelRect::new(20, 20, 20, 20), [20, 20, 20]);
        frame.fill_rect(PixelRect::new(80, 20, 20, 20), [20, 20, 20]);

        let detector = ContourDetector::default();
        let all = detector.detect_all(&frame);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].metrics, all[1].metrics);
        assert_eq!(all[0].bounds, PixelRect::new(20, 20, 20, 20));

        let c = all[0].centroid;
        assert!((c.x - 29.5).abs() < 0.1 && (c.y - 29.5).abs() < 0.1, "{c:?}");

        let w = ContourWindow {
            area_baseline: all[0].metrics.area,
            area_tolerance: 50.0,
            perimeter_baseline: all[0].metrics.perimeter,
            perimeter_tolerance: 10.0,
        };
        assert_eq!(detector.detect_qualifying(&frame, &w).len(), 2);

        let narrow = ContourWindow {
            area_baseline: all[0].metrics.area + 100.0,
            ..w
        };
        assert!(detector.detect_qualifying(&frame, &narrow).is_empty());
    }
}
