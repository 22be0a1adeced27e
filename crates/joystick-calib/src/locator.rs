//! Region-of-interest and reference-centroid estimation.
//!
//! Runs a fixed number of frames with the tuned window. The qualifying
//! contours of one reference frame (late enough for the image to have
//! settled) become the four slot centroids; the bounding boxes of every
//! qualifying contour after it define the region of interest.

use std::cmp::Ordering;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use joystick_buttons::NUM_BUTTONS;
use joystick_core::{Contour, ContourDetector, ContourWindow, FrameSource, PixelRect, RegionOfInterest};

use crate::error::{CalibrationError, SampleError};
use crate::params::CalibrationParams;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Output of the locator: crop region and slot centroids relative to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerLayout {
    pub region_of_interest: RegionOfInterest,
    pub marker_centroids: [Point2<i32>; NUM_BUTTONS],
}

fn truncated(c: &Contour) -> Point2<i32> {
    Point2::new(c.centroid.x as i32, c.centroid.y as i32)
}

/// Slot order: left to right, then top to bottom, on the truncated
/// centroids; the float centroids break any remaining tie.
fn slot_order(a: &Contour, b: &Contour) -> Ordering {
    let (pa, pb) = (truncated(a), truncated(b));
    (pa.x, pa.y)
        .cmp(&(pb.x, pb.y))
        .then_with(|| a.centroid.x.total_cmp(&b.centroid.x))
        .then_with(|| a.centroid.y.total_cmp(&b.centroid.y))
}

/// Frame-absolute slot centroids from the reference frame's qualifying
/// contours, which must number exactly [`NUM_BUTTONS`].
pub fn reference_centroids(contours: &[Contour]) -> Result<[Point2<i32>; NUM_BUTTONS], SampleError> {
    if contours.len() != NUM_BUTTONS {
        return Err(SampleError::MarkerCount {
            expected: NUM_BUTTONS,
            found: contours.len(),
        });
    }
    let mut sorted: Vec<&Contour> = contours.iter().collect();
    sorted.sort_by(|a, b| slot_order(a, b));
    Ok(std::array::from_fn(|i| truncated(sorted[i])))
}

/// Union of `bounds`, grown by `margin` and clipped to the frame.
pub fn region_from_bounds<I>(
    bounds: I,
    margin: i32,
    frame_width: usize,
    frame_height: usize,
) -> Result<RegionOfInterest, SampleError>
where
    I: IntoIterator<Item = PixelRect>,
{
    let roi = RegionOfInterest::bounding(bounds)
        .ok_or(SampleError::NoMarkerBounds)?
        .expanded(margin)
        .clamped(frame_width, frame_height);
    if roi.is_empty() {
        return Err(SampleError::NoMarkerBounds);
    }
    Ok(roi)
}

/// Sample `params.sample_frames` frames and derive the marker layout.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn locate_markers<C: FrameSource + ?Sized>(
    camera: &mut C,
    detector: &ContourDetector,
    window: &ContourWindow,
    params: &CalibrationParams,
) -> Result<MarkerLayout, CalibrationError> {
    let mut reference = None;
    let mut bounds = Vec::new();

    for i in 0..params.sample_frames {
        let frame = camera
            .read_frame()
            .ok_or(CalibrationError::CameraUnavailable)?;
        if i < params.reference_frame {
            continue;
        }
        let qualifying = detector.detect_qualifying(&frame, window);
        if i == params.reference_frame {
            log::debug!("reference frame {i}: {} qualifying contours", qualifying.len());
            reference = Some(qualifying);
        } else {
            bounds.extend(qualifying.iter().map(|c| c.bounds));
        }
    }

    let centroids = reference_centroids(reference.as_deref().unwrap_or_default())?;
    let (width, height) = camera.frame_dimensions();
    let roi = region_from_bounds(bounds, params.roi_margin, width, height)?;
    let origin = Point2::new(roi.x0, roi.y0);
    let marker_centroids = centroids.map(|c| Point2::from(c - origin));

    log::info!("region of interest {roi:?}, marker centroids {marker_centroids:?}");
    Ok(MarkerLayout {
        region_of_interest: roi,
        marker_centroids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use joystick_core::ContourMetrics;

    fn contour(x: f64, y: f64) -> Contour {
        Contour {
            metrics: ContourMetrics {
                area: 400.0,
                perimeter: 80.0,
            },
            centroid: Point2::new(x, y),
            bounds: PixelRect::new(x as i32 - 10, y as i32 - 10, 20, 20),
        }
    }

    #[test]
    fn centroids_are_sorted_left_to_right() {
        let contours = vec![
            contour(300.7, 50.2),
            contour(100.9, 52.0),
            contour(200.1, 49.9),
            contour(400.0, 51.0),
        ];
        let c = reference_centroids(&contours).expect("four markers");
        assert_eq!(
            c,
            [
                Point2::new(100, 52),
                Point2::new(200, 49),
                Point2::new(300, 50),
                Point2::new(400, 51),
            ]
        );
    }

    #[test]
    fn equal_columns_sort_top_to_bottom() {
        let contours = vec![
            contour(50.0, 90.0),
            contour(50.0, 10.0),
            contour(10.0, 90.0),
            contour(10.0, 10.0),
        ];
        let c = reference_centroids(&contours).expect("four markers");
        assert_eq!(
            c,
            [
                Point2::new(10, 10),
                Point2::new(10, 90),
                Point2::new(50, 10),
                Point2::new(50, 90),
            ]
        );
    }

    #[test]
    fn wrong_marker_count_is_rejected() {
        let three = vec![contour(1.0, 1.0), contour(2.0, 2.0), contour(3.0, 3.0)];
        assert_eq!(
            reference_centroids(&three),
            Err(SampleError::MarkerCount {
                expected: 4,
                found: 3
            })
        );
        let mut five = three.clone();
        five.push(contour(4.0, 4.0));
        five.push(contour(5.0, 5.0));
        assert!(matches!(
            reference_centroids(&five),
            Err(SampleError::MarkerCount { found: 5, .. })
        ));
    }

    #[test]
    fn region_is_union_plus_margin_clamped() {
        let roi = region_from_bounds(
            [PixelRect::new(0, 0, 10, 10), PixelRect::new(90, 90, 10, 10)],
            50,
            100,
            100,
        )
        .expect("region");
        assert_eq!(roi, RegionOfInterest::new(0, 0, 100, 100));

        let roi = region_from_bounds([PixelRect::new(100, 80, 20, 20)], 50, 640, 480)
            .expect("region");
        assert_eq!(roi, RegionOfInterest::new(50, 30, 170, 150));
    }

    #[test]
    fn region_without_bounds_is_rejected() {
        assert_eq!(
            region_from_bounds(Vec::<PixelRect>::new(), 50, 100, 100),
            Err(SampleError::NoMarkerBounds)
        );
    }
}
