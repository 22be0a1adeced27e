//! Baseline estimation and interactive window tuning.
//!
//! The baseline is the per-metric median over every contour seen in a run
//! of frames. Markers dominate that pool, so the median tracks them even
//! when some frames carry flicker or hand-motion contours.

use serde::{Deserialize, Serialize};

use joystick_core::{ContourDetector, ContourMetrics, ContourWindow, FrameSource, KeyCode};

use crate::error::{CalibrationError, SampleError};
use crate::params::{CalibrationParams, TuningLimits};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Median area and perimeter of the sampled contour population.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub area: f64,
    pub perimeter: f64,
}

impl Baseline {
    /// Window centred on this baseline with the initial tolerances.
    pub fn initial_window(&self, params: &CalibrationParams) -> ContourWindow {
        ContourWindow {
            area_baseline: self.area,
            area_tolerance: params.initial_area_tolerance,
            perimeter_baseline: self.perimeter,
            perimeter_tolerance: params.initial_perimeter_tolerance,
        }
    }
}

/// Median of `values` (mean of the two middle values for even counts).
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Per-metric median over the pooled samples.
pub fn estimate_baseline(samples: &[ContourMetrics]) -> Result<Baseline, SampleError> {
    let mut areas: Vec<f64> = samples.iter().map(|m| m.area).collect();
    let mut perimeters: Vec<f64> = samples.iter().map(|m| m.perimeter).collect();
    match (median(&mut areas), median(&mut perimeters)) {
        (Some(area), Some(perimeter)) => Ok(Baseline { area, perimeter }),
        _ => Err(SampleError::NoContours),
    }
}

/// Read `params.sample_frames` frames and estimate the baseline from every
/// contour they contain.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn sample_baseline<C: FrameSource + ?Sized>(
    camera: &mut C,
    detector: &ContourDetector,
    params: &CalibrationParams,
) -> Result<Baseline, CalibrationError> {
    let mut samples = Vec::new();
    for _ in 0..params.sample_frames {
        let frame = camera
            .read_frame()
            .ok_or(CalibrationError::CameraUnavailable)?;
        samples.extend(detector.detect_all(&frame).iter().map(|c| c.metrics));
    }
    let baseline = estimate_baseline(&samples)?;
    log::info!(
        "baseline from {} contours: area {:.1}, perimeter {:.1}",
        samples.len(),
        baseline.area,
        baseline.perimeter
    );
    Ok(baseline)
}

/// One operator adjustment of the contour window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuneAction {
    WidenArea,
    NarrowArea,
    WidenPerimeter,
    NarrowPerimeter,
    RaiseAreaBaseline,
    LowerAreaBaseline,
    RaisePerimeterBaseline,
    LowerPerimeterBaseline,
}

impl TuneAction {
    /// Keyboard mapping (case-insensitive): `w`/`s` area tolerance,
    /// `e`/`d` perimeter tolerance, `r`/`f` area baseline, `t`/`g`
    /// perimeter baseline.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        let action = match key.to_ascii_lowercase().as_char()? {
            'w' => TuneAction::WidenArea,
            's' => TuneAction::NarrowArea,
            'e' => TuneAction::WidenPerimeter,
            'd' => TuneAction::NarrowPerimeter,
            'r' => TuneAction::RaiseAreaBaseline,
            'f' => TuneAction::LowerAreaBaseline,
            't' => TuneAction::RaisePerimeterBaseline,
            'g' => TuneAction::LowerPerimeterBaseline,
            _ => return None,
        };
        Some(action)
    }

    /// Apply this adjustment, respecting the clamps in `limits`.
    pub fn apply(self, window: &mut ContourWindow, limits: &TuningLimits) {
        let (value, step, max) = match self {
            TuneAction::WidenArea | TuneAction::NarrowArea => (
                &mut window.area_tolerance,
                limits.area_tolerance_step,
                limits.max_tolerance,
            ),
            TuneAction::WidenPerimeter | TuneAction::NarrowPerimeter => (
                &mut window.perimeter_tolerance,
                limits.perimeter_tolerance_step,
                limits.max_tolerance,
            ),
            TuneAction::RaiseAreaBaseline | TuneAction::LowerAreaBaseline => (
                &mut window.area_baseline,
                limits.baseline_step,
                limits.max_baseline,
            ),
            TuneAction::RaisePerimeterBaseline | TuneAction::LowerPerimeterBaseline => (
                &mut window.perimeter_baseline,
                limits.baseline_step,
                limits.max_baseline,
            ),
        };
        if self.is_increase() {
            if *value < max {
                *value = (*value + step).min(max);
            }
        } else {
            *value = (*value - step).max(0.0);
        }
    }

    fn is_increase(self) -> bool {
        matches!(
            self,
            TuneAction::WidenArea
                | TuneAction::WidenPerimeter
                | TuneAction::RaiseAreaBaseline
                | TuneAction::RaisePerimeterBaseline
        )
    }
}
