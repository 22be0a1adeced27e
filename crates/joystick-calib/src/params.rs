use serde::{Deserialize, Serialize};

/// Discrete steps and clamps for interactive window tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningLimits {
    pub area_tolerance_step: f64,
    pub perimeter_tolerance_step: f64,
    /// Step for both baselines.
    pub baseline_step: f64,
    /// Upper clamp for both tolerances (lower clamp is 0).
    pub max_tolerance: f64,
    /// Upper clamp for both baselines (lower clamp is 0).
    pub max_baseline: f64,
}

impl Default for TuningLimits {
    fn default() -> Self {
        Self {
            area_tolerance_step: 50.0,
            perimeter_tolerance_step: 25.0,
            baseline_step: 50.0,
            max_tolerance: 3000.0,
            max_baseline: 9000.0,
        }
    }
}

/// Calibration settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Frames sampled by the baseline estimator and by the marker locator.
    pub sample_frames: usize,
    /// Locator frame whose qualifying contours become the slot centroids;
    /// later frames contribute to the region of interest.
    pub reference_frame: usize,
    /// Margin (pixels) added around the marker bounds.
    pub roi_margin: i32,
    pub initial_area_tolerance: f64,
    pub initial_perimeter_tolerance: f64,
    pub tuning: TuningLimits,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            sample_frames: 30,
            reference_frame: 20,
            roi_margin: 50,
            initial_area_tolerance: 250.0,
            initial_perimeter_tolerance: 25.0,
            tuning: TuningLimits::default(),
        }
    }
}
