//! Calibration for the video joystick.
//!
//! The flow is an explicit state machine:
//! `SelectPosition -> TuneContours -> AssignKeys -> Done`.
//!
//! - entering `TuneContours` samples frames and sets the contour window
//!   baseline to the median area/perimeter ([`sample_baseline`]);
//! - confirming the tuned window samples frames again to find the region of
//!   interest and the four reference centroids ([`locate_markers`]);
//! - `AssignKeys` binds a key to every slot whose marker is currently covered;
//! - `Done` holds the finished [`CalibrationProfile`](joystick_buttons::CalibrationProfile).

mod error;
mod estimator;
mod flow;
mod locator;
mod params;

pub use error::{CalibrationError, SampleError};
pub use estimator::{estimate_baseline, median, sample_baseline, Baseline, TuneAction};
pub use flow::{calibrate, CalibrationPhase, CalibrationSession, CalibrationState};
pub use locator::{locate_markers, reference_centroids, region_from_bounds, MarkerLayout};
pub use params::{CalibrationParams, TuningLimits};
