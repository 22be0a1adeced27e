use joystick_buttons::ProfileError;

/// Why a batch of calibration frames could not be turned into parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("no contours found in any sampled frame")]
    NoContours,
    #[error("expected {expected} qualifying contours in the reference frame, found {found}")]
    MarkerCount { expected: usize, found: usize },
    #[error("no qualifying contours after the reference frame to bound the region of interest")]
    NoMarkerBounds,
}

/// Errors returned by the calibration flow.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("camera delivered no frame")]
    CameraUnavailable,
    #[error("invalid calibration sample: {0}")]
    InvalidCalibrationSample(#[from] SampleError),
    #[error("frame of {width}x{height} does not contain the calibrated region of interest")]
    RoiOutsideFrame { width: usize, height: usize },
    #[error("calibration aborted by the operator")]
    Aborted,
    #[error(transparent)]
    Profile(#[from] ProfileError),
}
