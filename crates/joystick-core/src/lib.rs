//! Vision core of the video joystick.
//!
//! Turns camera frames into measured marker contours:
//! RGB frame -> luma -> median filter -> inverted Otsu threshold ->
//! Suzuki border following -> area / perimeter / centroid -> window filter.
//!
//! The crate also defines the collaborator traits (camera, key emulation,
//! operator input) shared by calibration and the runtime loop. It does not
//! depend on any concrete image or device library.

mod classify;
mod contour;
mod devices;
mod image;
mod logger;
mod preprocess;
mod shape;

pub use classify::{
    classify, extract_contours, Contour, ContourDetector, ContourMetrics, ContourWindow,
};
pub use contour::{find_contours, ContourTrace};
pub use devices::{FrameSource, KeyCode, KeyEmulator, OperatorEvent, OperatorInput};
pub use image::{GrayImage, GrayImageView, PixelRect, RegionOfInterest, RgbFrame};
pub use preprocess::{
    binarize, grayscale, median_blur, otsu_threshold, threshold_inv, PreprocessParams,
};
pub use shape::{
    arc_length, bounding_rect, contour_area, polygon_moments, Moments, CENTROID_EPSILON,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
