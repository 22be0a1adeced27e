//! Persisted calibration profile and its JSON store.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use joystick_core::{ContourWindow, KeyCode, RegionOfInterest};

use crate::matcher::{ButtonMatcher, ButtonSlot, MatchParams};
use crate::NUM_BUTTONS;

/// Version written into every profile; older or newer files are rejected.
pub const PROFILE_FORMAT_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error("cannot access calibration profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed calibration profile: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported calibration profile version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("invalid calibration profile: {reason}")]
    Invalid { reason: String },
}

fn invalid(reason: impl Into<String>) -> ProfileError {
    ProfileError::Invalid {
        reason: reason.into(),
    }
}

/// Everything the runtime loop needs, produced once by calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationProfile {
    pub format_version: u32,
    /// Area/perimeter acceptance window for marker contours.
    pub window: ContourWindow,
    /// Crop applied to every runtime frame, in frame coordinates.
    pub region_of_interest: RegionOfInterest,
    /// Reference marker centroids relative to the region-of-interest origin,
    /// index-aligned with `key_bindings`.
    pub marker_centroids: [Point2<i32>; NUM_BUTTONS],
    pub key_bindings: [KeyCode; NUM_BUTTONS],
}

impl CalibrationProfile {
    pub fn new(
        window: ContourWindow,
        region_of_interest: RegionOfInterest,
        marker_centroids: [Point2<i32>; NUM_BUTTONS],
        key_bindings: [KeyCode; NUM_BUTTONS],
    ) -> Self {
        Self {
            format_version: PROFILE_FORMAT_VERSION,
            window,
            region_of_interest,
            marker_centroids,
            key_bindings,
        }
    }

    /// Check the frame-independent invariants.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.format_version != PROFILE_FORMAT_VERSION {
            return Err(ProfileError::UnsupportedVersion {
                found: self.format_version,
                expected: PROFILE_FORMAT_VERSION,
            });
        }
        let w = &self.window;
        let finite = [
            w.area_baseline,
            w.area_tolerance,
            w.perimeter_baseline,
            w.perimeter_tolerance,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(invalid("contour window contains non-finite values"));
        }
        if w.area_tolerance < 0.0 || w.perimeter_tolerance < 0.0 {
            return Err(invalid("tolerances must be non-negative"));
        }
        let roi = &self.region_of_interest;
        if roi.is_empty() || roi.x0 < 0 || roi.y0 < 0 {
            return Err(invalid(format!("region of interest {roi:?} is empty or negative")));
        }
        Ok(())
    }

    /// True when the region of interest lies inside a `width x height` frame.
    pub fn fits_frame(&self, width: usize, height: usize) -> bool {
        self.region_of_interest.fits_within(width, height)
    }

    pub fn slots(&self) -> [ButtonSlot; NUM_BUTTONS] {
        std::array::from_fn(|i| ButtonSlot {
            centroid: self.marker_centroids[i],
            key: self.key_bindings[i],
        })
    }

    pub fn matcher(&self, params: MatchParams) -> ButtonMatcher {
        ButtonMatcher::new(self.slots(), params)
    }

    /// Parse and validate a profile from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(raw)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String, ProfileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// File-backed location of a single calibration profile.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Default file name, relative to the working directory.
    pub const DEFAULT_FILE: &'static str = "calibration.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the stored profile.
    pub fn load(&self) -> Result<CalibrationProfile, ProfileError> {
        let raw = fs::read_to_string(&self.path)?;
        let profile = CalibrationProfile::from_json(&raw)?;
        log::info!("loaded calibration profile from {}", self.path.display());
        Ok(profile)
    }

    /// Validate and write `profile` as pretty JSON, replacing any previous one.
    pub fn save(&self, profile: &CalibrationProfile) -> Result<(), ProfileError> {
        profile.validate()?;
        fs::write(&self.path, profile.to_json()?)?;
        log::info!("wrote calibration profile to {}", self.path.display());
        Ok(())
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FILE)
    }
}
