//! Button layer of the video joystick.
//!
//! - [`CalibrationProfile`] / [`ProfileStore`]: the persisted result of
//!   calibration (contour window, region of interest, four reference
//!   centroids and their key bindings).
//! - [`ButtonMatcher`]: maps the qualifying contours of a frame onto the
//!   four slots; an occluded marker means a pressed button.

mod matcher;
mod profile;

/// Number of marker slots (buttons).
pub const NUM_BUTTONS: usize = 4;

pub use matcher::{match_markers, ButtonMatcher, ButtonSlot, ButtonStates, KeyAction, MatchParams};
pub use profile::{CalibrationProfile, ProfileError, ProfileStore, PROFILE_FORMAT_VERSION};
