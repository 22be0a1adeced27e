//! Facade crate for the video joystick.
//!
//! A camera watches a surface with four paper markers. Covering a marker
//! presses the key bound to it; uncovering it releases the key.
//!
//! This crate provides:
//! - re-exports of the vision core, the button layer and calibration;
//! - [`JoystickRuntime`]: the per-frame loop that turns a calibrated
//!   profile into key presses;
//! - replay collaborators (feature `image`): an image-directory camera, a
//!   scripted operator and a key emulator that prints to stdout;
//! - [`JoystickConfig`]: the JSON overrides accepted by the CLI.
//!
//! ## Quickstart
//!
//! ```no_run
//! use video_joystick::replay::{ImageDirSource, PrintingKeyboard, ScriptedInput};
//! use video_joystick::{run_joystick, JoystickConfig};
//! use video_joystick::buttons::ProfileStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let camera = ImageDirSource::open("frames", false)?;
//! let input = ScriptedInput::parse("wait:100")?;
//! let store = ProfileStore::default();
//! run_joystick(&store, &JoystickConfig::default(), camera, input, PrintingKeyboard::stdout())?;
//! # Ok(())
//! # }
//! ```

pub use joystick_buttons as buttons;
pub use joystick_calib as calib;
pub use joystick_core as core;

pub use joystick_buttons::{CalibrationProfile, ProfileStore};
pub use joystick_core::{FrameSource, KeyCode, KeyEmulator, OperatorEvent, OperatorInput};

mod config;
mod runtime;

#[cfg(feature = "image")]
pub mod replay;

pub use config::{ConfigError, JoystickConfig};
pub use runtime::{run_joystick, JoystickRuntime, RuntimeError};
