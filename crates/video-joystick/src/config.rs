use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use joystick_buttons::MatchParams;
use joystick_calib::CalibrationParams;
use joystick_core::{ContourDetector, PreprocessParams};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunable constants of the whole pipeline.
///
/// Every section is optional in JSON; missing fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    pub preprocess: PreprocessParams,
    pub calibration: CalibrationParams,
    pub matching: MatchParams,
}

impl JoystickConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn detector(&self) -> ContourDetector {
        ContourDetector::new(self.preprocess)
    }
}
