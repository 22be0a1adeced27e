//! Runtime loop: one frame in, one press/release set out.

use joystick_buttons::{
    ButtonMatcher, ButtonStates, CalibrationProfile, MatchParams, ProfileError, ProfileStore,
};
use joystick_core::{
    ContourDetector, FrameSource, KeyEmulator, OperatorEvent, OperatorInput, RgbFrame,
};

use crate::config::JoystickConfig;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("camera delivered no frame")]
    CameraUnavailable,
    #[error("cannot load calibration profile: {0}")]
    ProfileLoad(#[from] ProfileError),
    #[error("calibrated region of interest does not fit a {width}x{height} frame")]
    RoiOutsideFrame { width: usize, height: usize },
}

/// Calibrated detector and matcher, ready to process frames.
#[derive(Clone, Debug)]
pub struct JoystickRuntime {
    profile: CalibrationProfile,
    detector: ContourDetector,
    matcher: ButtonMatcher,
}

impl JoystickRuntime {
    pub fn new(
        profile: CalibrationProfile,
        detector: ContourDetector,
        match_params: MatchParams,
    ) -> Self {
        let matcher = profile.matcher(match_params);
        Self {
            profile,
            detector,
            matcher,
        }
    }

    /// Read the profile from `store`; a missing or mismatched profile is fatal.
    pub fn load(store: &ProfileStore, config: &JoystickConfig) -> Result<Self, RuntimeError> {
        let profile = store.load()?;
        Ok(Self::new(profile, config.detector(), config.matching))
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Presence of each slot in a full camera frame.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn states(&self, frame: &RgbFrame) -> Result<ButtonStates, RuntimeError> {
        let cropped = frame
            .crop(&self.profile.region_of_interest)
            .ok_or(RuntimeError::RoiOutsideFrame {
                width: frame.width,
                height: frame.height,
            })?;
        let qualifying = self
            .detector
            .detect_qualifying(&cropped, &self.profile.window);
        log::debug!("{} qualifying contours", qualifying.len());
        Ok(self.matcher.states(&qualifying))
    }

    /// Detect and emit this frame's press/release set.
    pub fn process<K: KeyEmulator + ?Sized>(
        &self,
        frame: &RgbFrame,
        keys: &mut K,
    ) -> Result<ButtonStates, RuntimeError> {
        let states = self.states(frame)?;
        log::debug!(
            "pressed [{}]",
            states
                .pressed()
                .map(|i| self.profile.key_bindings[i].to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        self.matcher.emit(&states, keys);
        Ok(states)
    }

    /// Release every bound key once.
    pub fn release_all<K: KeyEmulator + ?Sized>(&self, keys: &mut K) {
        let mut released = Vec::with_capacity(self.profile.key_bindings.len());
        for key in self.profile.key_bindings {
            if !released.contains(&key) {
                keys.release(key);
                released.push(key);
            }
        }
    }

    /// Frame loop until the operator exits.
    ///
    /// Keys are released before returning, on success and on error.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run<C, I, K>(&self, camera: &mut C, input: &mut I, keys: &mut K) -> Result<(), RuntimeError>
    where
        C: FrameSource + ?Sized,
        I: OperatorInput + ?Sized,
        K: KeyEmulator + ?Sized,
    {
        let (width, height) = camera.frame_dimensions();
        if !self.profile.fits_frame(width, height) {
            return Err(RuntimeError::RoiOutsideFrame { width, height });
        }

        let result = self.frame_loop(camera, input, keys);
        self.release_all(keys);
        result
    }

    fn frame_loop<C, I, K>(&self, camera: &mut C, input: &mut I, keys: &mut K) -> Result<(), RuntimeError>
    where
        C: FrameSource + ?Sized,
        I: OperatorInput + ?Sized,
        K: KeyEmulator + ?Sized,
    {
        let mut frames = 0usize;
        loop {
            let frame = camera.read_frame().ok_or(RuntimeError::CameraUnavailable)?;
            self.process(&frame, keys)?;
            frames += 1;
            match input.poll() {
                Some(OperatorEvent::Exit) => {
                    log::info!("exit after {frames} frames");
                    return Ok(());
                }
                Some(other) => log::debug!("ignoring {other:?} while running"),
                None => {}
            }
        }
    }
}

/// Load the profile from `store` and run the frame loop.
pub fn run_joystick<C, I, K>(
    store: &ProfileStore,
    config: &JoystickConfig,
    mut camera: C,
    mut input: I,
    mut keys: K,
) -> Result<(), RuntimeError>
where
    C: FrameSource,
    I: OperatorInput,
    K: KeyEmulator,
{
    JoystickRuntime::load(store, config)?.run(&mut camera, &mut input, &mut keys)
}
