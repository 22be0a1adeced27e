//! Calibration state machine.
//!
//! Each [`CalibrationSession::step`] reads one frame, processes it for the
//! current phase, polls one operator event and moves to the next state.

use joystick_buttons::{
    ButtonMatcher, ButtonSlot, CalibrationProfile, MatchParams, ProfileStore, NUM_BUTTONS,
};
use joystick_core::{
    ContourDetector, ContourWindow, FrameSource, KeyCode, OperatorEvent, OperatorInput, RgbFrame,
};

use crate::error::CalibrationError;
use crate::estimator::{sample_baseline, TuneAction};
use crate::locator::{locate_markers, MarkerLayout};
use crate::params::CalibrationParams;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Phase identifier, without the data carried by [`CalibrationState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalibrationPhase {
    SelectPosition,
    TuneContours,
    AssignKeys,
    Done,
}

/// Calibration state together with the profile data gathered so far.
#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationState {
    /// The operator frames the camera.
    SelectPosition,
    /// The operator tunes the contour window around the estimated baseline.
    TuneContours { window: ContourWindow },
    /// The operator binds keys to covered markers.
    AssignKeys {
        window: ContourWindow,
        layout: MarkerLayout,
        keys: [KeyCode; NUM_BUTTONS],
    },
    Done(CalibrationProfile),
}

impl CalibrationState {
    pub fn phase(&self) -> CalibrationPhase {
        match self {
            CalibrationState::SelectPosition => CalibrationPhase::SelectPosition,
            CalibrationState::TuneContours { .. } => CalibrationPhase::TuneContours,
            CalibrationState::AssignKeys { .. } => CalibrationPhase::AssignKeys,
            CalibrationState::Done(_) => CalibrationPhase::Done,
        }
    }
}

/// Interactive calibration over a camera and an operator input.
pub struct CalibrationSession<C, I> {
    camera: C,
    input: I,
    detector: ContourDetector,
    params: CalibrationParams,
    match_params: MatchParams,
    state: CalibrationState,
}

impl<C: FrameSource, I: OperatorInput> CalibrationSession<C, I> {
    pub fn new(camera: C, input: I, params: CalibrationParams) -> Self {
        Self {
            camera,
            input,
            detector: ContourDetector::default(),
            params,
            match_params: MatchParams::default(),
            state: CalibrationState::SelectPosition,
        }
    }

    /// Use a detector with custom preprocessing.
    pub fn with_detector(mut self, detector: ContourDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Use custom marker matching in the key-assignment phase.
    pub fn with_match_params(mut self, match_params: MatchParams) -> Self {
        self.match_params = match_params;
        self
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.state.phase()
    }

    /// Give the camera and input back to the caller.
    pub fn into_parts(self) -> (C, I) {
        (self.camera, self.input)
    }

    /// Run one iteration of the current phase.
    ///
    /// On error the session is left in `SelectPosition`.
    pub fn step(&mut self) -> Result<CalibrationPhase, CalibrationError> {
        let state = std::mem::replace(&mut self.state, CalibrationState::SelectPosition);
        let before = state.phase();
        let next = match state {
            CalibrationState::SelectPosition => self.select_position()?,
            CalibrationState::TuneContours { window } => self.tune_contours(window)?,
            CalibrationState::AssignKeys {
                window,
                layout,
                keys,
            } => self.assign_keys(window, layout, keys)?,
            done @ CalibrationState::Done(_) => done,
        };
        if next.phase() != before {
            log::info!("calibration: {:?} -> {:?}", before, next.phase());
        }
        self.state = next;
        Ok(self.state.phase())
    }

    /// Step until the profile is complete.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run(&mut self) -> Result<CalibrationProfile, CalibrationError> {
        loop {
            if let CalibrationState::Done(profile) = &self.state {
                return Ok(profile.clone());
            }
            self.step()?;
        }
    }

    fn read_frame(&mut self) -> Result<RgbFrame, CalibrationError> {
        self.camera
            .read_frame()
            .ok_or(CalibrationError::CameraUnavailable)
    }

    /// Estimate a fresh baseline; stays in `SelectPosition` if the frames
    /// hold no contours at all.
    fn enter_tune_contours(&mut self) -> Result<CalibrationState, CalibrationError> {
        match sample_baseline(&mut self.camera, &self.detector, &self.params) {
            Ok(baseline) => Ok(CalibrationState::TuneContours {
                window: baseline.initial_window(&self.params),
            }),
            Err(CalibrationError::InvalidCalibrationSample(e)) => {
                log::warn!("cannot estimate contour baseline: {e}");
                Ok(CalibrationState::SelectPosition)
            }
            Err(e) => Err(e),
        }
    }

    fn select_position(&mut self) -> Result<CalibrationState, CalibrationError> {
        let _frame = self.read_frame()?;
        match self.input.poll() {
            Some(OperatorEvent::Confirm) => self.enter_tune_contours(),
            Some(OperatorEvent::Exit) => Err(CalibrationError::Aborted),
            _ => Ok(CalibrationState::SelectPosition),
        }
    }

    fn tune_contours(
        &mut self,
        mut window: ContourWindow,
    ) -> Result<CalibrationState, CalibrationError> {
        let frame = self.read_frame()?;
        let qualifying = self.detector.detect_qualifying(&frame, &window);
        log::debug!("{} qualifying contours", qualifying.len());

        match self.input.poll() {
            Some(OperatorEvent::Key(key)) => {
                if let Some(action) = TuneAction::from_key(key) {
                    action.apply(&mut window, &self.params.tuning);
                    log::info!(
                        "window: area {:.0} ~ {:.0}, perimeter {:.0} ~ {:.0}",
                        window.area_baseline - window.area_tolerance,
                        window.area_baseline + window.area_tolerance,
                        window.perimeter_baseline - window.perimeter_tolerance,
                        window.perimeter_baseline + window.perimeter_tolerance
                    );
                }
                Ok(CalibrationState::TuneContours { window })
            }
            Some(OperatorEvent::Confirm) => {
                match locate_markers(&mut self.camera, &self.detector, &window, &self.params) {
                    Ok(layout) => Ok(CalibrationState::AssignKeys {
                        window,
                        layout,
                        keys: [KeyCode::default(); NUM_BUTTONS],
                    }),
                    Err(CalibrationError::InvalidCalibrationSample(e)) => {
                        log::warn!("marker sampling failed, retune and confirm again: {e}");
                        Ok(CalibrationState::TuneContours { window })
                    }
                    Err(e) => Err(e),
                }
            }
            Some(OperatorEvent::Back) => Ok(CalibrationState::SelectPosition),
            Some(OperatorEvent::Exit) => Err(CalibrationError::Aborted),
            None => Ok(CalibrationState::TuneContours { window }),
        }
    }

    fn assign_keys(
        &mut self,
        window: ContourWindow,
        layout: MarkerLayout,
        mut keys: [KeyCode; NUM_BUTTONS],
    ) -> Result<CalibrationState, CalibrationError> {
        let frame = self.read_frame()?;
        let roi = layout.region_of_interest;
        let cropped = frame
            .crop(&roi)
            .ok_or(CalibrationError::RoiOutsideFrame {
                width: frame.width,
                height: frame.height,
            })?;
        let qualifying = self.detector.detect_qualifying(&cropped, &window);
        let slots: [ButtonSlot; NUM_BUTTONS] = std::array::from_fn(|i| ButtonSlot {
            centroid: layout.marker_centroids[i],
            key: keys[i],
        });
        let states = ButtonMatcher::new(slots, self.match_params).states(&qualifying);

        match self.input.poll() {
            Some(OperatorEvent::Key(key)) => {
                for slot in states.pressed() {
                    keys[slot] = key;
                    log::info!("slot {slot} bound to '{key}'");
                }
                Ok(CalibrationState::AssignKeys {
                    window,
                    layout,
                    keys,
                })
            }
            Some(OperatorEvent::Confirm) => Ok(CalibrationState::Done(CalibrationProfile::new(
                window,
                roi,
                layout.marker_centroids,
                keys,
            ))),
            Some(OperatorEvent::Back) => self.enter_tune_contours(),
            Some(OperatorEvent::Exit) => Err(CalibrationError::Aborted),
            None => Ok(CalibrationState::AssignKeys {
                window,
                layout,
                keys,
            }),
        }
    }
}

/// Run a full calibration and write the resulting profile to `store` once.
pub fn calibrate<C, I>(
    camera: C,
    input: I,
    params: CalibrationParams,
    detector: ContourDetector,
    match_params: MatchParams,
    store: &ProfileStore,
) -> Result<CalibrationProfile, CalibrationError>
where
    C: FrameSource,
    I: OperatorInput,
{
    let mut session = CalibrationSession::new(camera, input, params)
        .with_detector(detector)
        .with_match_params(match_params);
    let profile = session.run()?;
    store.save(&profile)?;
    Ok(profile)
}
