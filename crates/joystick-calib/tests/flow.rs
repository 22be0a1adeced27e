use std::collections::VecDeque;

use joystick_buttons::{ProfileStore, NUM_BUTTONS};
use joystick_calib::{calibrate, CalibrationError, CalibrationParams, CalibrationPhase, CalibrationSession};
use joystick_core::{
    ContourDetector, FrameSource, KeyCode, OperatorEvent, OperatorInput, PixelRect, RgbFrame,
};

const MARKER_X: [i32; NUM_BUTTONS] = [30, 80, 130, 180];

/// Board with four dark markers; from frame `cover_from` on, the leftmost
/// marker is hidden by the operator's finger. From frame `shrink_from` on
/// the camera delivers half-width frames.
struct Board {
    served: usize,
    cover_from: usize,
    shrink_from: usize,
}

impl Board {
    fn new(cover_from: usize) -> Self {
        Self {
            served: 0,
            cover_from,
            shrink_from: usize::MAX,
        }
    }
}

impl FrameSource for Board {
    fn read_frame(&mut self) -> Option<RgbFrame> {
        let covered = self.served >= self.cover_from;
        let shrunk = self.served >= self.shrink_from;
        self.served += 1;
        if shrunk {
            return Some(RgbFrame::filled(120, 100, [230, 230, 230]));
        }
        let mut frame = RgbFrame::filled(240, 100, [230, 230, 230]);
        for (i, &x) in MARKER_X.iter().enumerate() {
            if i == 0 && covered {
                continue;
            }
            frame.fill_rect(PixelRect::new(x, 40, 20, 20), [20, 20, 20]);
        }
        Some(frame)
    }

    fn frame_dimensions(&self) -> (usize, usize) {
        (240, 100)
    }
}

struct Script(VecDeque<Option<OperatorEvent>>);

impl OperatorInput for Script {
    fn poll(&mut self) -> Option<OperatorEvent> {
        self.0.pop_front().unwrap_or(Some(OperatorEvent::Exit))
    }
}

fn script(events: Vec<Option<OperatorEvent>>) -> Script {
    Script(events.into())
}

// Frame 0: position confirmed; frames 1-30: baseline; frame 31: window
// confirmed; frames 32-61: marker sampling; frame 62 on: key assignment.
const ASSIGN_FROM: usize = 62;

#[test]
fn calibration_binds_key_to_covered_marker_and_saves_profile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProfileStore::new(dir.path().join("calibration.json"));
    let events = vec![
        Some(OperatorEvent::Confirm),
        Some(OperatorEvent::Confirm),
        Some(OperatorEvent::Key(KeyCode::from_char('x'))),
        Some(OperatorEvent::Confirm),
    ];

    let profile = calibrate(
        Board::new(ASSIGN_FROM),
        script(events),
        CalibrationParams::default(),
        ContourDetector::default(),
        Default::default(),
        &store,
    )
    .expect("calibration succeeds");

    assert_eq!(
        profile.key_bindings,
        [
            KeyCode::from_char('x'),
            KeyCode::SPACE,
            KeyCode::SPACE,
            KeyCode::SPACE
        ]
    );
    let xs: Vec<i32> = profile.marker_centroids.iter().map(|c| c.x).collect();
    assert_eq!(xs, vec![39, 89, 139, 189]);
    approx::assert_relative_eq!(profile.window.area_tolerance, 250.0);
    approx::assert_relative_eq!(profile.window.perimeter_tolerance, 25.0);

    let loaded = store.load().expect("profile on disk");
    assert_eq!(loaded, profile);
}

#[test]
fn aborting_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProfileStore::new(dir.path().join("calibration.json"));
    let result = calibrate(
        Board::new(usize::MAX),
        script(vec![None, Some(OperatorEvent::Confirm), Some(OperatorEvent::Exit)]),
        CalibrationParams::default(),
        ContourDetector::default(),
        Default::default(),
        &store,
    );
    assert!(matches!(result, Err(CalibrationError::Aborted)));
    assert!(!store.path().exists());
}

#[test]
fn back_from_key_assignment_resamples_baseline() {
    let events = vec![
        Some(OperatorEvent::Confirm),
        Some(OperatorEvent::Confirm),
        Some(OperatorEvent::Back),
    ];
    let mut session = CalibrationSession::new(
        Board::new(usize::MAX),
        script(events),
        CalibrationParams::default(),
    );
    assert_eq!(session.step().expect("position"), CalibrationPhase::TuneContours);
    assert_eq!(session.step().expect("window"), CalibrationPhase::AssignKeys);
    assert_eq!(session.step().expect("back"), CalibrationPhase::TuneContours);
    let (board, _) = session.into_parts();
    assert_eq!(board.served, ASSIGN_FROM + 1 + 30);
}

#[test]
fn shrunken_frame_during_key_assignment_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProfileStore::new(dir.path().join("calibration.json"));
    let board = Board {
        shrink_from: ASSIGN_FROM,
        ..Board::new(usize::MAX)
    };
    let events = vec![
        Some(OperatorEvent::Confirm),
        Some(OperatorEvent::Confirm),
        Some(OperatorEvent::Confirm),
    ];
    let mut session = CalibrationSession::new(board, script(events.clone()), CalibrationParams::default());
    session.step().expect("position");
    assert_eq!(session.step().expect("window"), CalibrationPhase::AssignKeys);
    assert!(matches!(
        session.step(),
        Err(CalibrationError::RoiOutsideFrame {
            width: 120,
            height: 100
        })
    ));

    let result = calibrate(
        Board {
            shrink_from: ASSIGN_FROM,
            ..Board::new(usize::MAX)
        },
        script(events),
        CalibrationParams::default(),
        ContourDetector::default(),
        Default::default(),
        &store,
    );
    assert!(matches!(
        result,
        Err(CalibrationError::RoiOutsideFrame { width: 120, .. })
    ));
    assert!(!store.path().exists());
}
