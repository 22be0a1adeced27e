//! Occlusion-based button matching.
//!
//! A slot whose calibrated marker is visible near its reference position is
//! *present* (released); a slot with no nearby marker is *occluded* (pressed).
//! Evaluation is level-triggered: every frame yields a full press/release set.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use joystick_core::{Contour, KeyCode, KeyEmulator};

use crate::NUM_BUTTONS;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Matching settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// A contour centroid closer than this (pixels) marks a slot present.
    pub proximity_px: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self { proximity_px: 6.0 }
    }
}

/// One logical button: calibrated marker position and bound key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonSlot {
    /// Reference centroid, relative to the region of interest.
    pub centroid: Point2<i32>,
    pub key: KeyCode,
}

/// Per-frame marker presence of the four slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonStates {
    present: [bool; NUM_BUTTONS],
}

impl ButtonStates {
    pub fn from_present(present: [bool; NUM_BUTTONS]) -> Self {
        Self { present }
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.present[slot]
    }

    /// Occluded slots are pressed.
    pub fn is_pressed(&self, slot: usize) -> bool {
        !self.present[slot]
    }

    pub fn present(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NUM_BUTTONS).filter(|&i| self.present[i])
    }

    pub fn pressed(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NUM_BUTTONS).filter(|&i| !self.present[i])
    }

    pub fn any_pressed(&self) -> bool {
        self.present.iter().any(|p| !p)
    }
}

/// Key emulation request for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press(KeyCode),
    Release(KeyCode),
}

impl KeyAction {
    pub fn apply<K: KeyEmulator + ?Sized>(self, keys: &mut K) {
        match self {
            KeyAction::Press(k) => keys.press(k),
            KeyAction::Release(k) => keys.release(k),
        }
    }
}

/// Mark every slot whose reference centroid lies strictly within
/// `proximity_px` of some observed centroid.
pub fn match_markers<I>(
    observed: I,
    references: &[Point2<i32>; NUM_BUTTONS],
    params: &MatchParams,
) -> ButtonStates
where
    I: IntoIterator<Item = Point2<f64>>,
{
    let mut present = [false; NUM_BUTTONS];
    for c in observed {
        for (slot, r) in references.iter().enumerate() {
            if (r.cast::<f64>() - c).norm() < params.proximity_px {
                present[slot] = true;
            }
        }
    }
    ButtonStates { present }
}

/// Maps detected contours to the four calibrated button slots.
#[derive(Clone, Debug)]
pub struct ButtonMatcher {
    slots: [ButtonSlot; NUM_BUTTONS],
    params: MatchParams,
}

impl ButtonMatcher {
    pub fn new(slots: [ButtonSlot; NUM_BUTTONS], params: MatchParams) -> Self {
        Self { slots, params }
    }

    pub fn slots(&self) -> &[ButtonSlot; NUM_BUTTONS] {
        &self.slots
    }

    /// Presence of each slot given the qualifying contours of a frame
    /// (coordinates relative to the region of interest).
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(contours = contours.len())))]
    pub fn states(&self, contours: &[Contour]) -> ButtonStates {
        let references = self.slots.map(|s| s.centroid);
        match_markers(contours.iter().map(|c| c.centroid), &references, &self.params)
    }

    /// Releases for present slots followed by presses for occluded ones, so
    /// a key shared by several slots ends up pressed if any of them is.
    pub fn actions(&self, states: &ButtonStates) -> Vec<KeyAction> {
        let releases = states
            .present()
            .map(|i| KeyAction::Release(self.slots[i].key));
        let presses = states.pressed().map(|i| KeyAction::Press(self.slots[i].key));
        releases.chain(presses).collect()
    }

    /// Send this frame's press/release set to the key emulator.
    pub fn emit<K: KeyEmulator + ?Sized>(&self, states: &ButtonStates, keys: &mut K) {
        for action in self.actions(states) {
            action.apply(keys);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joystick_core::{ContourMetrics, PixelRect};

    fn refs() -> [Point2<i32>; NUM_BUTTONS] {
        [
            Point2::new(10, 10),
            Point2::new(40, 10),
            Point2::new(70, 10),
            Point2::new(100, 10),
        ]
    }

    fn contour_at(x: f64, y: f64) -> Contour {
        Contour {
            metrics: ContourMetrics {
                area: 100.0,
                perimeter: 40.0,
            },
            centroid: Point2::new(x, y),
            bounds: PixelRect::new(0, 0, 1, 1),
        }
    }

    fn matcher() -> ButtonMatcher {
        let keys = ['a', 'b', 'c', 'd'];
        let slots = std::array::from_fn(|i| ButtonSlot {
            centroid: refs()[i],
            key: KeyCode::from_char(keys[i]),
        });
        ButtonMatcher::new(slots, MatchParams::default())
    }

    #[test]
    fn proximity_threshold_is_strict() {
        let r = refs();
        let near = match_markers([Point2::new(15.9, 10.0)], &r, &MatchParams::default());
        assert!(near.is_present(0));

        let at = match_markers([Point2::new(16.0, 10.0)], &r, &MatchParams::default());
        assert!(at.is_pressed(0));

        let diagonal = match_markers(
            [Point2::new(10.0 + 5.9 * 0.6, 10.0 + 5.9 * 0.8)],
            &r,
            &MatchParams::default(),
        );
        assert!(diagonal.is_present(0));
    }

    #[test]
    fn present_and_pressed_partition_all_slots() {
        let m = matcher();
        let contours = vec![contour_at(10.5, 9.5), contour_at(70.0, 12.0), contour_at(300.0, 300.0)];
        let states = m.states(&contours);
        let present: Vec<_> = states.present().collect();
        let pressed: Vec<_> = states.pressed().collect();
        assert_eq!(present, vec![0, 2]);
        assert_eq!(pressed, vec![1, 3]);
        assert_eq!(present.len() + pressed.len(), NUM_BUTTONS);
    }

    #[test]
    fn one_occluded_slot_presses_exactly_its_key() {
        let m = matcher();
        let contours = vec![
            contour_at(10.0, 10.0),
            contour_at(40.0, 10.0),
            contour_at(100.0, 10.0),
        ];
        let states = m.states(&contours);
        let actions = m.actions(&states);
        let presses: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, KeyAction::Press(_)))
            .collect();
        assert_eq!(presses, vec![&KeyAction::Press(KeyCode::from_char('c'))]);
        assert_eq!(actions.len() - presses.len(), 3);
    }

    #[test]
    fn matching_is_idempotent() {
        let m = matcher();
        let contours = vec![contour_at(40.0, 10.0), contour_at(100.0, 11.0)];
        let first = m.actions(&m.states(&contours));
        let second = m.actions(&m.states(&contours));
        assert_eq!(first, second);
    }

    #[test]
    fn no_contours_presses_everything() {
        let m = matcher();
        let states = m.states(&[]);
        assert!(states.any_pressed());
        assert_eq!(states.pressed().count(), NUM_BUTTONS);
    }

    #[test]
    fn shared_key_ends_pressed() {
        #[derive(Default)]
        struct Held(Vec<KeyCode>);
        impl KeyEmulator for Held {
            fn press(&mut self, key: KeyCode) {
                if !self.0.contains(&key) {
                    self.0.push(key);
                }
            }
            fn release(&mut self, key: KeyCode) {
                self.0.retain(|k| *k != key);
            }
        }

        let slots = std::array::from_fn(|i| ButtonSlot {
            centroid: refs()[i],
            key: KeyCode::from_char('x'),
        });
        let m = ButtonMatcher::new(slots, MatchParams::default());
        let states = ButtonStates::from_present([true, false, true, true]);
        let mut held = Held::default();
        m.emit(&states, &mut held);
        assert_eq!(held.0, vec![KeyCode::from_char('x')]);
    }
}
