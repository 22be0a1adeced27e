//! Collaborator interfaces: camera, key emulation and operator input.
//!
//! The pipeline never opens or configures devices itself; callers hand in
//! implementations of these traits and own their lifetimes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::image::RgbFrame;

/// A key code as delivered by the operator's keyboard (a Unicode scalar).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const SPACE: KeyCode = KeyCode(' ' as u32);

    pub fn from_char(c: char) -> Self {
        KeyCode(c as u32)
    }

    pub fn as_char(self) -> Option<char> {
        char::from_u32(self.0)
    }

    /// Lower-case ASCII letters, leave everything else untouched.
    pub fn to_ascii_lowercase(self) -> Self {
        match self.as_char() {
            Some(c) => KeyCode::from_char(c.to_ascii_lowercase()),
            None => self,
        }
    }
}

impl Default for KeyCode {
    fn default() -> Self {
        Self::SPACE
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_char() {
            Some(c) if !c.is_control() => write!(f, "{c}"),
            _ => write!(f, "#{}", self.0),
        }
    }
}

/// Source of camera frames.
pub trait FrameSource {
    /// Next frame, or `None` if the camera could not deliver one.
    fn read_frame(&mut self) -> Option<RgbFrame>;

    /// `(width, height)` of the frames this source delivers.
    fn frame_dimensions(&self) -> (usize, usize);
}

/// Keyboard emulation. Both calls must be idempotent.
pub trait KeyEmulator {
    fn press(&mut self, key: KeyCode);
    fn release(&mut self, key: KeyCode);
}

/// One discrete operator action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorEvent {
    /// Primary confirmation (advance).
    Confirm,
    /// Secondary action (go back one phase).
    Back,
    /// A single key press.
    Key(KeyCode),
    /// Leave the current loop.
    Exit,
}

/// Non-blocking operator input.
pub trait OperatorInput {
    /// At most one pending event; `None` when nothing happened.
    fn poll(&mut self) -> Option<OperatorEvent>;
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn read_frame(&mut self) -> Option<RgbFrame> {
        (**self).read_frame()
    }

    fn frame_dimensions(&self) -> (usize, usize) {
        (**self).frame_dimensions()
    }
}

impl<T: KeyEmulator + ?Sized> KeyEmulator for &mut T {
    fn press(&mut self, key: KeyCode) {
        (**self).press(key)
    }

    fn release(&mut self, key: KeyCode) {
        (**self).release(key)
    }
}

impl<T: OperatorInput + ?Sized> OperatorInput for &mut T {
    fn poll(&mut self) -> Option<OperatorEvent> {
        (**self).poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_code_defaults_to_space() {
        assert_eq!(KeyCode::default(), KeyCode(32));
        assert_eq!(KeyCode::default().to_string(), " ");
    }

    #[test]
    fn key_code_display_and_case() {
        assert_eq!(KeyCode::from_char('W').to_ascii_lowercase(), KeyCode::from_char('w'));
        assert_eq!(KeyCode::from_char('a').to_string(), "a");
        assert_eq!(KeyCode(27).to_string(), "#27");
        assert_eq!(KeyCode(0xD800).to_string(), "#55296");
    }

    #[test]
    fn key_code_serializes_as_number() {
        let json = serde_json::to_string(&KeyCode::from_char('a')).expect("serialize");
        assert_eq!(json, "97");
    }
}
