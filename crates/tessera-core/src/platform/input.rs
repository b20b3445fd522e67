// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Backend-agnostic input events consumed by the frame orchestrator.

/// A user input event.
///
/// Key codes are the physical key names reported by the windowing layer
/// (`"Escape"`, `"Digit3"`, `"Numpad3"`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A keyboard key was pressed.
    KeyPressed {
        /// A string representation of the physical key code.
        key_code: String,
    },
    /// A keyboard key was released.
    KeyReleased {
        /// A string representation of the physical key code.
        key_code: String,
    },
    /// A mouse button was pressed.
    MouseButtonPressed {
        /// The mouse button that was pressed.
        button: MouseButton,
    },
    /// A mouse button was released.
    MouseButtonReleased {
        /// The mouse button that was released.
        button: MouseButton,
    },
    /// The mouse cursor moved, in physical pixels.
    MouseMoved {
        /// The new x-coordinate of the cursor.
        x: f32,
        /// The new y-coordinate of the cursor.
        y: f32,
    },
    /// The mouse wheel was scrolled.
    MouseWheelScrolled {
        /// The horizontal scroll delta.
        delta_x: f32,
        /// The vertical scroll delta. Positive values scroll away from the user.
        delta_y: f32,
    },
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    /// Another mouse button, identified by a numeric code.
    Other(u16),
}

impl InputEvent {
    /// The digit of a number-row or keypad key press, if this is one.
    pub fn pressed_digit(&self) -> Option<u8> {
        let InputEvent::KeyPressed { key_code } = self else {
            return None;
        };
        let digit = key_code
            .strip_prefix("Digit")
            .or_else(|| key_code.strip_prefix("Numpad"))?;
        match digit.as_bytes() {
            [d @ b'0'..=b'9'] => Some(d - b'0'),
            _ => None,
        }
    }
}
