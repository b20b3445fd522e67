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


//! Translates `winit` window events into the backend-agnostic [`InputEvent`].

use tessera_core::platform::{InputEvent, MouseButton};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Returns the input event carried by `event`, or `None` for events that are
/// not user input (resizes, focus changes, ...).
///
/// Key repeats are dropped so a held key produces a single `KeyPressed`.
pub fn translate_winit_input(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::KeyboardInput {
            event: key_event, ..
        } => {
            let PhysicalKey::Code(keycode) = key_event.physical_key else {
                return None;
            };
            let key_code = map_keycode_to_string(keycode);
            match key_event.state {
                ElementState::Pressed if !key_event.repeat => {
                    Some(InputEvent::KeyPressed { key_code })
                }
                ElementState::Released => Some(InputEvent::KeyReleased { key_code }),
                _ => None,
            }
        }
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::MouseMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseInput { state, button, .. } => {
            let button = map_mouse_button(*button);
            Some(match state {
                ElementState::Pressed => InputEvent::MouseButtonPressed { button },
                ElementState::Released => InputEvent::MouseButtonReleased { button },
            })
        }
        WindowEvent::MouseWheel { delta, .. } => {
            let (delta_x, delta_y) = scroll_delta(delta);
            (delta_x != 0.0 || delta_y != 0.0)
                .then_some(InputEvent::MouseWheelScrolled { delta_x, delta_y })
        }
        _ => None,
    }
}

/// Pixel deltas are scaled down so one trackpad "notch" is comparable to
/// one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

fn scroll_delta(delta: &MouseScrollDelta) -> (f32, f32) {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => (*x, *y),
        MouseScrollDelta::PixelDelta(pos) => (
            pos.x as f32 / PIXELS_PER_LINE,
            pos.y as f32 / PIXELS_PER_LINE,
        ),
    }
}

fn map_keycode_to_string(keycode: KeyCode) -> String {
    format!("{keycode:?}")
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(id) => MouseButton::Other(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::DeviceId;

    #[test]
    fn test_keycodes_feed_digit_selection() {
        assert_eq!(map_keycode_to_string(KeyCode::KeyA), "KeyA");
        assert_eq!(map_keycode_to_string(KeyCode::Digit1), "Digit1");
        assert_eq!(map_keycode_to_string(KeyCode::Numpad4), "Numpad4");

        let pressed = InputEvent::KeyPressed {
            key_code: map_keycode_to_string(KeyCode::Digit3),
        };
        assert_eq!(pressed.pressed_digit(), Some(3));
    }

    #[test]
    fn test_mouse_buttons() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(
            map_mouse_button(WinitMouseButton::Other(7)),
            MouseButton::Other(7)
        );
    }

    #[test]
    fn test_cursor_and_wheel() {
        let moved = WindowEvent::CursorMoved {
            device_id: DeviceId::dummy(),
            position: PhysicalPosition::new(10.0, 20.0),
        };
        assert_eq!(
            translate_winit_input(&moved),
            Some(InputEvent::MouseMoved { x: 10.0, y: 20.0 })
        );

        let wheel = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(
            translate_winit_input(&wheel),
            Some(InputEvent::MouseWheelScrolled {
                delta_x: 0.0,
                delta_y: 1.0
            })
        );

        let still = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 0.0)),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(translate_winit_input(&still), None);
    }

    #[test]
    fn test_pixel_scroll_is_scaled_to_lines() {
        let (_, y) = scroll_delta(&MouseScrollDelta::PixelDelta(PhysicalPosition::new(
            0.0, 80.0,
        )));
        assert_eq!(y, 2.0);
    }

    #[test]
    fn test_non_input_events_are_ignored() {
        assert_eq!(translate_winit_input(&WindowEvent::Focused(true)), None);
    }
}
