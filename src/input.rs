use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::color::Color;

/// Tracks keyboard and mouse state between frames.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_button(*button),
                ElementState::Released => self.release_button(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            // Buttons released outside the window never report back.
            WindowEvent::Focused(false) => self.mouse_buttons_down.clear(),
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.mouse_buttons_down.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
    }

    pub fn move_cursor(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame. Key repeat does not count.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    pub fn any_mouse_down(&self) -> bool {
        !self.mouse_buttons_down.is_empty()
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Mouse movement delta this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }
}

/// Map a pointer position to the drag color.
///
/// Red follows the horizontal position and green the vertical one, each
/// scaled to `0..=255` across the viewport; blue is fixed at 150.
pub fn drag_rgb(position: Vec2, width: u32, height: u32) -> [u8; 3] {
    let channel = |coord: f32, extent: u32| {
        if extent == 0 {
            return 0;
        }
        (coord / extent as f32 * 255.0).round().clamp(0.0, 255.0) as u8
    };
    [channel(position.x, width), channel(position.y, height), 150]
}

/// [`drag_rgb`] as a [`Color`].
pub fn drag_color(position: Vec2, width: u32, height: u32) -> Color {
    let [r, g, b] = drag_rgb(position, width, height);
    Color::from_rgb8(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_color_corners_and_center() {
        assert_eq!(drag_rgb(Vec2::ZERO, 800, 600), [0, 0, 150]);
        assert_eq!(drag_rgb(Vec2::new(800.0, 600.0), 800, 600), [255, 255, 150]);
        assert_eq!(drag_rgb(Vec2::new(400.0, 300.0), 800, 600), [128, 128, 150]);
    }

    #[test]
    fn drag_color_clamps_outside_the_window() {
        assert_eq!(drag_rgb(Vec2::new(-50.0, 900.0), 800, 600), [0, 255, 150]);
        assert_eq!(drag_rgb(Vec2::new(10.0, 10.0), 0, 0), [0, 0, 150]);
    }

    #[test]
    fn drag_color_converts_channels() {
        let color = drag_color(Vec2::new(800.0, 0.0), 800, 600);
        assert_eq!(color, Color::from_rgb8(255, 0, 150));
    }

    #[test]
    fn key_pressed_lasts_one_frame() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyE);
        assert!(input.key_pressed(KeyCode::KeyE));

        input.begin_frame();
        input.press_key(KeyCode::KeyE);
        assert!(input.key_down(KeyCode::KeyE));
        assert!(!input.key_pressed(KeyCode::KeyE));

        input.release_key(KeyCode::KeyE);
        input.press_key(KeyCode::KeyE);
        assert!(input.key_pressed(KeyCode::KeyE));
    }

    #[test]
    fn cursor_delta_accumulates_until_next_frame() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(10.0, 10.0));
        input.begin_frame();
        input.move_cursor(Vec2::new(13.0, 8.0));
        input.move_cursor(Vec2::new(15.0, 9.0));
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, -1.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn buttons_track_any_press() {
        let mut input = Input::new();
        assert!(!input.any_mouse_down());
        input.press_button(MouseButton::Right);
        assert!(input.any_mouse_down());
        assert!(!input.mouse_down(MouseButton::Left));
        input.release_button(MouseButton::Right);
        assert!(!input.any_mouse_down());
    }
}
