use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::Input;

/// Keeps the polar angle off the poles.
const POLE_EPSILON: f32 = 1e-6;

/// Orbits a [`Camera`] around a target point.
///
/// The orbit is read back from the camera's position on every update, so
/// code that moves the camera directly (resetting its distance, say) is
/// picked up on the next frame. Left-drag rotates and auto-rotation spins
/// the camera around the vertical axis. There is no panning and no zoom.
///
/// With damping enabled, rotation input is spread over the following frames:
/// each update applies `damping` of the pending rotation and keeps the rest.
///
/// # Example
/// ```ignore
/// let mut orbit = OrbitControls::new().damping(0.05).auto_rotate(5.0);
///
/// // In frame loop:
/// orbit.update(&mut scene.camera, &input, dt, viewport_height);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Fraction of pending rotation applied per update. `0.0` disables damping.
    pub damping: f32,
    /// Auto-rotation speed; `1.0` is one orbit per minute. `None` disables it.
    pub auto_rotate_speed: Option<f32>,
    /// Drag rotation multiplier.
    pub rotate_speed: f32,
    /// Pending (azimuth, polar) rotation in radians.
    pending: Vec2,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            damping: 0.0,
            auto_rotate_speed: None,
            rotate_speed: 1.0,
            pending: Vec2::ZERO,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target point to orbit around.
    pub fn target(mut self, target: impl Into<Vec3>) -> Self {
        self.target = target.into();
        self
    }

    pub fn damping(mut self, factor: f32) -> Self {
        self.damping = factor.clamp(0.0, 1.0);
        self
    }

    pub fn auto_rotate(mut self, speed: f32) -> Self {
        self.auto_rotate_speed = Some(speed);
        self
    }

    pub fn rotate_speed(mut self, speed: f32) -> Self {
        self.rotate_speed = speed;
        self
    }

    /// Auto-rotation in radians per second.
    pub fn auto_rotation_rate(&self) -> f32 {
        self.auto_rotate_speed.map_or(0.0, |speed| TAU / 60.0 * speed)
    }

    /// Rotate around the vertical axis. Positive angles move the camera to its left.
    pub fn rotate_left(&mut self, angle: f32) {
        self.pending.x -= angle;
    }

    /// Rotate over the top. Positive angles move the camera up.
    pub fn rotate_up(&mut self, angle: f32) {
        self.pending.y -= angle;
    }

    /// Apply input and auto-rotation, then move `camera`.
    ///
    /// `viewport_height` converts drag distance to angle: dragging across
    /// the full height turns the camera by a full circle.
    pub fn update(&mut self, camera: &mut Camera, input: &Input, dt: f32, viewport_height: f32) {
        if input.mouse_down(MouseButton::Left) && viewport_height > 0.0 {
            let delta = input.mouse_delta();
            self.rotate_left(TAU * delta.x / viewport_height * self.rotate_speed);
            self.rotate_up(TAU * delta.y / viewport_height * self.rotate_speed);
        }
        self.rotate_left(self.auto_rotation_rate() * dt);

        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let applied = if self.damping > 0.0 {
            self.pending * self.damping
        } else {
            self.pending
        };
        azimuth += applied.x;
        polar = (polar + applied.y).clamp(POLE_EPSILON, PI - POLE_EPSILON);

        camera.position = self.target
            + radius
                * Vec3::new(
                    polar.sin() * azimuth.sin(),
                    polar.cos(),
                    polar.sin() * azimuth.cos(),
                );
        camera.target = self.target;

        if self.damping > 0.0 {
            self.pending *= 1.0 - self.damping;
        } else {
            self.pending = Vec2::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn speed_five_is_one_orbit_per_twelve_seconds() {
        let orbit = OrbitControls::new().auto_rotate(5.0);
        assert!((orbit.auto_rotation_rate() * 12.0 - TAU).abs() < 1e-5);
    }

    #[test]
    fn auto_rotate_quarter_turn() {
        let mut orbit = OrbitControls::new().auto_rotate(5.0);
        let mut camera = Camera::default();
        let input = Input::new();

        for _ in 0..180 {
            orbit.update(&mut camera, &input, 1.0 / 60.0, 600.0);
        }
        assert!(approx(camera.position, Vec3::new(-20.0, 0.0, 0.0)), "{:?}", camera.position);
    }

    #[test]
    fn damping_spreads_rotation_but_keeps_distance() {
        let mut orbit = OrbitControls::new().damping(0.05);
        let mut camera = Camera::default();
        let input = Input::new();

        orbit.rotate_left(1.0);
        orbit.update(&mut camera, &input, 1.0 / 60.0, 600.0);
        let first = camera.position.x.atan2(camera.position.z);
        assert!((first + 0.05).abs() < 1e-4);

        for _ in 0..400 {
            orbit.update(&mut camera, &input, 1.0 / 60.0, 600.0);
        }
        let settled = camera.position.x.atan2(camera.position.z);
        assert!((settled + 1.0).abs() < 1e-3);
        assert!((camera.position.length() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn distance_changes_from_outside_are_kept() {
        let mut orbit = OrbitControls::new().auto_rotate(5.0);
        let mut camera = Camera::default().at(Vec3::new(0.0, 0.0, 35.0));
        let input = Input::new();

        orbit.update(&mut camera, &input, 0.5, 600.0);
        assert!((camera.position.length() - 35.0).abs() < 1e-3);
        camera.position.z = 20.0;
        orbit.update(&mut camera, &input, 0.0, 600.0);
        assert!(camera.position.length() < 35.0);
    }

    #[test]
    fn polar_angle_stays_off_the_pole() {
        let mut orbit = OrbitControls::new();
        let mut camera = Camera::default();
        orbit.rotate_up(10.0);
        orbit.update(&mut camera, &Input::new(), 0.0, 600.0);
        assert!(camera.position.is_finite());
        assert!((camera.position.y - 20.0).abs() < 1e-3);
        assert!((camera.position.length() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn left_drag_rotates() {
        let mut orbit = OrbitControls::new();
        let mut camera = Camera::default();
        let mut input = Input::new();
        input.press_button(MouseButton::Left);
        input.move_cursor(Vec2::new(150.0, 0.0));

        orbit.update(&mut camera, &input, 0.0, 600.0);
        // A quarter of the height is a quarter turn.
        assert!(approx(camera.position, Vec3::new(-20.0, 0.0, 0.0)), "{:?}", camera.position);
    }
}
