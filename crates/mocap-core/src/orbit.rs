//! Orbit camera controller
//!
//! Y-up spherical orbit around a target with frame-rate independent damping,
//! auto-rotation and distance limits. Input methods only queue motion;
//! [`OrbitController::update`] applies it and reports whether the camera
//! actually moved, which is the "change" the viewer persists.

use std::f32::consts::{PI, TAU};

use glam::{EulerRot, Mat3, Quat, Vec2, Vec3};

use crate::camera_store::CameraPose;

const POLE_EPS: f32 = 1e-4;
const CHANGE_EPS: f32 = 1e-6;
const TARGET_FPS: f32 = 60.0;

#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Full revolutions per minute when auto-rotating (2.0 = one per 30 s)
    pub auto_rotate_speed: f32,
    auto_rotate: bool,

    radius: f32,
    theta: f32,
    phi: f32,

    rotate_delta: Vec2,
    pan_delta: Vec3,
    zoom_scale: f32,

    last_position: Vec3,
    last_rotation: Quat,
}

impl OrbitController {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        let mut controller = Self {
            target,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            auto_rotate_speed: 2.0,
            auto_rotate: false,
            radius: 1.0,
            theta: 0.0,
            phi: PI / 2.0,
            rotate_delta: Vec2::ZERO,
            pan_delta: Vec3::ZERO,
            zoom_scale: 1.0,
            last_position: position,
            last_rotation: Quat::IDENTITY,
        };
        controller.set_position(position);
        controller
    }

    /// Limit the orbit distance; the current radius is clamped on the next update.
    /// A non-finite minimum means no minimum, a NaN maximum means no maximum.
    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = if min.is_finite() { min.max(f32::EPSILON) } else { f32::EPSILON };
        self.max_distance = if max.is_nan() { f32::INFINITY } else { max.max(self.min_distance) };
        self
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.auto_rotate = enabled;
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Place the camera at `position`, keeping the current target
    pub fn set_position(&mut self, position: Vec3) {
        let offset = position - self.target;
        self.radius = offset.length().max(f32::EPSILON);
        self.theta = offset.x.atan2(offset.z);
        self.phi = (offset.y / self.radius).clamp(-1.0, 1.0).acos().clamp(POLE_EPS, PI - POLE_EPS);
        self.rotate_delta = Vec2::ZERO;
        self.pan_delta = Vec3::ZERO;
        self.zoom_scale = 1.0;
        self.last_position = self.position();
        self.last_rotation = self.rotation();
    }

    /// Drag rotation in pixels
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.rotate_delta.x -= TAU * dx / height * self.rotate_speed;
        self.rotate_delta.y -= TAU * dy / height * self.rotate_speed;
    }

    /// Scroll zoom; positive steps move closer
    pub fn zoom(&mut self, steps: f32) {
        if steps == 0.0 || !steps.is_finite() {
            return;
        }
        let scale = 0.95_f32.powf(steps.abs() * self.zoom_speed);
        if steps > 0.0 {
            self.zoom_scale *= scale;
        } else {
            self.zoom_scale /= scale;
        }
    }

    /// Screen-space pan in pixels for a perspective camera with vertical `fov_degrees`
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32, fov_degrees: f32) {
        let height = viewport_height.max(1.0);
        let target_distance = self.radius * (fov_degrees.to_radians() / 2.0).tan();
        let rotation = self.rotation();
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        let scale = 2.0 * target_distance / height * self.pan_speed;
        self.pan_delta += -right * dx * scale + up * dy * scale;
    }

    /// Apply queued motion, damping and auto-rotation for a frame of `dt` seconds.
    /// Returns true when the camera moved.
    pub fn update(&mut self, dt: f32) -> bool {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if self.auto_rotate {
            self.rotate_delta.x -= self.auto_rotate_angle(dt);
        }

        if self.enable_damping {
            let retention = (1.0 - self.damping_factor).clamp(0.0, 1.0).powf(dt * TARGET_FPS);
            let applied = 1.0 - retention;
            self.theta += self.rotate_delta.x * applied;
            self.phi += self.rotate_delta.y * applied;
            self.target += self.pan_delta * applied;
            self.rotate_delta *= retention;
            self.pan_delta *= retention;
        } else {
            self.theta += self.rotate_delta.x;
            self.phi += self.rotate_delta.y;
            self.target += self.pan_delta;
            self.rotate_delta = Vec2::ZERO;
            self.pan_delta = Vec3::ZERO;
        }

        self.theta = self.theta.rem_euclid(TAU);
        self.phi = self.phi.clamp(POLE_EPS, PI - POLE_EPS);
        let min_distance = self.min_distance.max(f32::EPSILON);
        self.radius = (self.radius * self.zoom_scale).clamp(min_distance, self.max_distance.max(min_distance));
        self.zoom_scale = 1.0;

        let position = self.position();
        let rotation = self.rotation();
        let moved = position.distance_squared(self.last_position) > CHANGE_EPS
            || 8.0 * (1.0 - rotation.dot(self.last_rotation).abs()) > CHANGE_EPS;
        if moved {
            self.last_position = position;
            self.last_rotation = rotation;
        }
        moved
    }

    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + Vec3::new(
                self.radius * sin_phi * self.theta.sin(),
                self.radius * self.phi.cos(),
                self.radius * sin_phi * self.theta.cos(),
            )
    }

    /// Camera orientation looking at the target
    pub fn rotation(&self) -> Quat {
        look_rotation(self.position(), self.target)
    }

    pub fn pose(&self) -> CameraPose {
        let (x, y, z) = self.rotation().to_euler(EulerRot::XYZ);
        CameraPose {
            position: self.position(),
            rotation: Vec3::new(x, y, z),
        }
    }

    fn auto_rotate_angle(&self, dt: f32) -> f32 {
        TAU / 60.0 * self.auto_rotate_speed * dt
    }
}

/// Rotation of a Y-up camera at `eye` looking at `target` (camera looks down -Z)
fn look_rotation(eye: Vec3, target: Vec3) -> Quat {
    let back = (eye - target).normalize_or_zero();
    if back == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let right = Vec3::Y.cross(back).normalize_or_zero();
    let right = if right == Vec3::ZERO { Vec3::X } else { right };
    let up = back.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, back)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> OrbitController {
        OrbitController::new(Vec3::new(0.0, 200.0, 300.0), Vec3::ZERO).with_distance_limits(100.0, 700.0)
    }

    #[test]
    fn test_initial_position_preserved() {
        let orbit = controller();
        assert!((orbit.position() - Vec3::new(0.0, 200.0, 300.0)).length() < 1e-3);
        assert!((orbit.distance() - 360.555).abs() < 1e-2);
    }

    #[test]
    fn test_idle_update_reports_no_change() {
        let mut orbit = controller();
        assert!(!orbit.update(1.0 / 60.0));
        assert!(!orbit.update(1.0 / 60.0));
    }

    #[test]
    fn test_rotation_is_damped() {
        let mut orbit = controller();
        orbit.rotate(100.0, 0.0, 600.0);
        assert!(orbit.update(1.0 / 60.0));
        let after_one = orbit.position();

        for _ in 0..600 {
            orbit.update(1.0 / 60.0);
        }
        let settled = orbit.position();
        // Damping spreads the motion over many frames
        assert!(after_one.distance(Vec3::new(0.0, 200.0, 300.0)) < settled.distance(Vec3::new(0.0, 200.0, 300.0)));
        // Orbiting keeps the distance and height
        assert!((settled.length() - 360.555).abs() < 1e-1);
        assert!((settled.y - 200.0).abs() < 1e-2);
        assert!(!orbit.update(1.0 / 60.0));
    }

    #[test]
    fn test_undamped_rotation_applies_at_once() {
        let mut orbit = controller();
        orbit.enable_damping = false;
        // A drag of half the viewport height turns the camera by half a turn
        orbit.rotate(300.0, 0.0, 600.0);
        assert!(orbit.update(0.0));
        let position = orbit.position();
        assert!((position - Vec3::new(0.0, 200.0, -300.0)).length() < 1e-2);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut orbit = controller();
        for _ in 0..200 {
            orbit.zoom(1.0);
            orbit.update(1.0 / 60.0);
        }
        assert!((orbit.distance() - 100.0).abs() < 1e-3);

        for _ in 0..200 {
            orbit.zoom(-1.0);
            orbit.update(1.0 / 60.0);
        }
        assert!((orbit.distance() - 700.0).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_distance_limits() {
        for (min, max) in [(0.0, 0.0), (0.0, -5.0), (-10.0, 1e-9), (f32::NAN, f32::NAN), (300.0, 100.0)] {
            let mut orbit = OrbitController::new(Vec3::new(0.0, 200.0, 300.0), Vec3::ZERO).with_distance_limits(min, max);
            assert!(orbit.min_distance <= orbit.max_distance);
            orbit.zoom(1.0);
            orbit.update(1.0 / 60.0);
            assert!(orbit.distance().is_finite() && orbit.distance() > 0.0);
        }

        // Limits written directly to the fields are tolerated too
        let mut orbit = controller();
        orbit.min_distance = 50.0;
        orbit.max_distance = -1.0;
        orbit.update(1.0 / 60.0);
        assert!((orbit.distance() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_auto_rotate_changes_every_frame() {
        let mut orbit = controller();
        orbit.set_auto_rotate(true);
        for _ in 0..10 {
            assert!(orbit.update(1.0 / 60.0));
        }
        assert!((orbit.position().y - 200.0).abs() < 1e-2);
        assert!((orbit.distance() - 360.555).abs() < 1e-2);
    }

    #[test]
    fn test_pan_moves_target() {
        let mut orbit = controller();
        orbit.enable_damping = false;
        orbit.pan(50.0, 0.0, 600.0, 60.0);
        assert!(orbit.update(0.0));
        // Dragging right moves the scene right, i.e. the target left
        assert!(orbit.target.x < 0.0);
        assert!(orbit.target.y.abs() < 1e-3);
    }

    #[test]
    fn test_pose_looks_at_target() {
        let orbit = OrbitController::new(Vec3::new(0.0, 0.0, 300.0), Vec3::ZERO);
        let pose = orbit.pose();
        assert!(pose.rotation.length() < 1e-4);

        let orbit = controller();
        let forward = orbit.rotation() * Vec3::NEG_Z;
        let expected = (Vec3::ZERO - orbit.position()).normalize();
        assert!(forward.distance(expected) < 1e-4);
        // Looking down at the origin tilts about X only
        let pose = orbit.pose();
        assert!((pose.rotation.x + (200.0_f32 / 300.0).atan()).abs() < 1e-3);
        assert!(pose.rotation.y.abs() < 1e-3);
    }

    #[test]
    fn test_set_position_restores_without_change() {
        let mut orbit = controller();
        orbit.set_position(Vec3::new(150.0, 100.0, 150.0));
        assert!((orbit.position() - Vec3::new(150.0, 100.0, 150.0)).length() < 1e-3);
        assert!(!orbit.update(1.0 / 60.0));
    }
}
