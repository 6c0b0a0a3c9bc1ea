//! Camera uniforms and orbit helpers for the demos.

use glam::{Mat4, Quat, Vec3};

/// Matches the WGSL `struct Camera { view: mat4x4f, proj: mat4x4f }`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Right-handed perspective camera at `eye` looking along `dir`.
    /// Depth maps to `[0, 1]`.
    #[must_use]
    pub fn look_to(eye: Vec3, dir: Vec3, up: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_to_rh(eye, dir, up).to_cols_array_2d(),
            proj: Mat4::perspective_rh(fov_y, aspect, near, far).to_cols_array_2d(),
        }
    }

    /// The demo camera: 45° vertical FOV, 5 units up +Z looking at the origin.
    #[must_use]
    pub fn demo(aspect: f32) -> Self {
        Self::look_to(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::NEG_Z,
            Vec3::Y,
            45f32.to_radians(),
            aspect,
            0.1,
            100.0,
        )
    }
}

/// Unit direction for azimuth `phi` and elevation `theta`.
#[must_use]
pub fn spherical_direction(phi: f32, theta: f32) -> Vec3 {
    let (sin_el, cos_el) = theta.sin_cos();
    let (sin_az, cos_az) = phi.sin_cos();
    Vec3::new(cos_el * cos_az, cos_el * sin_az, sin_el)
}

/// Rotation taking +Z onto the spherical direction `(phi, theta)`.
#[must_use]
pub fn orbit_rotation(phi: f32, theta: f32) -> Mat4 {
    Mat4::from_quat(Quat::from_rotation_arc(Vec3::Z, spherical_direction(phi, theta)))
}
