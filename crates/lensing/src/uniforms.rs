use bytemuck::{Pod, Zeroable};
use glam::DVec3;

use crate::types::CameraParams;

/// CPU mirror of the kernel's `Uniforms` block.
///
/// Every `vec3` is followed by an explicit pad so the struct matches the
/// WGSL uniform layout (vec3 aligned to 16 bytes) without relying on
/// implicit padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub cam_pos: [f32; 3],
    pub _padding0: f32,
    pub forward: [f32; 3],
    pub _padding1: f32,
    pub right: [f32; 3],
    pub _padding2: f32,
    pub up: [f32; 3],
    pub _padding3: f32,
    /// Horizontal half extent of the frustum at unit distance.
    pub half_width: f32,
    /// Vertical half extent of the frustum at unit distance.
    pub half_height: f32,
    pub r_s: f32,
    pub cube_half_size: f32,
    pub max_steps: i32,
    pub d_lambda: f32,
    pub width: i32,
    pub height: i32,
    pub bg_width: i32,
    pub bg_height: i32,
    pub has_bg: i32,
    pub _padding4: i32,
}

impl RenderUniforms {
    /// Derives the per-frame parameter block from the sparse camera input.
    ///
    /// `background` carries the bound background's dimensions, if any.
    /// `height` must be non-zero; the bridge rejects zero sizes before a
    /// frame is ever built.
    pub fn build(
        camera: &CameraParams,
        width: u32,
        height: u32,
        background: Option<(u32, u32)>,
    ) -> Self {
        let (forward, right, up) =
            camera_basis(camera.position, camera.look_target, camera.up_hint);

        let aspect = width as f64 / height as f64;
        let half_height = (camera.fov_y * 0.5).tan();
        let half_width = aspect * half_height;

        let (bg_width, bg_height, has_bg) = match background {
            Some((w, h)) => (clamp_i32(w), clamp_i32(h), 1),
            None => (0, 0, 0),
        };

        Self {
            cam_pos: camera.position.as_vec3().to_array(),
            _padding0: 0.0,
            forward: forward.as_vec3().to_array(),
            _padding1: 0.0,
            right: right.as_vec3().to_array(),
            _padding2: 0.0,
            up: up.as_vec3().to_array(),
            _padding3: 0.0,
            half_width: half_width as f32,
            half_height: half_height as f32,
            r_s: camera.r_s as f32,
            cube_half_size: camera.cube_half_size as f32,
            max_steps: clamp_i32(camera.max_steps),
            d_lambda: camera.d_lambda as f32,
            width: clamp_i32(width),
            height: clamp_i32(height),
            bg_width,
            bg_height,
            has_bg,
            _padding4: 0,
        }
    }

    pub fn has_background(&self) -> bool {
        self.has_bg != 0
    }
}

/// Orthonormal (forward, right, up) basis; `up_hint` is only used to pick
/// the plane, never taken as the final up vector.
pub(crate) fn camera_basis(
    position: DVec3,
    target: DVec3,
    up_hint: DVec3,
) -> (DVec3, DVec3, DVec3) {
    let forward = (target - position).normalize_or_zero();
    let right = forward.cross(up_hint).normalize_or_zero();
    let up = right.cross(forward);
    (forward, right, up)
}

fn clamp_i32(value: u32) -> i32 {
    value.min(i32::MAX as u32) as i32
}
