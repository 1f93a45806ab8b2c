use std::fmt;
use std::path::PathBuf;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Opaque identifier for a live renderer.
///
/// The value is assigned by the host's texture registry when the frame
/// surface is registered, so the same id routes bridge calls and addresses
/// the registered texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RendererHandle(pub i64);

impl fmt::Display for RendererHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sparse camera description supplied by the caller for every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub position: DVec3,
    pub look_target: DVec3,
    /// Hint only; the builder re-orthonormalises it against the view direction.
    pub up_hint: DVec3,
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Schwarzschild radius analogue.
    pub r_s: f64,
    /// Half extent of the simulated cube; rays leaving it sample the background.
    pub cube_half_size: f64,
    pub max_steps: u32,
    pub d_lambda: f64,
}

impl CameraParams {
    /// True when every scalar and vector component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.look_target.is_finite()
            && self.up_hint.is_finite()
            && self.fov_y.is_finite()
            && self.r_s.is_finite()
            && self.cube_half_size.is_finite()
            && self.d_lambda.is_finite()
    }
}

impl Default for CameraParams {
    /// Looks at the origin from +Z, matching the demo scene the kernel was tuned for.
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 5.0),
            look_target: DVec3::ZERO,
            up_hint: DVec3::Y,
            fov_y: 1.0,
            r_s: 1.0,
            cube_half_size: 10.0,
            max_steps: 200,
            d_lambda: 0.05,
        }
    }
}

/// Adapter power preference forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Device memory hint forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuMemoryMode {
    #[default]
    Balanced,
    Performance,
}

/// Filtering used when the kernel samples the background texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFilter {
    #[default]
    Linear,
    Nearest,
}

/// Start-up settings for the GPU backend.
///
/// Every renderer created through a factory shares the same settings; they
/// never change for the lifetime of a handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RendererSettings {
    pub power: GpuPowerPreference,
    pub memory: GpuMemoryMode,
    /// Ask `wgpu` for a software adapter (useful on headless CI).
    pub force_fallback_adapter: bool,
    pub background_filter: BackgroundFilter,
    /// Optional WGSL file replacing the bundled lensing kernel. It must keep
    /// the bundled binding layout and the `main` entry point.
    pub kernel_source: Option<PathBuf>,
}
