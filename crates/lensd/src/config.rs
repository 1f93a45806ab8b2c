use std::path::PathBuf;

use lensing::{
    BackgroundFilter, CameraParams, GpuMemoryMode, GpuPowerPreference, RendererSettings,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of `lensd.toml`. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LensdConfig {
    #[serde(default)]
    pub gpu: GpuSection,
    #[serde(default)]
    pub background: BackgroundSection,
    #[serde(default)]
    pub kernel: KernelSection,
    #[serde(default)]
    pub camera: CameraSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GpuSection {
    #[serde(default)]
    pub power: GpuPowerPreference,
    #[serde(default)]
    pub memory: GpuMemoryMode,
    #[serde(default)]
    pub fallback_adapter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackgroundSection {
    #[serde(default)]
    pub filter: BackgroundFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KernelSection {
    pub path: Option<PathBuf>,
}

/// Camera used by `lensd still`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraSection {
    pub pos: [f64; 3],
    pub target: [f64; 3],
    pub up: [f64; 3],
    pub fov_y: f64,
    pub r_s: f64,
    pub cube_half_size: f64,
    pub max_steps: u32,
    pub d_lambda: f64,
}

impl Default for CameraSection {
    fn default() -> Self {
        let camera = CameraParams::default();
        Self {
            pos: camera.position.to_array(),
            target: camera.look_target.to_array(),
            up: camera.up_hint.to_array(),
            fov_y: camera.fov_y,
            r_s: camera.r_s,
            cube_half_size: camera.cube_half_size,
            max_steps: camera.max_steps,
            d_lambda: camera.d_lambda,
        }
    }
}

impl LensdConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LensdConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if !self.camera_params().is_finite() {
            return Err(ConfigError::Invalid(
                "camera values must be finite numbers".into(),
            ));
        }
        if camera.max_steps == 0 {
            return Err(ConfigError::Invalid(
                "camera.max_steps must be greater than zero".into(),
            ));
        }
        if !(camera.fov_y > 0.0 && camera.fov_y < std::f64::consts::PI) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_y must be between 0 and pi radians, got {}",
                camera.fov_y
            )));
        }
        if camera.d_lambda <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "camera.d_lambda must be positive, got {}",
                camera.d_lambda
            )));
        }
        if camera.pos == camera.target {
            return Err(ConfigError::Invalid(
                "camera.pos and camera.target must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        RendererSettings {
            power: self.gpu.power,
            memory: self.gpu.memory,
            force_fallback_adapter: self.gpu.fallback_adapter,
            background_filter: self.background.filter,
            kernel_source: self.kernel.path.clone(),
        }
    }

    pub fn camera_params(&self) -> CameraParams {
        let camera = &self.camera;
        CameraParams {
            position: camera.pos.into(),
            look_target: camera.target.into(),
            up_hint: camera.up.into(),
            fov_y: camera.fov_y,
            r_s: camera.r_s,
            cube_half_size: camera.cube_half_size,
            max_steps: camera.max_steps,
            d_lambda: camera.d_lambda,
        }
    }
}
