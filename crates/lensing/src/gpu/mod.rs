//! `wgpu` implementation of the render backend.
//!
//! - `context` requests a headless adapter and device and wraps fallible
//!   calls in error scopes so allocation failures surface as values.
//! - `surface` allocates the storage texture a renderer draws into.
//! - `background` uploads RGBA8 backgrounds and owns the 1x1 placeholder.
//! - `pipeline` loads the WGSL kernel and builds the compute pipeline once.
//! - `dispatch` binds everything for one frame, submits and waits.
//! - `readback` copies a finished surface back to host memory.

mod background;
mod context;
mod dispatch;
mod pipeline;
mod readback;
mod surface;

pub use background::GpuBackground;
pub use context::AdapterProfile;
pub use pipeline::{workgroup_count, BUNDLED_KERNEL, WORKGROUP_SIZE};
pub use surface::{FrameSurface, FRAME_FORMAT};

use crate::backend::{BackendFactory, RenderBackend};
use crate::error::RenderError;
use crate::types::{BackgroundFilter, RendererSettings};
use crate::uniforms::RenderUniforms;

use context::GpuContext;
use pipeline::KernelPipeline;

/// One device plus the lensing pipeline built on it.
pub struct WgpuBackend {
    context: GpuContext,
    kernel: KernelPipeline,
    placeholder: GpuBackground,
    background_filter: BackgroundFilter,
}

impl WgpuBackend {
    pub fn new(settings: &RendererSettings) -> anyhow::Result<Self> {
        let context = GpuContext::new(settings)?;
        let kernel = KernelPipeline::new(&context, settings.kernel_source.as_deref())?;
        let placeholder = GpuBackground::placeholder(&context, settings.background_filter);
        Ok(Self {
            context,
            kernel,
            placeholder,
            background_filter: settings.background_filter,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }
}

impl RenderBackend for WgpuBackend {
    type Surface = FrameSurface;
    type Background = GpuBackground;

    fn allocate_surface(&mut self, width: u32, height: u32) -> Result<FrameSurface, RenderError> {
        FrameSurface::allocate(&self.context, width, height)
    }

    fn upload_background(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<GpuBackground, RenderError> {
        GpuBackground::upload(&self.context, pixels, width, height, self.background_filter)
    }

    fn dispatch(
        &mut self,
        surface: &FrameSurface,
        uniforms: &RenderUniforms,
        background: Option<&GpuBackground>,
    ) -> Result<(), RenderError> {
        let background = background.unwrap_or(&self.placeholder);
        dispatch::run_kernel(&self.context, &self.kernel, surface, uniforms, background)
    }
}

/// Builds a fresh [`WgpuBackend`] for every renderer.
#[derive(Debug, Clone, Default)]
pub struct WgpuFactory {
    settings: RendererSettings,
}

impl WgpuFactory {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }
}

impl BackendFactory for WgpuFactory {
    type Backend = WgpuBackend;

    fn create(&self) -> Result<WgpuBackend, RenderError> {
        let backend = WgpuBackend::new(&self.settings)
            .map_err(|err| RenderError::DeviceUnavailable(format!("{err:#}")))?;
        let profile = backend.adapter_profile();
        tracing::info!(
            adapter = %profile.name,
            backend = ?profile.backend,
            "GPU backend ready"
        );
        Ok(backend)
    }

    fn probe(&self) -> bool {
        context::probe(&self.settings)
    }
}
