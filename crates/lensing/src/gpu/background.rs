use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::RenderError;
use crate::types::BackgroundFilter;

use super::context::GpuContext;

/// Background texture, its view and the sampler the kernel reads it with.
pub struct GpuBackground {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuBackground {
    pub(crate) fn upload(
        context: &GpuContext,
        pixels: &[u8],
        width: u32,
        height: u32,
        filter: BackgroundFilter,
    ) -> Result<Self, RenderError> {
        let max_dimension = context.max_texture_dimension();
        if width > max_dimension || height > max_dimension {
            return Err(RenderError::AllocationFailure {
                what: "background texture",
                width,
                height,
                reason: format!("GPU max texture dimension is {max_dimension}"),
            });
        }

        let (texture, error) = context.capture_errors(|| {
            create_texture(context, "lensing background", pixels, width, height)
        });
        if let Some(error) = error {
            return Err(RenderError::AllocationFailure {
                what: "background texture",
                width,
                height,
                reason: error.to_string(),
            });
        }
        Ok(Self::from_texture(context, texture, filter))
    }

    /// 1x1 stand-in bound while no background is set; the kernel never samples
    /// it because `has_bg` is zero.
    pub(crate) fn placeholder(context: &GpuContext, filter: BackgroundFilter) -> Self {
        let texture = create_texture(
            context,
            "lensing placeholder background",
            &[0, 0, 0, 255],
            1,
            1,
        );
        Self::from_texture(context, texture, filter)
    }

    fn from_texture(context: &GpuContext, texture: wgpu::Texture, filter: BackgroundFilter) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let filter_mode = match filter {
            BackgroundFilter::Linear => wgpu::FilterMode::Linear,
            BackgroundFilter::Nearest => wgpu::FilterMode::Nearest,
        };
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lensing background sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
        }
    }
}

fn create_texture(
    context: &GpuContext,
    label: &str,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> wgpu::Texture {
    context.device.create_texture_with_data(
        &context.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        pixels,
    )
}
