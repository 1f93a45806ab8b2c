use crate::backend::FrameTarget;
use crate::error::RenderError;

use super::context::GpuContext;

/// Pixel format of every frame surface. The kernel writes it as a storage
/// texture and hosts sample it directly.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A GPU-resident frame: the texture the kernel writes and the view it is
/// bound through. Clones share the same GPU memory.
#[derive(Clone, Debug)]
pub struct FrameSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    pub(super) device: wgpu::Device,
    pub(super) queue: wgpu::Queue,
}

impl FrameSurface {
    pub(crate) fn allocate(
        context: &GpuContext,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let max_dimension = context.max_texture_dimension();
        if width > max_dimension || height > max_dimension {
            return Err(RenderError::AllocationFailure {
                what: "frame surface",
                width,
                height,
                reason: format!("GPU max texture dimension is {max_dimension}"),
            });
        }

        let (texture, error) = context.capture_errors(|| {
            context.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("lensing frame surface"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: FRAME_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(RenderError::AllocationFailure {
                what: "frame surface",
                width,
                height,
                reason: error.to_string(),
            });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            width,
            height,
            device: context.device.clone(),
            queue: context.queue.clone(),
        })
    }

    /// The texture hosts bind to display the frame.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        FRAME_FORMAT
    }
}

impl FrameTarget for FrameSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
