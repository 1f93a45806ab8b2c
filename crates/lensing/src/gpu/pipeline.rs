use std::borrow::Cow;
use std::num::NonZeroU64;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::uniforms::RenderUniforms;

use super::context::GpuContext;
use super::surface::FRAME_FORMAT;

/// The kernel bundled with the crate.
pub const BUNDLED_KERNEL: &str = include_str!("../../shaders/lensing.wgsl");

/// Edge length of the kernel's square workgroup.
pub const WORKGROUP_SIZE: u32 = 8;

/// Fixed pipeline state, built once per renderer.
pub(crate) struct KernelPipeline {
    pub layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::ComputePipeline,
}

impl KernelPipeline {
    pub fn new(context: &GpuContext, kernel_source: Option<&Path>) -> Result<Self> {
        let source = match kernel_source {
            Some(path) => {
                let code = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read kernel at {}", path.display()))?;
                tracing::info!(path = %path.display(), "using custom lensing kernel");
                Cow::Owned(code)
            }
            None => Cow::Borrowed(BUNDLED_KERNEL),
        };

        let device = &context.device;
        let (module, error) = context.capture_errors(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("lensing kernel"),
                source: wgpu::ShaderSource::Wgsl(source),
            })
        });
        if let Some(error) = error {
            bail!("failed to compile lensing kernel: {error}");
        }

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lensing bind group layout"),
            entries: &layout_entries(),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lensing pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let (pipeline, error) = context.capture_errors(|| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("lensing pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        });
        if let Some(error) = error {
            bail!("failed to build lensing pipeline: {error}");
        }

        Ok(Self { layout, pipeline })
    }
}

fn layout_entries() -> [wgpu::BindGroupLayoutEntry; 4] {
    [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(std::mem::size_of::<RenderUniforms>() as u64),
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: FRAME_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 3,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ]
}

/// Workgroups needed to cover a `width`x`height` surface.
pub fn workgroup_count(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(WORKGROUP_SIZE),
        height.div_ceil(WORKGROUP_SIZE),
    )
}
