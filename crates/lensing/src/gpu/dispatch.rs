use wgpu::util::DeviceExt;

use crate::backend::FrameTarget;
use crate::error::RenderError;
use crate::uniforms::RenderUniforms;

use super::background::GpuBackground;
use super::context::GpuContext;
use super::pipeline::{workgroup_count, KernelPipeline};
use super::surface::FrameSurface;

/// Encodes one kernel pass over `surface`, submits it and blocks until the
/// GPU has finished. There is no timeout; a hung device hangs the caller.
pub(crate) fn run_kernel(
    context: &GpuContext,
    kernel: &KernelPipeline,
    surface: &FrameSurface,
    uniforms: &RenderUniforms,
    background: &GpuBackground,
) -> Result<(), RenderError> {
    let (width, height) = surface.size();
    let (groups_x, groups_y) = workgroup_count(width, height);

    let (index, error) = context.capture_errors(|| {
        let uniform_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lensing uniforms"),
                contents: bytemuck::bytes_of(uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lensing bind group"),
            layout: &kernel.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(surface.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&background.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&background.sampler),
                },
            ],
        });

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lensing encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("lensing pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        context.queue.submit(Some(encoder.finish()))
    });
    if let Some(error) = error {
        return Err(RenderError::DispatchFailed(error.to_string()));
    }

    context
        .device
        .poll(wgpu::PollType::WaitForSubmissionIndex(index))
        .map_err(|err| RenderError::DispatchFailed(format!("waiting for GPU: {err}")))?;

    tracing::debug!(width, height, groups_x, groups_y, "lensing kernel completed");
    Ok(())
}
