use std::sync::mpsc;

use anyhow::{anyhow, ensure, Context, Result};

use crate::backend::FrameTarget;

use super::surface::FrameSurface;

const BYTES_PER_PIXEL: u32 = 4;

impl FrameSurface {
    /// Copies the surface into host memory as tightly packed RGBA8 rows.
    ///
    /// This is a host-side consumption step (still export, tests); the
    /// renderer never calls it.
    pub fn read_rgba(&self) -> Result<Vec<u8>> {
        let (width, height) = self.size();
        let unpadded_bytes_per_row = width * BYTES_PER_PIXEL;
        let padded_bytes_per_row = padded_row_bytes(unpadded_bytes_per_row);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lensing readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lensing readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: self.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .context("failed waiting for frame readback")?;
        receiver
            .recv()
            .map_err(|_| anyhow!("GPU map callback was dropped"))?
            .context("failed to map readback buffer")?;

        let mapped = slice.get_mapped_range();
        let pixels = strip_row_padding(
            &mapped,
            unpadded_bytes_per_row as usize,
            padded_bytes_per_row as usize,
            height as usize,
        )?;
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}

fn padded_row_bytes(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn strip_row_padding(data: &[u8], unpadded: usize, padded: usize, rows: usize) -> Result<Vec<u8>> {
    ensure!(
        data.len() >= padded * rows,
        "readback buffer holds {} bytes, expected {}",
        data.len(),
        padded * rows
    );
    let mut pixels = Vec::with_capacity(unpadded * rows);
    for row in data.chunks_exact(padded).take(rows) {
        pixels.extend_from_slice(&row[..unpadded]);
    }
    Ok(pixels)
}
