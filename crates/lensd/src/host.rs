//! The headless stand-in for a UI host: a texture table that logs frame
//! notifications and can dump each notified frame to disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use lensing::{FrameSource, FrameSurface, FrameTarget, RendererHandle, TextureRegistry};

struct Entry {
    source: FrameSource<FrameSurface>,
    frames: u64,
}

pub struct HeadlessRegistry {
    next_id: i64,
    entries: HashMap<RendererHandle, Entry>,
    export_dir: Option<PathBuf>,
}

impl HeadlessRegistry {
    pub fn new(export_dir: Option<PathBuf>) -> Self {
        Self {
            next_id: 0,
            entries: HashMap::new(),
            export_dir,
        }
    }

    /// Latest completed frame for `handle`, if any.
    pub fn latest_frame(&self, handle: RendererHandle) -> Option<FrameSurface> {
        self.entries
            .get(&handle)
            .and_then(|entry| entry.source.copy_frame())
    }

    fn export(
        dir: &Path,
        handle: RendererHandle,
        frame: u64,
        surface: &FrameSurface,
    ) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create export directory {}", dir.display()))?;
        let path = dir.join(frame_file_name(handle, frame));
        save_surface_png(surface, &path)?;
        Ok(path)
    }
}

impl TextureRegistry<FrameSurface> for HeadlessRegistry {
    fn register_texture(&mut self, source: FrameSource<FrameSurface>) -> RendererHandle {
        self.next_id += 1;
        let handle = RendererHandle(self.next_id);
        self.entries.insert(handle, Entry { source, frames: 0 });
        tracing::debug!(%handle, "texture registered");
        handle
    }

    fn texture_frame_available(&mut self, handle: RendererHandle) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            tracing::warn!(%handle, "frame notification for unregistered texture");
            return;
        };
        entry.frames += 1;
        let frame = entry.frames;
        // A render whose resize failed still notifies, with nothing to read.
        let Some(surface) = entry.source.copy_frame() else {
            tracing::info!(%handle, frame, "frame available but empty");
            return;
        };
        tracing::info!(%handle, frame, "frame available");

        if let Some(dir) = self.export_dir.as_deref() {
            match Self::export(dir, handle, frame, &surface) {
                Ok(path) => tracing::info!(%handle, path = %path.display(), "exported frame"),
                Err(err) => tracing::warn!(%handle, error = %err, "frame export failed"),
            }
        }
    }

    fn unregister_texture(&mut self, handle: RendererHandle) {
        if let Some(entry) = self.entries.remove(&handle) {
            tracing::debug!(%handle, frames = entry.frames, "texture unregistered");
        }
    }
}

pub fn frame_file_name(handle: RendererHandle, frame: u64) -> String {
    format!("frame-{}-{frame:05}.png", handle.0)
}

/// Reads `surface` back from the GPU and writes it as PNG.
pub fn save_surface_png(surface: &FrameSurface, path: &Path) -> Result<()> {
    let (width, height) = surface.size();
    let pixels = surface.read_rgba().context("failed to read frame back")?;
    save_rgba_png(pixels, width, height, path)
}

pub fn save_rgba_png(pixels: Vec<u8>, width: u32, height: u32, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height}"))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Decodes an image file into tightly packed RGBA8 rows.
pub fn load_rgba(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::open(path)
        .with_context(|| format!("failed to open background image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok((image.into_raw(), width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn frame_names_sort_by_frame_number() {
        assert_eq!(frame_file_name(RendererHandle(3), 7), "frame-3-00007.png");
        assert!(frame_file_name(RendererHandle(1), 9) < frame_file_name(RendererHandle(1), 10));
    }

    #[test]
    fn png_round_trips_through_loader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bg.png");
        let pixels: Vec<u8> = (0..2 * 3 * 4).map(|value| value as u8 * 10).collect();
        save_rgba_png(pixels.clone(), 2, 3, &path).unwrap();

        let (loaded, width, height) = load_rgba(&path).unwrap();
        assert_eq!((width, height), (2, 3));
        assert_eq!(loaded, pixels);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = save_rgba_png(vec![0; 7], 2, 1, &dir.path().join("x.png")).unwrap_err();
        assert!(err.to_string().contains("2x1"));
    }

    #[test]
    fn notifications_for_unknown_handles_are_ignored() {
        let mut registry = HeadlessRegistry::new(None);
        registry.texture_frame_available(RendererHandle(9));
        assert!(registry.entries.is_empty());
        assert!(registry.latest_frame(RendererHandle(9)).is_none());
    }
}
