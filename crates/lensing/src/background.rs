use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::RenderBackend;

/// Byte length of a tightly packed RGBA8 image, or `None` if it does not fit
/// in `usize`.
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
}

/// A static background image uploaded once and sampled by every frame.
pub struct BackgroundTexture<T> {
    pub width: u32,
    pub height: u32,
    pixels: Arc<[u8]>,
    gpu: T,
}

impl<T> BackgroundTexture<T> {
    /// The RGBA8 bytes the GPU texture was filled from.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn gpu(&self) -> &T {
        &self.gpu
    }
}

/// Holds at most one background per renderer.
///
/// Uploads are all-or-nothing: a failed upload keeps the previously bound
/// background, since losing the backdrop must never stop the lensing render.
pub struct BackgroundStore<T> {
    current: Option<BackgroundTexture<T>>,
}

impl<T> BackgroundStore<T> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Replaces the background with `pixels` (`width * height * 4` bytes,
    /// row-major). Returns whether the new image is now bound.
    pub fn upload<B>(&mut self, backend: &mut B, pixels: &[u8], width: u32, height: u32) -> bool
    where
        B: RenderBackend<Background = T>,
    {
        let expected = rgba_len(width, height);
        if width == 0 || height == 0 || expected != Some(pixels.len()) {
            warn!(
                width,
                height,
                expected = ?expected,
                actual = pixels.len(),
                "background upload ignored due to mismatched payload size"
            );
            return false;
        }

        match backend.upload_background(pixels, width, height) {
            Ok(gpu) => {
                debug!(width, height, "background texture uploaded");
                self.current = Some(BackgroundTexture {
                    width,
                    height,
                    pixels: Arc::from(pixels),
                    gpu,
                });
                true
            }
            Err(err) => {
                warn!(
                    width,
                    height,
                    error = %err,
                    kept_previous = self.current.is_some(),
                    "background upload failed; keeping previous background"
                );
                false
            }
        }
    }

    pub fn current(&self) -> Option<&BackgroundTexture<T>> {
        self.current.as_ref()
    }

    /// Dimensions of the bound background, as the uniform builder wants them.
    pub fn extent(&self) -> Option<(u32, u32)> {
        self.current
            .as_ref()
            .map(|background| (background.width, background.height))
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl<T> Default for BackgroundStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
