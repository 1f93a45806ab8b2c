use tracing::{debug, warn};

use crate::backend::RenderBackend;
use crate::background::{BackgroundStore, BackgroundTexture};
use crate::error::RenderError;
use crate::frame::{FrameSource, SurfaceManager, SurfaceState};
use crate::types::CameraParams;
use crate::uniforms::RenderUniforms;

/// What a `render` call did with the frame surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The kernel finished writing the surface and it is now published.
    Published,
    /// No surface could be held at the requested size, so nothing ran and
    /// the published frame was withdrawn.
    Skipped,
}

/// One lensing renderer: a backend, its single frame surface and an
/// optional background.
///
/// Every method runs on the caller's thread and `render` returns only once
/// the GPU has finished, so no fencing is needed between dispatch and
/// publication.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    surfaces: SurfaceManager<B::Surface>,
    background: BackgroundStore<B::Background>,
    source: FrameSource<B::Surface>,
    frames: u64,
}

impl<B: RenderBackend> Renderer<B> {
    /// Wraps `backend` and allocates the initial `width`x`height` surface.
    pub fn new(mut backend: B, width: u32, height: u32) -> Result<Self, RenderError> {
        let mut surfaces = SurfaceManager::new();
        surfaces.ensure_size(&mut backend, width, height)?;
        Ok(Self {
            backend,
            surfaces,
            background: BackgroundStore::new(),
            source: FrameSource::new(),
            frames: 0,
        })
    }

    /// Best-effort background replacement; see [`BackgroundStore::upload`].
    pub fn set_background(&mut self, pixels: &[u8], width: u32, height: u32) -> bool {
        self.background
            .upload(&mut self.backend, pixels, width, height)
    }

    /// Resizes if needed, runs the kernel and publishes the finished frame.
    ///
    /// A failed resize is not an error for the caller: the frame is skipped
    /// and the frame source is emptied. A failed dispatch is reported and
    /// leaves the previously published frame in place.
    pub fn render(
        &mut self,
        camera: &CameraParams,
        width: u32,
        height: u32,
    ) -> Result<FrameOutcome, RenderError> {
        match self.surfaces.ensure_size(&mut self.backend, width, height) {
            Ok(SurfaceState::Reused) | Ok(SurfaceState::Allocated) => {}
            Err(err) => {
                warn!(width, height, error = %err, "skipping frame; no surface at requested size");
                self.source.clear();
                return Ok(FrameOutcome::Skipped);
            }
        }
        let Some(surface) = self.surfaces.surface() else {
            return Ok(FrameOutcome::Skipped);
        };

        let uniforms = RenderUniforms::build(camera, width, height, self.background.extent());
        let background = self.background.current().map(BackgroundTexture::gpu);
        self.backend.dispatch(surface, &uniforms, background)?;

        self.source.publish(surface.clone());
        self.frames += 1;
        debug!(
            width,
            height,
            frame = self.frames,
            has_background = uniforms.has_background(),
            "frame rendered"
        );
        Ok(FrameOutcome::Published)
    }

    /// The host-side read handle for this renderer's frames.
    pub fn frame_source(&self) -> FrameSource<B::Surface> {
        self.source.clone()
    }

    pub fn surface(&self) -> Option<&B::Surface> {
        self.surfaces.surface()
    }

    pub fn surface_allocations(&self) -> u64 {
        self.surfaces.allocations()
    }

    pub fn background(&self) -> Option<&BackgroundTexture<B::Background>> {
        self.background.current()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Drops every GPU resource and empties the host-side slot.
    pub fn dispose(mut self) {
        self.source.clear();
        self.surfaces.release();
        self.background.clear();
        debug!(frames = self.frames, "renderer disposed");
    }
}
