//! Seam between the renderer core and the GPU API that executes it.
//!
//! The surface manager, background store, renderer and bridge only talk to
//! these traits. `gpu::WgpuBackend` is the production implementation; tests
//! plug in in-memory backends.

use crate::error::RenderError;
use crate::uniforms::RenderUniforms;

/// Anything that knows its pixel extent.
pub trait FrameTarget {
    fn size(&self) -> (u32, u32);
}

/// GPU operations the renderer needs, in the order a frame uses them.
pub trait RenderBackend {
    /// A GPU-writable surface the host can read without a copy. Clones must
    /// refer to the same GPU memory.
    type Surface: FrameTarget + Clone + Send + 'static;
    /// A read-only background texture plus whatever sampling state it needs.
    type Background;

    /// Allocates a surface and its texture view in one step.
    fn allocate_surface(&mut self, width: u32, height: u32) -> Result<Self::Surface, RenderError>;

    /// Uploads tightly packed RGBA8 rows (`width * 4` bytes per row).
    fn upload_background(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self::Background, RenderError>;

    /// Runs the lensing kernel over `surface` and returns only once the GPU
    /// has finished writing it.
    fn dispatch(
        &mut self,
        surface: &Self::Surface,
        uniforms: &RenderUniforms,
        background: Option<&Self::Background>,
    ) -> Result<(), RenderError>;
}

/// Acquires a device and builds the fixed pipeline state for a new renderer.
pub trait BackendFactory {
    type Backend: RenderBackend;

    fn create(&self) -> Result<Self::Backend, RenderError>;

    /// Cheap availability check that does not build any pipeline state.
    fn probe(&self) -> bool;
}
