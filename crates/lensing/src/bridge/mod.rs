//! Host-facing adapter: an explicit handle table plus the four lifecycle
//! operations (`create`, `setBackground`, `render`, `dispose`).
//!
//! ```text
//!   command layer ── Request ──▶ Bridge::handle
//!                                   │
//!                 ┌─────────────────┼──────────────────────┐
//!                 ▼                 ▼                      ▼
//!          BackendFactory   renderers[handle]      TextureRegistry
//!          (device + PSO)   (surface, background)  (register / frame ready)
//! ```
//!
//! Calls arrive serialised on one control thread; the bridge itself holds no
//! locks. A handle stays valid from a successful `create` until `dispose`,
//! after which every call with it answers `no_tex`.

mod protocol;
mod registry;

pub use protocol::{surface_extent, BridgeError, RenderArgs, Reply, Request, Response, METHODS};
pub use registry::TextureRegistry;

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::backend::{BackendFactory, RenderBackend};
use crate::background::rgba_len;
use crate::error::RenderError;
use crate::renderer::{FrameOutcome, Renderer};
use crate::types::RendererHandle;

type SurfaceOf<F> = <<F as BackendFactory>::Backend as RenderBackend>::Surface;

pub struct Bridge<F, R>
where
    F: BackendFactory,
    R: TextureRegistry<SurfaceOf<F>>,
{
    factory: F,
    registry: R,
    renderers: HashMap<RendererHandle, Renderer<F::Backend>>,
}

impl<F, R> Bridge<F, R>
where
    F: BackendFactory,
    R: TextureRegistry<SurfaceOf<F>>,
{
    pub fn new(factory: F, registry: R) -> Self {
        Self {
            factory,
            registry,
            renderers: HashMap::new(),
        }
    }

    /// Executes one decoded request.
    pub fn handle(&mut self, request: Request) -> Response {
        let method = request.method();
        let result = match request {
            Request::Create { width, height } => self.create(width, height).map(Reply::Handle),
            Request::SetBackground {
                handle,
                width,
                height,
                rgba,
            } => self
                .set_background(handle, width, height, &rgba)
                .map(|()| Reply::Unit),
            Request::Render(args) => self.render(&args).map(|()| Reply::Unit),
            Request::Dispose { handle } => {
                self.dispose(handle);
                Ok(Reply::Unit)
            }
            Request::Probe => Ok(Reply::Available(self.factory.probe())),
        };
        if let Err(err) = &result {
            debug!(method, code = %err.code, message = %err.message, "request failed");
        }
        result.into()
    }

    /// Acquires a device, allocates the first surface and registers it with
    /// the host. Nothing is registered unless every step succeeds.
    pub fn create(&mut self, width: i64, height: i64) -> Result<RendererHandle, BridgeError> {
        let (width, height) = surface_extent(width, height)?;
        let backend = self.factory.create()?;
        let renderer = Renderer::new(backend, width, height)?;
        let handle = self.registry.register_texture(renderer.frame_source());
        if let Some(stale) = self.renderers.insert(handle, renderer) {
            warn!(%handle, "registry reused a live handle; disposing the previous renderer");
            stale.dispose();
        }
        info!(%handle, width, height, "renderer created");
        Ok(handle)
    }

    /// Replaces the background for `handle`. Argument problems are reported;
    /// GPU-side upload failures are swallowed by the renderer.
    pub fn set_background(
        &mut self,
        handle: RendererHandle,
        width: i64,
        height: i64,
        rgba: &[u8],
    ) -> Result<(), BridgeError> {
        let renderer = self
            .renderers
            .get_mut(&handle)
            .ok_or(RenderError::NotInitialized(handle))?;
        let (width, height) = surface_extent(width, height)?;
        let Some(expected) = rgba_len(width, height) else {
            return Err(RenderError::invalid(format!(
                "background of {width}x{height} is too large to address"
            ))
            .into());
        };
        if rgba.len() != expected {
            return Err(RenderError::invalid(format!(
                "rgba payload is {} bytes, expected {expected} for {width}x{height}",
                rgba.len()
            ))
            .into());
        }
        renderer.set_background(rgba, width, height);
        Ok(())
    }

    /// Renders one frame and tells the host exactly once per successful call.
    /// A skipped frame still notifies; the host's frame slot is then empty.
    pub fn render(&mut self, args: &RenderArgs) -> Result<(), BridgeError> {
        let handle = args.handle;
        let renderer = self
            .renderers
            .get_mut(&handle)
            .ok_or(RenderError::NotInitialized(handle))?;
        let (width, height) = args.extent()?;
        let camera = args.camera()?;
        if renderer.render(&camera, width, height)? == FrameOutcome::Skipped {
            debug!(%handle, width, height, "frame skipped; notifying with no frame");
        }
        self.registry.texture_frame_available(handle);
        Ok(())
    }

    /// Unregisters and releases `handle`. Unknown handles are ignored.
    pub fn dispose(&mut self, handle: RendererHandle) {
        match self.renderers.remove(&handle) {
            Some(renderer) => {
                self.registry.unregister_texture(handle);
                let frames = renderer.frames_rendered();
                renderer.dispose();
                info!(%handle, frames, "renderer disposed");
            }
            None => debug!(%handle, "dispose for unknown handle ignored"),
        }
    }

    pub fn renderer(&self, handle: RendererHandle) -> Option<&Renderer<F::Backend>> {
        self.renderers.get(&handle)
    }

    pub fn live_handles(&self) -> impl Iterator<Item = RendererHandle> + '_ {
        self.renderers.keys().copied()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Disposes every live renderer, e.g. when the host shuts down.
    pub fn dispose_all(&mut self) {
        let handles: Vec<_> = self.renderers.keys().copied().collect();
        for handle in handles {
            self.dispose(handle);
        }
    }
}
