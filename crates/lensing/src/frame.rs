use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::backend::{FrameTarget, RenderBackend};
use crate::error::RenderError;

/// Outcome of [`SurfaceManager::ensure_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// The held surface already had the requested size.
    Reused,
    /// A new surface replaced (or created) the held one.
    Allocated,
}

/// Owns the single frame surface of a renderer.
///
/// The surface and its texture view are created together by the backend, so
/// holding one `S` keeps both in sync. After a failed allocation the manager
/// holds nothing and the next call starts from scratch.
pub struct SurfaceManager<S> {
    current: Option<S>,
    allocations: u64,
}

impl<S: FrameTarget + Clone> SurfaceManager<S> {
    pub fn new() -> Self {
        Self {
            current: None,
            allocations: 0,
        }
    }

    /// Makes sure a `width`x`height` surface is held.
    ///
    /// Callers validate that both dimensions are non-zero.
    pub fn ensure_size<B>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<SurfaceState, RenderError>
    where
        B: RenderBackend<Surface = S>,
    {
        if let Some(current) = &self.current {
            if current.size() == (width, height) {
                return Ok(SurfaceState::Reused);
            }
        }

        if let Some(previous) = self.current.take() {
            let (old_width, old_height) = previous.size();
            debug!(old_width, old_height, width, height, "releasing frame surface");
        }

        match backend.allocate_surface(width, height) {
            Ok(surface) => {
                self.allocations += 1;
                debug!(width, height, allocations = self.allocations, "allocated frame surface");
                self.current = Some(surface);
                Ok(SurfaceState::Allocated)
            }
            Err(err) => {
                warn!(width, height, error = %err, "frame surface allocation failed");
                Err(err)
            }
        }
    }

    pub fn surface(&self) -> Option<&S> {
        self.current.as_ref()
    }

    /// Number of successful allocations over the manager's lifetime.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn release(&mut self) {
        self.current = None;
    }
}

impl<S: FrameTarget + Clone> Default for SurfaceManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-side view of a renderer's surface.
///
/// This is what gets handed to the texture registry. The renderer publishes
/// a surface here only after a dispatch into it has completed, so whatever
/// `copy_frame` returns is never being written by the GPU.
pub struct FrameSource<S> {
    slot: Arc<Mutex<Option<S>>>,
}

impl<S: Clone> FrameSource<S> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a handle to the latest completed frame, sharing its GPU memory.
    pub fn copy_frame(&self) -> Option<S> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish(&self, surface: S) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(surface);
    }

    pub(crate) fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<S> Clone for FrameSource<S> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}
