use crate::frame::FrameSource;
use crate::types::RendererHandle;

/// The host's external-texture table, as seen by the bridge.
///
/// Hosts implement this over whatever compositor or UI toolkit consumes the
/// frames. The bridge registers one source per renderer, signals once per
/// successful `render` and unregisters on dispose.
pub trait TextureRegistry<S> {
    /// Adds `source` to the table and returns the id it is addressed by.
    fn register_texture(&mut self, source: FrameSource<S>) -> RendererHandle;

    /// `handle`'s source may be read right away. It is empty if the last
    /// `render` could not hold a surface at the requested size.
    fn texture_frame_available(&mut self, handle: RendererHandle);

    fn unregister_texture(&mut self, handle: RendererHandle);
}
