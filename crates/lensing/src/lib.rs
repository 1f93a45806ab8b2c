//! GPU gravitational-lensing renderer.
//!
//! A renderer owns one GPU-resident frame surface, an optional background
//! texture and a compute kernel that raymarches light around a black hole.
//! Finished frames are handed to the host by reference, never by copying
//! pixels. The overall flow is:
//!
//! ```text
//!   host command layer
//!          │ Request
//!          ▼
//!   Bridge::handle ──▶ Renderer::render ──▶ SurfaceManager::ensure_size
//!          │                  │
//!          │                  ├─▶ RenderUniforms::build
//!          │                  └─▶ RenderBackend::dispatch (blocks until done)
//!          ▼
//!   TextureRegistry::texture_frame_available ──▶ host reads FrameSource
//! ```
//!
//! Everything above the `RenderBackend` seam is GPU-agnostic; [`gpu`] holds
//! the `wgpu` implementation.

pub mod backend;
pub mod background;
pub mod bridge;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod renderer;
pub mod types;
pub mod uniforms;

pub use backend::{BackendFactory, FrameTarget, RenderBackend};
pub use background::{BackgroundStore, BackgroundTexture};
pub use bridge::{Bridge, BridgeError, Reply, Request, Response, TextureRegistry};
pub use error::{ErrorCode, RenderError};
pub use frame::{FrameSource, SurfaceManager, SurfaceState};
pub use gpu::{FrameSurface, WgpuBackend, WgpuFactory};
pub use renderer::{FrameOutcome, Renderer};
pub use types::{
    BackgroundFilter, CameraParams, GpuMemoryMode, GpuPowerPreference, RendererHandle,
    RendererSettings,
};
pub use uniforms::RenderUniforms;
