//! # splat-render
//!
//! wgpu render engine for Splat scenes.
//!
//! ## Architecture
//!
//! ```text
//!  Scene (splat-core)
//!       │
//!       ▼
//!  frame::compose()                 ◀─── layers → sprite batches + overlay,
//!       │                                sweeps expired debug primitives
//!       ▼
//!  scene pass  → offscreen target   ◀─── fixed viewport, one draw per batch
//!       │
//!       ▼
//!  present pass → surface/texture   ◀─── nearest blit, optional post-process
//! ```
//!
//! ## Crate modules
//!
//! - [`context`] — GPU device/queue/surface initialisation
//! - [`vertex`] — vertex and uniform data types
//! - [`frame`] — CPU frame composition, batching and culling
//! - [`textures`] — GPU texture cache and the wgpu texture uploader
//! - [`pipelines`] — sprite, debug overlay and present pipelines
//! - [`renderer`] — high-level frame orchestration

pub mod context;
pub mod frame;
pub mod pipelines;
pub mod renderer;
pub mod textures;
pub mod vertex;

// Re-exports for convenience
pub use context::{GpuContext, GpuError};
pub use frame::{Frame, FrameStats, SpriteBatch};
pub use renderer::{RenderError, Renderer, RendererConfig, OFFSCREEN_FORMAT};
pub use textures::{GpuUploader, TextureCache};
pub use vertex::{CameraUniform, DebugVertex, PresentUniform, SpriteVertex};
