//! # splat-core
//!
//! State model for Splat, a layered 2D sprite renderer.
//!
//! ## Architecture
//!
//! ```text
//!  Scene                          ◀─── owns everything, validates every call
//!   ├── Canvas                    ◀─── view origin/scale, clear colour
//!   │    ├── LayerStack           ◀─── paint order, bottom first
//!   │    └── DebugStore           ◀─── rects/lines with expiry times
//!   ├── Layer ──▶ [InstanceId]
//!   ├── Image ──▶ TextureId       ◀─── issued by a TextureUploader
//!   └── Instance                  ◀─── image region + position/scale/flags
//! ```
//!
//! Nothing here touches the GPU.  `splat-render` reads a `Scene` and turns
//! it into draw calls; textures come in through the [`TextureUploader`]
//! seam so the model can be exercised headless.
//!
//! ## Crate modules
//!
//! - [`scene`] — the aggregate root and every public operation
//! - [`handle`] — generation-checked ids and their arena
//! - [`canvas`], [`layer`], [`instance`], [`debug`] — owned records
//! - [`flags`] — instance/debug flag bits and sprite transform decoding
//! - [`geometry`] — rects, mirror/rotate matrices, scissor mapping
//! - [`surface`] — pixel surfaces and the uploader trait
//! - [`clock`] — millisecond time source for debug expiry
//! - [`error`] — `SplatError` and the sticky last-error record

pub mod canvas;
pub mod clock;
pub mod debug;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod handle;
pub mod instance;
pub mod layer;
pub mod scene;
pub mod surface;

// Re-exports for convenience
pub use canvas::{Canvas, FilterMode, MIN_VIEW_SCALE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debug::{DebugLine, DebugRect, DebugStore, Rgba};
pub use error::{clear_last_error, last_error, SplatError};
pub use flags::{Flags, Mirror, SpriteTransform};
pub use geometry::{Bounds, Point, Rect, ScissorRect};
pub use handle::{CanvasId, ImageId, InstanceId, LayerId};
pub use instance::{Image, Instance, TexRegion};
pub use layer::{Layer, LayerStack};
pub use scene::Scene;
pub use surface::{HeadlessUploader, PixelLayout, PixelSurface, TextureId, TextureUploader};
