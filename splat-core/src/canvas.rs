//! Per-canvas view state, layer stack and debug overlay store.

use crate::debug::{DebugStore, Rgba};
use crate::geometry::Point;
use crate::layer::LayerStack;

/// Smallest accepted view scale on either axis.
pub const MIN_VIEW_SCALE: f32 = 0.01;

/// Texture sampling used for the scene pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Clone, Debug)]
pub struct Canvas {
    pub(crate) view_origin: Point,
    pub(crate) scale: [f32; 2],
    pub(crate) clear_color: Rgba,
    pub(crate) filter: FilterMode,
    pub(crate) layers: LayerStack,
    pub(crate) debug: DebugStore,
    pub(crate) post_process: Option<String>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            view_origin: Point::default(),
            scale: [1.0, 1.0],
            clear_color: [0.0, 0.0, 0.0, 1.0],
            filter: FilterMode::Nearest,
            layers: LayerStack::new(),
            debug: DebugStore::new(),
            post_process: None,
        }
    }

    pub fn view_origin(&self) -> Point {
        self.view_origin
    }

    pub fn scale(&self) -> [f32; 2] {
        self.scale
    }

    pub fn clear_color(&self) -> Rgba {
        self.clear_color
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn debug(&self) -> &DebugStore {
        &self.debug
    }

    /// WGSL fragment source run by the present pass, if any.
    pub fn post_process(&self) -> Option<&str> {
        self.post_process.as_deref()
    }

    /// Clamped to [`MIN_VIEW_SCALE`] per axis; NaN clamps too.
    pub(crate) fn set_scale(&mut self, x: f32, y: f32) {
        self.scale = [clamp_scale(x), clamp_scale(y)];
    }

    pub(crate) fn set_clear_color(&mut self, color: Rgba) {
        self.clear_color = clamp_color(color);
    }
}

fn clamp_scale(v: f32) -> f32 {
    if v >= MIN_VIEW_SCALE {
        v
    } else {
        MIN_VIEW_SCALE
    }
}

/// Each channel into [0, 1]; NaN becomes 0.
pub(crate) fn clamp_color(color: Rgba) -> Rgba {
    color.map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_clamped() {
        let mut canvas = Canvas::new();
        canvas.set_scale(0.0, -5.0);
        assert_eq!(canvas.scale(), [MIN_VIEW_SCALE, MIN_VIEW_SCALE]);
        canvas.set_scale(f32::NAN, 3.0);
        assert_eq!(canvas.scale(), [MIN_VIEW_SCALE, 3.0]);
    }

    #[test]
    fn test_clear_color_clamped() {
        let mut canvas = Canvas::new();
        canvas.set_clear_color([-1.0, 0.5, 2.0, f32::NAN]);
        assert_eq!(canvas.clear_color(), [0.0, 0.5, 1.0, 0.0]);
    }
}
