//! Transient debug overlay primitives with absolute expiry times.

use crate::geometry::{Point, Rect};

pub type Rgba = [f32; 4];

#[derive(Clone, Debug, PartialEq)]
pub struct DebugRect {
    pub rect: Rect,
    pub color: Rgba,
    pub width: u32,
    pub filled: bool,
    pub relative: bool,
    /// Clock time (ms) at which the rect stops drawing.
    pub expiry: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DebugLine {
    pub start: Point,
    pub end: Point,
    pub color: Rgba,
    pub width: u32,
    pub relative: bool,
    pub expiry: u64,
}

/// Per-canvas store of debug rects and lines.
///
/// Insertion order is kept and is the draw order, but nothing depends on it.
#[derive(Clone, Debug, Default)]
pub struct DebugStore {
    rects: Vec<DebugRect>,
    lines: Vec<DebugLine>,
}

impl DebugStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_rect(&mut self, rect: DebugRect) {
        self.rects.push(rect);
    }

    pub fn insert_line(&mut self, line: DebugLine) {
        self.lines.push(line);
    }

    /// Rects still alive at `now`.
    pub fn live_rects(&self, now: u64) -> impl Iterator<Item = &DebugRect> {
        self.rects.iter().filter(move |r| now < r.expiry)
    }

    /// Lines still alive at `now`.
    pub fn live_lines(&self, now: u64) -> impl Iterator<Item = &DebugLine> {
        self.lines.iter().filter(move |l| now < l.expiry)
    }

    /// Drop everything with `expiry <= now`.  Returns how many were dropped.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let before = self.len();
        self.rects.retain(|r| now < r.expiry);
        self.lines.retain(|l| now < l.expiry);
        before - self.len()
    }

    pub fn len(&self) -> usize {
        self.rects.len() + self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(expiry: u64) -> DebugLine {
        DebugLine {
            start: Point::new(0, 0),
            end: Point::new(10, 10),
            color: [1.0; 4],
            width: 1,
            relative: false,
            expiry,
        }
    }

    #[test]
    fn test_live_excludes_at_expiry() {
        let mut store = DebugStore::new();
        store.insert_line(line(1500));
        assert_eq!(store.live_lines(1499).count(), 1);
        assert_eq!(store.live_lines(1500).count(), 0);
    }

    #[test]
    fn test_sweep_keeps_unexpired() {
        let mut store = DebugStore::new();
        store.insert_line(line(100));
        store.insert_line(line(200));
        store.insert_rect(DebugRect {
            rect: Rect::new(0, 0, 5, 5),
            color: [1.0; 4],
            width: 1,
            filled: true,
            relative: false,
            expiry: 150,
        });

        assert_eq!(store.sweep_expired(150), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.live_lines(150).next().map(|l| l.expiry), Some(200));
    }
}
