//! Layers and the per-canvas paint-order stack.

use crate::handle::{CanvasId, InstanceId, LayerId};

/// An unordered bucket of instances drawn at one depth.
#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) canvas: CanvasId,
    pub(crate) instances: Vec<InstanceId>,
}

impl Layer {
    pub(crate) fn new(canvas: CanvasId) -> Self {
        Self {
            canvas,
            instances: Vec::new(),
        }
    }

    pub fn canvas(&self) -> CanvasId {
        self.canvas
    }

    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }

    /// Identity removal; returns whether the instance was present.
    pub(crate) fn remove_instance(&mut self, id: InstanceId) -> bool {
        match self.instances.iter().position(|i| *i == id) {
            Some(pos) => {
                self.instances.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Layers of one canvas in paint order: index 0 is the bottom (drawn
/// first, furthest back).
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    order: Vec<LayerId>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[LayerId] {
        &self.order
    }

    pub fn position(&self, layer: LayerId) -> Option<usize> {
        self.order.iter().position(|l| *l == layer)
    }

    pub fn push_bottom(&mut self, layer: LayerId) {
        self.order.insert(0, layer);
    }

    /// Insert directly below `upper`.  Returns false if `upper` is absent.
    pub fn insert_below(&mut self, layer: LayerId, upper: LayerId) -> bool {
        match self.position(upper) {
            Some(pos) => {
                self.order.insert(pos, layer);
                true
            }
            None => false,
        }
    }

    /// Place `layer` immediately above `other`, or at the bottom when
    /// `other` is `None`.  Returns false if either layer is absent.
    pub fn move_above(&mut self, layer: LayerId, other: Option<LayerId>) -> bool {
        let Some(from) = self.position(layer) else {
            return false;
        };

        let Some(other) = other else {
            self.order.remove(from);
            self.order.insert(0, layer);
            return true;
        };

        let Some(to) = self.position(other) else {
            return false;
        };
        if from == to + 1 {
            return true;
        }

        self.order.remove(from);
        // `other` shifted down by one if `layer` sat below it.
        let to = if from < to { to - 1 } else { to };
        self.order.insert(to + 1, layer);
        true
    }

    pub fn move_to_top(&mut self, layer: LayerId) -> bool {
        match self.position(layer) {
            Some(pos) => {
                self.order.remove(pos);
                self.order.push(layer);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, layer: LayerId) -> bool {
        match self.position(layer) {
            Some(pos) => {
                self.order.remove(pos);
                true
            }
            None => false,
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Key;

    fn ids(n: u32) -> Vec<LayerId> {
        (0..n).map(|i| LayerId::from_parts(i, 0)).collect()
    }

    #[test]
    fn test_push_bottom_order() {
        let l = ids(3);
        let mut stack = LayerStack::new();
        for id in &l {
            stack.push_bottom(*id);
        }
        assert_eq!(stack.as_slice(), &[l[2], l[1], l[0]]);
    }

    #[test]
    fn test_insert_below() {
        let l = ids(3);
        let mut stack = LayerStack::new();
        stack.push_bottom(l[0]);
        stack.push_bottom(l[1]); // [1, 0]
        assert!(stack.insert_below(l[2], l[0]));
        assert_eq!(stack.as_slice(), &[l[1], l[2], l[0]]);
    }

    #[test]
    fn test_move_above_down_and_up() {
        let l = ids(4);
        let mut stack = LayerStack { order: l.clone() };

        // Move top layer above the bottom one.
        assert!(stack.move_above(l[3], Some(l[0])));
        assert_eq!(stack.as_slice(), &[l[0], l[3], l[1], l[2]]);

        // Move bottom layer above the top one.
        assert!(stack.move_above(l[0], Some(l[2])));
        assert_eq!(stack.as_slice(), &[l[3], l[1], l[2], l[0]]);
    }

    #[test]
    fn test_move_above_noop() {
        let l = ids(3);
        let mut stack = LayerStack { order: l.clone() };
        assert!(stack.move_above(l[1], Some(l[0])));
        assert_eq!(stack.as_slice(), l.as_slice());
    }

    #[test]
    fn test_move_to_bottom_and_top() {
        let l = ids(3);
        let mut stack = LayerStack { order: l.clone() };
        assert!(stack.move_above(l[2], None));
        assert_eq!(stack.as_slice(), &[l[2], l[0], l[1]]);
        assert!(stack.move_to_top(l[2]));
        assert_eq!(stack.as_slice(), l.as_slice());
    }

    #[test]
    fn test_missing_layers() {
        let l = ids(3);
        let mut stack = LayerStack { order: vec![l[0], l[1]] };
        assert!(!stack.move_above(l[2], Some(l[0])));
        assert!(!stack.move_above(l[0], Some(l[2])));
        assert!(!stack.remove(l[2]));
        assert_eq!(stack.as_slice(), &[l[0], l[1]]);
    }
}
