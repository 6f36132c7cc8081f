//! Generation-checked handles and the arena that hands them out.
//!
//! Each handle is a slot index plus the slot's generation at the time the
//! value was inserted.  Removing a value bumps the generation, so a stale
//! handle simply misses instead of aliasing whatever reuses the slot.

use std::fmt;
use std::marker::PhantomData;

/// Implemented by the typed id wrappers below.
pub trait Key: Copy + Eq {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(self) -> u32;
    fn generation(self) -> u32;
}

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            idx: u32,
            generation: u32,
        }

        impl Key for $name {
            #[inline]
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { idx: index, generation }
            }

            #[inline]
            fn index(self) -> u32 {
                self.idx
            }

            #[inline]
            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}@gen{})", stringify!($name), self.idx, self.generation)
            }
        }
    };
}

define_key!(
    /// Handle to a [`Canvas`](crate::Canvas).
    CanvasId
);
define_key!(
    /// Handle to a [`Layer`](crate::Layer).
    LayerId
);
define_key!(
    /// Handle to an [`Image`](crate::Image).
    ImageId
);
define_key!(
    /// Handle to an [`Instance`](crate::Instance).
    InstanceId
);

struct Slot<V> {
    generation: u32,
    value: Option<V>,
}

/// Slot storage with a free list.
pub struct Arena<K: Key, V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K: Key, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V> Arena<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    pub fn insert(&mut self, value: V) -> K {
        self.len += 1;
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.value = Some(value);
            return K::from_parts(idx, slot.generation);
        }

        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        K::from_parts(idx, 0)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index());
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.slots
            .get(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots
            .get_mut(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.value
                .as_ref()
                .map(|value| (K::from_parts(idx as u32, slot.generation), value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> {
        self.slots.iter_mut().enumerate().filter_map(|(idx, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (K::from_parts(idx as u32, generation), value))
        })
    }
}

// ===================================================================
// Tests
// ===================================================================
