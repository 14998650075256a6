//! Generation-tagged handles and the generational arena backing them.
//!
//! Every GPU resource is identified by a [`Handle`]: an (index, generation)
//! pair into a [`Slab`]. A handle is valid only while its generation matches
//! the slot's current generation; removing a value bumps the slot generation,
//! so a stale handle to a reused slot is detectable rather than silently
//! aliasing the new occupant.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Opaque identifier for a resource of kind `T`.
///
/// The kind parameter is a phantom marker (for example [`crate::types::Texture`]);
/// it exists purely so handles to different resource kinds cannot be mixed up.
/// Handles are `Copy` and hashable regardless of `T`.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> T>,
}

// Manual impls: deriving would bound them on `T`, but the marker carries no data.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

impl<T> Handle<T> {
    /// Reassemble a handle from its raw parts.
    ///
    /// Only backends should need this, e.g. to translate between the public
    /// handle kind and their internal storage key.
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    /// Slot index inside the owning slab.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the handle was minted with.
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Reinterpret this handle as a handle of a different kind.
    ///
    /// Backends use this to key their internal slabs (which store native
    /// objects) with the public-facing handle kinds.
    pub const fn cast<U>(self) -> Handle<U> {
        Handle {
            index: self.index,
            generation: self.generation,
            _kind: PhantomData,
        }
    }
}

struct Slot<V> {
    generation: u32,
    value: Option<V>,
}

/// Generational arena owning all live instances of `V`, keyed by `Handle<K>`.
///
/// `insert` returns a fresh handle; `remove` invalidates the handle (bumping
/// the slot generation) and returns ownership of the removed value so callers
/// can defer its destruction. Freed slots are reused in LIFO order.
pub struct Slab<K, V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K, V> Default for Slab<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Slab<K, V> {
    /// Create an empty slab.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _kind: PhantomData,
        }
    }

    /// Insert a value, returning a handle valid until the value is removed.
    pub fn insert(&mut self, value: V) -> Handle<K> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free list pointed at a live slot");
            slot.value = Some(value);
            return Handle::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::from_parts(index, 0)
    }

    /// True while `handle` refers to a live value.
    pub fn is_valid(&self, handle: Handle<K>) -> bool {
        self.slots
            .get(handle.index() as usize)
            .is_some_and(|slot| slot.generation == handle.generation() && slot.value.is_some())
    }

    /// Borrow the value behind `handle`, or `None` if the handle is stale.
    pub fn get(&self, handle: Handle<K>) -> Option<&V> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutably borrow the value behind `handle`, or `None` if the handle is stale.
    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut V> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Remove the value behind `handle`, invalidating it.
    ///
    /// The slot generation is bumped immediately, so the handle (and any copy
    /// of it) fails `is_valid` from this point on even after the slot is
    /// reused. Returns the removed value for deferred destruction.
    pub fn remove(&mut self, handle: Handle<K>) -> Option<V> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.len -= 1;
        value
    }

    /// Remove every live value, invalidating all outstanding handles.
    ///
    /// Returns the removed values so the caller can destroy them.
    pub fn drain_all(&mut self) -> Vec<V> {
        let mut values = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                values.push(value);
            }
        }
        self.len = 0;
        values
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no values are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over live values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Kind;

    #[test]
    fn insert_and_get() {
        let mut slab: Slab<Kind, u32> = Slab::new();
        let handle = slab.insert(7);
        assert!(slab.is_valid(handle));
        assert_eq!(slab.get(handle), Some(&7));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn remove_invalidates() {
        let mut slab: Slab<Kind, u32> = Slab::new();
        let handle = slab.insert(1);
        assert_eq!(slab.remove(handle), Some(1));
        assert!(!slab.is_valid(handle));
        assert_eq!(slab.get(handle), None);
        assert_eq!(slab.remove(handle), None);
        assert!(slab.is_empty());
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut slab: Slab<Kind, u32> = Slab::new();
        let first = slab.insert(1);
        slab.remove(first);
        let second = slab.insert(2);
        // LIFO free list reuses the same slot.
        assert_eq!(first.index(), second.index());
        assert!(second.generation() > first.generation());
        assert!(!slab.is_valid(first));
        assert!(slab.is_valid(second));
        assert_eq!(slab.get(second), Some(&2));
    }

    #[test]
    fn generation_strictly_increases_across_reuse() {
        let mut slab: Slab<Kind, u32> = Slab::new();
        let mut previous = slab.insert(0);
        for round in 1..5u32 {
            slab.remove(previous);
            let next = slab.insert(round);
            assert_eq!(next.index(), previous.index());
            assert!(next.generation() > previous.generation());
            previous = next;
        }
    }

    #[test]
    fn drain_all_invalidates_everything() {
        let mut slab: Slab<Kind, u32> = Slab::new();
        let handles: Vec<_> = (0..4).map(|value| slab.insert(value)).collect();
        let mut drained = slab.drain_all();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(handles.iter().all(|&handle| !slab.is_valid(handle)));
        assert!(slab.is_empty());
    }

    #[test]
    fn handles_are_kind_scoped() {
        struct Other;
        let handle: Handle<Kind> = Handle::from_parts(3, 1);
        let cast: Handle<Other> = handle.cast();
        assert_eq!(cast.index(), 3);
        assert_eq!(cast.generation(), 1);
    }
}
