//! Opaque handle registry.
//!
//! Maps `(kind, native pointer)` to an arena slot so that resolving the same
//! pointer twice yields equal handles, and so that a released handle can be
//! detected instead of being passed back to native code. The arena and its
//! index sit behind a single lock: insertion on first resolution and removal
//! on release are atomic with respect to resolution.
//!
//! Borrowed handles (account ids decoded from callback info, interface
//! pointers) are never released, so their slots stay for the life of the
//! process. The arena is bounded by the number of distinct native pointers
//! seen per kind, not by how often they are resolved. Owned handles give
//! their slot back to the free list on release.

use std::any::TypeId;
use std::collections::HashMap;
use std::ffi::c_void;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::handle::{Handle, HandleKind};

/// Process-wide registry used by the marshalling codecs.
pub static HANDLES: Lazy<HandleRegistry> = Lazy::new(HandleRegistry::new);

struct Slot {
    id: usize,
    kind: TypeId,
    generation: u32,
    live: bool,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<(TypeId, usize), u32>,
}

impl Arena {
    fn check<K: HandleKind>(&self, handle: Handle<K>) -> Option<&Slot> {
        self.slots.get(handle.slot() as usize).filter(|slot| {
            slot.live
                && slot.generation == handle.generation()
                && slot.kind == TypeId::of::<K>()
                && slot.id == handle.id()
        })
    }
}

#[derive(Default)]
pub struct HandleRegistry {
    arena: RwLock<Arena>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the handle for a native pointer. Null maps to `None`.
    ///
    /// Resolving a pointer that is already indexed allocates nothing.
    pub fn resolve<K: HandleKind>(&self, raw: *mut c_void) -> Option<Handle<K>> {
        if raw.is_null() {
            return None;
        }
        let key = (TypeId::of::<K>(), raw as usize);

        {
            let arena = self.arena.read();
            if let Some(&slot) = arena.index.get(&key) {
                let generation = arena.slots[slot as usize].generation;
                return Some(Handle::new(key.1, slot, generation));
            }
        }

        let mut arena = self.arena.write();
        // Another thread may have inserted between the two locks.
        if let Some(&slot) = arena.index.get(&key) {
            let generation = arena.slots[slot as usize].generation;
            return Some(Handle::new(key.1, slot, generation));
        }

        let slot = match arena.free.pop() {
            Some(slot) => {
                let entry = &mut arena.slots[slot as usize];
                entry.id = key.1;
                entry.kind = key.0;
                entry.live = true;
                slot
            }
            None => {
                arena.slots.push(Slot {
                    id: key.1,
                    kind: key.0,
                    generation: 0,
                    live: true,
                });
                (arena.slots.len() - 1) as u32
            }
        };
        arena.index.insert(key, slot);
        let generation = arena.slots[slot as usize].generation;
        tracing::trace!("registered {} {:#x} in slot {slot}", K::NAME, key.1);
        Some(Handle::new(key.1, slot, generation))
    }

    /// Native pointer for a live handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was released; passing it on would hand native
    /// code a dangling pointer.
    pub fn raw<K: HandleKind>(&self, handle: Handle<K>) -> *mut c_void {
        let arena = self.arena.read();
        match arena.check(handle) {
            Some(slot) => slot.id as *mut c_void,
            None => panic!("use of released {} handle {:#x}", K::NAME, handle.id()),
        }
    }

    pub fn is_live<K: HandleKind>(&self, handle: Handle<K>) -> bool {
        self.arena.read().check(handle).is_some()
    }

    /// Invalidate a handle and every copy of it. Call after the native side
    /// has freed the object. Returns the native pointer.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already released.
    pub fn release<K: HandleKind>(&self, handle: Handle<K>) -> *mut c_void {
        let mut arena = self.arena.write();
        if arena.check(handle).is_none() {
            panic!("double release of {} handle {:#x}", K::NAME, handle.id());
        }
        let index = handle.slot() as usize;
        let slot = &mut arena.slots[index];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        arena.index.remove(&(TypeId::of::<K>(), handle.id()));
        arena.free.push(handle.slot());
        tracing::trace!("released {} {:#x} from slot {index}", K::NAME, handle.id());
        handle.id() as *mut c_void
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.arena.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::kinds;
    use std::sync::{Arc, Barrier};

    fn ptr(id: usize) -> *mut c_void {
        id as *mut c_void
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let registry = HandleRegistry::new();
        let a = registry.resolve::<kinds::ProductUser>(ptr(0x1000)).unwrap();
        let b = registry.resolve::<kinds::ProductUser>(ptr(0x1000)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.slot(), b.slot());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.raw(a), ptr(0x1000));
    }

    #[test]
    fn test_null_resolves_to_none() {
        let registry = HandleRegistry::new();
        assert!(registry.resolve::<kinds::Lobby>(std::ptr::null_mut()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_kinds_are_separate() {
        let registry = HandleRegistry::new();
        registry.resolve::<kinds::ProductUser>(ptr(0x2000)).unwrap();
        registry.resolve::<kinds::EpicAccount>(ptr(0x2000)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_invalidates_all_copies() {
        let registry = HandleRegistry::new();
        let a = registry.resolve::<kinds::LobbyModification>(ptr(0x3000)).unwrap();
        let b = registry.resolve::<kinds::LobbyModification>(ptr(0x3000)).unwrap();

        assert_eq!(registry.release(a), ptr(0x3000));
        assert!(!registry.is_live(a));
        assert!(!registry.is_live(b));
        assert!(registry.is_empty());
    }

    #[test]
    #[should_panic(expected = "use of released")]
    fn test_raw_of_released_handle_panics() {
        let registry = HandleRegistry::new();
        let a = registry.resolve::<kinds::Platform>(ptr(0x4000)).unwrap();
        registry.release(a);
        registry.raw(a);
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn test_double_release_panics() {
        let registry = HandleRegistry::new();
        let a = registry.resolve::<kinds::Platform>(ptr(0x4100)).unwrap();
        registry.release(a);
        registry.release(a);
    }

    #[test]
    fn test_slot_reuse_does_not_revive_old_handle() {
        let registry = HandleRegistry::new();
        let old = registry.resolve::<kinds::Ui>(ptr(0x5000)).unwrap();
        registry.release(old);

        let new = registry.resolve::<kinds::Ui>(ptr(0x5000)).unwrap();
        assert_eq!(old.slot(), new.slot());
        assert!(registry.is_live(new));
        assert!(!registry.is_live(old));
    }

    #[test]
    fn test_borrowed_ids_grow_only_with_distinct_pointers() {
        let registry = HandleRegistry::new();
        for _ in 0..50 {
            for addr in [0x7000, 0x7100, 0x7200] {
                registry.resolve::<kinds::ProductUser>(ptr(addr)).unwrap();
            }
        }
        assert_eq!(registry.len(), 3);

        let owned = registry.resolve::<kinds::LobbyModification>(ptr(0x7300)).unwrap();
        registry.release(owned);
        let next = registry.resolve::<kinds::LobbyModification>(ptr(0x7400)).unwrap();
        assert_eq!(next.slot(), owned.slot());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_concurrent_resolution_converges() {
        let registry = Arc::new(HandleRegistry::new());
        let barrier = Arc::new(Barrier::new(8));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let h = registry.resolve::<kinds::EpicAccount>(ptr(0x6000)).unwrap();
                    (h, h.slot(), h.generation())
                })
            })
            .collect();

        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        let (first, slot, generation) = results[0];
        for (h, s, g) in &results {
            assert_eq!(*h, first);
            assert_eq!(*s, slot);
            assert_eq!(*g, generation);
        }
        assert_eq!(registry.len(), 1);
    }
}
