//! Slot arena with stable integer handles.
//!
//! Vacant slots form a singly linked free list threaded through the slots
//! themselves. When the list runs dry the backing vector doubles and the new
//! slots are threaded onto the list. Handles are indices, so growth never
//! invalidates them even though the storage moves.

use std::ops::{Index, IndexMut};

const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied(T),
    Vacant { next: Option<usize> },
}

#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    next_free: Option<usize>,
    len: usize,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            next_free: None,
            len: 0,
        };
        pool.grow_to(capacity.max(1));
        pool
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.len() - self.len
    }

    /// Stores `value` and returns a handle valid until [`Pool::remove`].
    pub fn push(&mut self, value: T) -> usize {
        if self.next_free.is_none() {
            let doubled = self.slots.len() * 2;
            self.grow_to(doubled);
        }

        let handle = match self.next_free {
            Some(handle) => handle,
            None => unreachable!("pool grew without producing a free slot"),
        };
        let slot = std::mem::replace(&mut self.slots[handle], Slot::Occupied(value));
        match slot {
            Slot::Vacant { next } => self.next_free = next,
            Slot::Occupied(_) => panic!("pool free list points at occupied slot {handle}"),
        }
        self.len += 1;
        handle
    }

    /// Returns the slot to the free list and hands back the stored value.
    pub fn remove(&mut self, handle: usize) -> T {
        assert!(
            handle < self.slots.len(),
            "pool handle {handle} out of range"
        );
        let vacant = Slot::Vacant {
            next: self.next_free,
        };
        match std::mem::replace(&mut self.slots[handle], vacant) {
            Slot::Occupied(value) => {
                self.next_free = Some(handle);
                self.len -= 1;
                value
            }
            Slot::Vacant { next } => {
                // Undo the write so the free list stays intact before dying.
                self.slots[handle] = Slot::Vacant { next };
                panic!("double free of pool handle {handle}");
            }
        }
    }

    pub fn contains(&self, handle: usize) -> bool {
        matches!(self.slots.get(handle), Some(Slot::Occupied(_)))
    }

    pub fn get(&self, handle: usize) -> Option<&T> {
        match self.slots.get(handle) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut T> {
        match self.slots.get_mut(handle) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Iterates occupied slots as `(handle, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(handle, slot)| match slot {
                Slot::Occupied(value) => Some((handle, value)),
                Slot::Vacant { .. } => None,
            })
    }

    fn grow_to(&mut self, new_capacity: usize) {
        let old_capacity = self.slots.len();
        if new_capacity <= old_capacity {
            return;
        }

        // Thread the fresh slots in ascending order, then splice them in
        // front of whatever is left of the existing list.
        self.slots.reserve(new_capacity - old_capacity);
        for handle in old_capacity..new_capacity {
            let next = if handle + 1 < new_capacity {
                Some(handle + 1)
            } else {
                self.next_free
            };
            self.slots.push(Slot::Vacant { next });
        }
        self.next_free = Some(old_capacity);
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for Pool<T> {
    type Output = T;

    fn index(&self, handle: usize) -> &T {
        match self.slots.get(handle) {
            Some(Slot::Occupied(value)) => value,
            Some(Slot::Vacant { .. }) => panic!("access to freed pool handle {handle}"),
            None => panic!("pool handle {handle} out of range"),
        }
    }
}

impl<T> IndexMut<usize> for Pool<T> {
    fn index_mut(&mut self, handle: usize) -> &mut T {
        match self.slots.get_mut(handle) {
            Some(Slot::Occupied(value)) => value,
            Some(Slot::Vacant { .. }) => panic!("access to freed pool handle {handle}"),
            None => panic!("pool handle {handle} out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_index() {
        let mut pool = Pool::with_capacity(4);
        let a = pool.push("a");
        let b = pool.push("b");
        assert_eq!(pool[a], "a");
        assert_eq!(pool[b], "b");
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.free_slots(), 2);
    }

    #[test]
    fn test_remove_reuses_slot() {
        let mut pool = Pool::with_capacity(4);
        let a = pool.push(1);
        let _b = pool.push(2);
        assert_eq!(pool.remove(a), 1);
        assert!(!pool.contains(a));
        let c = pool.push(3);
        assert_eq!(c, a);
        assert_eq!(pool[c], 3);
    }

    #[test]
    fn test_growth_keeps_handles() {
        let mut pool = Pool::with_capacity(2);
        let handles: Vec<usize> = (0..100).map(|i| pool.push(i)).collect();
        assert!(pool.capacity() >= 100);
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(pool[*handle], i);
        }
    }

    #[test]
    fn test_growth_keeps_free_list_tail() {
        let mut pool = Pool::with_capacity(4);
        let handles: Vec<usize> = (0..4).map(|i| pool.push(i)).collect();
        pool.remove(handles[1]);
        pool.push(10);
        // Full again, next push doubles.
        pool.push(11);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.free_slots(), 3);
        for i in 0..3 {
            pool.push(20 + i);
        }
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.free_slots(), 0);
    }

    #[test]
    #[should_panic(expected = "freed pool handle")]
    fn test_index_freed_handle_panics() {
        let mut pool = Pool::new();
        let a = pool.push(1u8);
        pool.remove(a);
        let _ = pool[a];
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn test_double_remove_panics() {
        let mut pool = Pool::new();
        let a = pool.push(1u8);
        pool.remove(a);
        pool.remove(a);
    }

    #[test]
    fn test_iter_skips_vacant() {
        let mut pool = Pool::with_capacity(4);
        let a = pool.push('a');
        let b = pool.push('b');
        let c = pool.push('c');
        pool.remove(b);
        let live: Vec<_> = pool.iter().collect();
        assert_eq!(live, vec![(a, &'a'), (c, &'c')]);
    }
}
