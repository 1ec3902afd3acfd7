//! Entity identifiers and slot allocation
//!
//! Entities are plain `u32` row indices into every per-entity array. The
//! allocator hands out slots below the world's `max_entities`, recycling
//! removed ids in the order they were freed.

use std::collections::VecDeque;

/// Entity identifier (dense row index).
pub type EntityId = u32;

#[derive(Debug, Clone)]
pub struct EntityAllocator {
    cursor: u32,
    capacity: u32,
    removed: VecDeque<EntityId>,
    live: Vec<bool>,
    live_count: usize,
}

impl EntityAllocator {
    pub fn new(capacity: u32) -> Self {
        Self {
            cursor: 0,
            capacity,
            removed: VecDeque::new(),
            live: vec![false; capacity as usize],
            live_count: 0,
        }
    }

    /// Allocate an id, reusing the oldest freed slot first.
    ///
    /// Returns `None` once every slot below the capacity is live.
    pub fn allocate(&mut self) -> Option<EntityId> {
        let id = match self.removed.pop_front() {
            Some(id) => id,
            None if self.cursor < self.capacity => {
                self.cursor += 1;
                self.cursor - 1
            }
            None => return None,
        };
        self.live[id as usize] = true;
        self.live_count += 1;
        Some(id)
    }

    /// Return a live id to the free queue. Freeing a dead id does nothing.
    pub fn free(&mut self, id: EntityId) -> bool {
        match self.live.get_mut(id as usize) {
            Some(slot) if *slot => {
                *slot = false;
                self.live_count -= 1;
                self.removed.push_back(id);
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.live.get(id as usize).copied().unwrap_or(false)
    }

    /// Number of slots ever handed out; every id below it has been used.
    #[inline]
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_then_recycled_fifo() {
        let mut alloc = EntityAllocator::new(8);
        let ids: Vec<EntityId> = (0..4).filter_map(|_| alloc.allocate()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        assert!(alloc.free(2));
        assert!(alloc.free(0));
        assert!(!alloc.free(0));
        assert_eq!(alloc.live_count(), 2);

        assert_eq!(alloc.allocate(), Some(2));
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(4));
        assert_eq!(alloc.cursor(), 5);
    }

    #[test]
    fn allocation_stops_at_capacity() {
        let mut alloc = EntityAllocator::new(2);
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));
        assert_eq!(alloc.allocate(), None);
        assert!(alloc.is_alive(1));
        assert!(!alloc.is_alive(7));
    }
}
